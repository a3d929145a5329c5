// ==========================================
// 考场编排系统 - 外部数据源 Trait
// ==========================================
// 职责: 定义编排所需的只读数据源接口
// 实现者: CandidateRepository / RoomRepository（使用 rusqlite）
// 说明: 测试或其他宿主可注入内存实现
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::room::Room;
use crate::domain::session::SessionKey;
use crate::repository::error::RepositoryResult;
use chrono::NaiveTime;

// ==========================================
// RosterResolver Trait
// ==========================================
// 用途: 场次 -> 科目 -> 报考考生
pub trait RosterResolver: Send + Sync {
    /// 查询场次内开考的科目
    fn subjects_in_session(&self, session: &SessionKey) -> RepositoryResult<Vec<String>>;

    /// 查询科目的报考考生（含院系）
    fn enrolled_candidates(&self, subject_code: &str) -> RepositoryResult<Vec<Candidate>>;

    /// 查询场次的结束时间（取该场次各科目结束时间的最大值）
    ///
    /// # 返回
    /// - Ok(None): 场次下没有考试安排
    fn session_end_time(&self, session: &SessionKey) -> RepositoryResult<Option<NaiveTime>>;

    /// 汇总场次内全部考生（按科目顺序拼接）
    fn candidates_for_session(&self, session: &SessionKey) -> RepositoryResult<Vec<Candidate>> {
        let mut candidates = Vec::new();
        for subject_code in self.subjects_in_session(session)? {
            candidates.extend(self.enrolled_candidates(&subject_code)?);
        }
        Ok(candidates)
    }
}

// ==========================================
// RoomInventory Trait
// ==========================================
// 用途: 提供可用考场（含网格尺寸与容量）
pub trait RoomInventory: Send + Sync {
    /// 查询全部启用的考场
    fn active_rooms(&self) -> RepositoryResult<Vec<Room>>;
}
