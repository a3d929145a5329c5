// ==========================================
// 考场编排系统 - 监考分配 API
// ==========================================
// 职责: 自动/手工分配监考、撤销、监考安排表
// 并发: 与座位编排共用场次锁；冲突检查与写入在考试日锁内完成
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::parse_session_key;
use crate::api::session_lock::SessionLockRegistry;
use crate::config::ConfigManager;
use crate::domain::invigilator::{DutyChartEntry, InvigilatorAssignment, Staff};
use crate::domain::session::{SessionKey, SessionWindow, DATE_FORMAT};
use crate::engine::invigilator_assigner::{overlap_conflict, AssignmentConflict, InvigilatorAssigner};
use crate::engine::strategy::InvigilatorStrategy;
use crate::repository::invigilator_repo::InvigilatorRepository;
use crate::repository::roster::RosterResolver;
use crate::repository::seating_repo::SeatingRepository;

/// 自动分配结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvigilatorSummary {
    pub session_key: SessionKey,
    pub made_count: usize,
    pub assignment_ids: Vec<i64>,
    /// 冲突说明（人类可读）
    pub conflicts: Vec<String>,
    pub conflict_details: Vec<AssignmentConflict>,
}

// ==========================================
// InvigilatorApi - 监考分配 API
// ==========================================
pub struct InvigilatorApi {
    roster: Arc<dyn RosterResolver>,
    seating_repo: Arc<SeatingRepository>,
    invigilator_repo: Arc<InvigilatorRepository>,
    config_manager: Arc<ConfigManager>,
    session_locks: Arc<SessionLockRegistry>,
    assigner: InvigilatorAssigner,
}

impl InvigilatorApi {
    pub fn new(
        roster: Arc<dyn RosterResolver>,
        seating_repo: Arc<SeatingRepository>,
        invigilator_repo: Arc<InvigilatorRepository>,
        config_manager: Arc<ConfigManager>,
        session_locks: Arc<SessionLockRegistry>,
    ) -> Self {
        Self {
            roster,
            seating_repo,
            invigilator_repo,
            config_manager,
            session_locks,
            assigner: InvigilatorAssigner::new(),
        }
    }

    // ==========================================
    // 监考员
    // ==========================================

    /// 登记监考员（单日上限取配置默认值）
    pub fn register_staff(&self, staff_id: &str, name: &str, department: Option<&str>) -> ApiResult<Staff> {
        if staff_id.trim().is_empty() || name.trim().is_empty() {
            return Err(ApiError::ValidationError("监考员编号和姓名不能为空".to_string()));
        }
        let max_assignments = self
            .config_manager
            .get_default_max_assignments()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let staff = Staff {
            staff_id: staff_id.trim().to_string(),
            name: name.trim().to_string(),
            department: department.map(|d| d.to_string()),
            max_assignments,
        };
        self.invigilator_repo.upsert_staff(&staff)?;
        Ok(staff)
    }

    /// 场次空闲的监考员
    pub fn available_staff(&self, exam_date: &str, session_time: &str) -> ApiResult<Vec<Staff>> {
        let session_key = parse_session_key(exam_date, session_time)?;
        let window = self.session_window(&session_key)?;
        Ok(self.invigilator_repo.available_staff(&window)?)
    }

    // ==========================================
    // 分配
    // ==========================================

    /// 为场次内在用考场自动分配监考员
    ///
    /// 说明：
    /// - 已有监考的考场不再分配
    /// - 时间重叠、达到单日上限的监考员跳过并记为冲突
    ///
    /// # 参数
    /// - strategy: None 时为 balanced
    #[instrument(skip(self))]
    pub fn assign_invigilators(
        &self,
        exam_date: &str,
        session_time: &str,
        strategy: Option<&str>,
    ) -> ApiResult<InvigilatorSummary> {
        let session_key = parse_session_key(exam_date, session_time)?;
        let strategy = match strategy {
            Some(s) => s.parse::<InvigilatorStrategy>()?,
            None => InvigilatorStrategy::default(),
        };

        let _guard = self.session_locks.try_acquire(session_key)?;
        // 重叠场次的场次键不同，按考试日串行读-判-写
        let _day = self.session_locks.acquire_date(session_key.exam_date)?;
        let window = self.session_window(&session_key)?;

        let existing = self.invigilator_repo.find_active_by_date(session_key.exam_date)?;
        let mut rooms = self.seating_repo.session_rooms(&session_key)?;
        rooms.retain(|r| {
            !existing
                .iter()
                .any(|a| a.room_id == r.room_id && a.window.key() == session_key)
        });

        if rooms.is_empty() {
            info!(session = %session_key, "没有需要分配监考的考场");
        }

        let staff = self.invigilator_repo.active_staff()?;
        let plan = self
            .assigner
            .assign(&rooms, window, &staff, &existing, strategy);

        let assignment_ids = self.invigilator_repo.insert_batch(&plan.made)?;
        for c in &plan.conflicts {
            warn!(session = %session_key, room_id = %c.room_id, "{}", c.message);
        }

        Ok(InvigilatorSummary {
            session_key,
            made_count: assignment_ids.len(),
            assignment_ids,
            conflicts: plan.conflicts.iter().map(|c| c.message.clone()).collect(),
            conflict_details: plan.conflicts,
        })
    }

    /// 手工分配监考
    ///
    /// # 返回
    /// - Ok(id): 新安排主键
    /// - Err(InvigilatorConflict): 监考员在重叠时段已有安排（消息含已占用考场）
    /// - Err(NotFound): 监考员不存在
    pub fn assign_manual(
        &self,
        staff_id: &str,
        room_id: &str,
        exam_date: &str,
        session_time: &str,
    ) -> ApiResult<i64> {
        let session_key = parse_session_key(exam_date, session_time)?;
        let _guard = self.session_locks.try_acquire(session_key)?;
        let _day = self.session_locks.acquire_date(session_key.exam_date)?;

        if self.invigilator_repo.find_staff(staff_id)?.is_none() {
            return Err(ApiError::NotFound(format!("监考员{}不存在", staff_id)));
        }

        let window = self.session_window(&session_key)?;
        if let Some(held) = self.invigilator_repo.find_overlapping(staff_id, &window)? {
            let conflict = overlap_conflict(staff_id, room_id, &held);
            return Err(ApiError::InvigilatorConflict {
                staff_id: staff_id.to_string(),
                room_id: room_id.to_string(),
                message: conflict.message,
            });
        }

        let subject_code = self.subject_for_room(&session_key, room_id)?;
        let assignment = InvigilatorAssignment::new_active(staff_id, room_id, window, subject_code);
        let ids = self.invigilator_repo.insert_batch(std::slice::from_ref(&assignment))?;
        let id = ids
            .first()
            .copied()
            .ok_or_else(|| ApiError::InternalError("监考安排写入后未返回主键".to_string()))?;

        info!(staff_id, room_id, session = %session_key, id, "手工分配监考");
        Ok(id)
    }

    /// 撤销监考安排（软删除）
    ///
    /// # 返回
    /// - Ok(true): 已撤销
    /// - Ok(false): 记录原本已失效
    /// - Err(NotFound): 主键不存在
    pub fn unassign(&self, assignment_id: i64) -> ApiResult<bool> {
        let changed = self.invigilator_repo.deactivate(assignment_id)?;
        info!(assignment_id, changed, "撤销监考安排");
        Ok(changed)
    }

    /// 某日监考安排表（按开考时间、姓名排序）
    pub fn duty_chart(&self, exam_date: &str) -> ApiResult<Vec<DutyChartEntry>> {
        let date = NaiveDate::parse_from_str(exam_date.trim(), DATE_FORMAT)
            .map_err(|_| ApiError::ValidationError(format!("日期格式错误: {}", exam_date)))?;
        Ok(self.invigilator_repo.duty_chart(date)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 场次时间窗口：取考试安排的最晚结束时间，缺失时按默认时长
    fn session_window(&self, session_key: &SessionKey) -> ApiResult<SessionWindow> {
        if let Some(end) = self.roster.session_end_time(session_key)? {
            if end > session_key.session_time {
                return Ok(SessionWindow::new(session_key.exam_date, session_key.session_time, end));
            }
            warn!(session = %session_key, end = %end, "考试结束时间不晚于开考时间，改用默认时长");
        }
        let minutes = self
            .config_manager
            .get_default_session_minutes()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        Ok(SessionWindow::from_duration(*session_key, minutes))
    }

    /// 考场在该场次的科目：优先取已编排座位的主科目，否则取场次首个科目
    fn subject_for_room(&self, session_key: &SessionKey, room_id: &str) -> ApiResult<String> {
        if let Some(room) = self
            .seating_repo
            .session_rooms(session_key)?
            .into_iter()
            .find(|r| r.room_id == room_id)
        {
            return Ok(room.subject_code);
        }
        self.roster
            .subjects_in_session(session_key)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ValidationError(format!("场次 {} 没有考试安排", session_key)))
    }
}
