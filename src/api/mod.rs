// ==========================================
// 考场编排系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供管理端调用
// ==========================================

pub mod error;
pub mod invigilator_api;
pub mod seating_api;
pub mod session_lock;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use invigilator_api::{InvigilatorApi, InvigilatorSummary};
pub use seating_api::{GenerateRequest, GenerateSummary, SeatingApi};
pub use session_lock::{DateGuard, KeyGuard, SessionGuard, SessionLockRegistry};

use crate::domain::session::SessionKey;

/// 解析外部传入的场次（日期 YYYY-MM-DD, 时间 HH:MM）
pub(crate) fn parse_session_key(exam_date: &str, session_time: &str) -> ApiResult<SessionKey> {
    SessionKey::parse(exam_date, session_time).ok_or_else(|| {
        ApiError::ValidationError(format!(
            "场次格式错误: date={}, time={}（应为 YYYY-MM-DD 与 HH:MM）",
            exam_date, session_time
        ))
    })
}
