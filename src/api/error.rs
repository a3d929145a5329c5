// ==========================================
// 考场编排系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/Engine错误为用户友好的错误消息
// 说明: 容量不足、部分安排、监考冲突（自动分配）均以数据返回，不是错误
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与业务规则错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 手工分配监考时的时间重叠
    #[error("监考冲突: staff_id={staff_id}, room_id={room_id}, {message}")]
    InvigilatorConflict {
        staff_id: String,
        room_id: String,
        message: String,
    },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("场次正在处理中: {0}")]
    SessionBusy(String),

    #[error("操作已取消: {0}")]
    Cancelled(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_mapping() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "InvigilatorAssignment".to_string(),
            id: "42".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("42")));

        let err: ApiError = RepositoryError::DatabaseTransactionError("disk full".to_string()).into();
        assert!(matches!(err, ApiError::DatabaseTransactionError(_)));
    }

    #[test]
    fn test_constraint_errors_mapping() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation("seat taken".to_string()).into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(ref m) if m.contains("seat taken")));

        let err: ApiError = RepositoryError::ForeignKeyViolation("room".to_string()).into();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(_)));
    }

    #[test]
    fn test_engine_error_is_validation() {
        let err: ApiError = EngineError::InvalidRoom {
            room_id: "R1".to_string(),
            reason: "rows 为 0".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::ValidationError(ref m) if m.contains("R1")));
    }
}
