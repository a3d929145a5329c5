// ==========================================
// 考场编排系统 - 引擎层错误类型
// ==========================================
// 说明: 仅用于"输入不合法"，编排结果（含部分失败）一律以数据返回
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("考场参数不合法: room_id={room_id}, {reason}")]
    InvalidRoom { room_id: String, reason: String },

    #[error("座位坐标不合法: row={row}, col={col}, cols={cols}")]
    InvalidSeat { row: u32, col: u32, cols: u32 },

    #[error("未知{kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
