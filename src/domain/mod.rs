// ==========================================
// 考场编排系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod candidate;
pub mod conflict;
pub mod invigilator;
pub mod room;
pub mod seating;
pub mod session;
pub mod types;

// 重导出核心类型
pub use candidate::Candidate;
pub use conflict::{ConflictRecord, SeatParty};
pub use invigilator::{DutyChartEntry, InvigilatorAssignment, SessionRoom, Staff};
pub use room::Room;
pub use seating::{ArrangementStatistics, RoomOccupancy, SeatAssignment, SeatGrid, SeatedCandidate};
pub use session::{SessionKey, SessionWindow};
pub use types::{AssignmentStatus, ConflictKind};
