// ==========================================
// 考场编排系统 - 引擎层
// ==========================================
// 职责: 实现编排规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 部分失败以数据返回
// ==========================================

pub mod arrangement_validator;
pub mod cancel;
pub mod conflict_policy;
pub mod error;
pub mod invigilator_assigner;
pub mod ordering;
pub mod seat_allocator;
pub mod seat_label;
pub mod strategy;

// 重导出核心引擎
pub use arrangement_validator::ArrangementValidator;
pub use cancel::CancellationToken;
pub use conflict_policy::ConflictPolicy;
pub use error::{EngineError, EngineResult};
pub use invigilator_assigner::{AssignmentConflict, InvigilatorAssigner, InvigilatorPlan};
pub use ordering::{arrange_candidates, prioritize_rooms};
pub use seat_allocator::{AllocationOutcome, CapacityShortfall, SeatAllocator};
pub use seat_label::{format_seat_label, SeatLabelScheme};
pub use strategy::{ArrangementOrder, InvigilatorStrategy, RoomStrategy};
