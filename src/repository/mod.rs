// ==========================================
// 考场编排系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod candidate_repo;
pub mod error;
pub mod invigilator_repo;
pub mod room_repo;
pub mod roster;
pub mod seating_repo;

// 重导出核心仓储
pub use candidate_repo::CandidateRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use invigilator_repo::InvigilatorRepository;
pub use room_repo::RoomRepository;
pub use roster::{RoomInventory, RosterResolver};
pub use seating_repo::SeatingRepository;
