// ==========================================
// 考场编排系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 考场座位编排 + 监考分配引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 编排规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssignmentStatus, ConflictKind};

// 领域实体
pub use domain::{
    ArrangementStatistics, Candidate, ConflictRecord, DutyChartEntry, InvigilatorAssignment, Room,
    SeatAssignment, SessionKey, SessionWindow, Staff,
};

// 引擎
pub use engine::{
    format_seat_label, ArrangementOrder, ArrangementValidator, CancellationToken, ConflictPolicy,
    InvigilatorAssigner, InvigilatorStrategy, RoomStrategy, SeatAllocator, SeatLabelScheme,
};

// API
pub use api::{ApiError, ApiResult, GenerateRequest, GenerateSummary, InvigilatorApi, SeatingApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "考场编排系统";
