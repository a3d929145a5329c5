// ==========================================
// 考场编排系统 - 策略定义
// ==========================================
// 用途：
// - 编排请求按次携带策略，解析一次后在整个运行内不变；
// - 字符串入口（配置/外部调用）统一经 FromStr 解析，未知值直接报错。

use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};

/// 考生访问顺序（座位编排的排列方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrangementOrder {
    Mixed,
    DepartmentWise,
    Random,
    Alphabetical,
}

impl ArrangementOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrangementOrder::Mixed => "mixed",
            ArrangementOrder::DepartmentWise => "department_wise",
            ArrangementOrder::Random => "random",
            ArrangementOrder::Alphabetical => "alphabetical",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            ArrangementOrder::Mixed => "混合编排",
            ArrangementOrder::DepartmentWise => "按院系编排",
            ArrangementOrder::Random => "随机编排",
            ArrangementOrder::Alphabetical => "按姓名编排",
        }
    }
}

impl Default for ArrangementOrder {
    fn default() -> Self {
        ArrangementOrder::Mixed
    }
}

impl std::str::FromStr for ArrangementOrder {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mixed" => Ok(ArrangementOrder::Mixed),
            "department_wise" | "department-wise" => Ok(ArrangementOrder::DepartmentWise),
            "random" => Ok(ArrangementOrder::Random),
            "alphabetical" => Ok(ArrangementOrder::Alphabetical),
            other => Err(EngineError::UnknownVariant {
                kind: "编排方式",
                value: other.to_string(),
            }),
        }
    }
}

/// 考场使用策略（决定考场填充优先级）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStrategy {
    /// 大考场优先，尽量少用考场
    Optimal,
    /// 小考场优先
    Balanced,
    /// 大考场优先，且只取前 N 间
    Minimal,
}

impl RoomStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStrategy::Optimal => "optimal",
            RoomStrategy::Balanced => "balanced",
            RoomStrategy::Minimal => "minimal",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            RoomStrategy::Optimal => "最少考场",
            RoomStrategy::Balanced => "均衡使用",
            RoomStrategy::Minimal => "限量考场",
        }
    }
}

impl Default for RoomStrategy {
    fn default() -> Self {
        RoomStrategy::Optimal
    }
}

impl std::str::FromStr for RoomStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "optimal" => Ok(RoomStrategy::Optimal),
            "balanced" => Ok(RoomStrategy::Balanced),
            "minimal" => Ok(RoomStrategy::Minimal),
            other => Err(EngineError::UnknownVariant {
                kind: "考场策略",
                value: other.to_string(),
            }),
        }
    }
}

/// 监考分配策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvigilatorStrategy {
    /// 考场轮转，依次取可用监考员
    Balanced,
    /// 先按当日已有安排数升序排列监考员，再轮转
    LeastLoaded,
}

impl InvigilatorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvigilatorStrategy::Balanced => "balanced",
            InvigilatorStrategy::LeastLoaded => "least_loaded",
        }
    }
}

impl Default for InvigilatorStrategy {
    fn default() -> Self {
        InvigilatorStrategy::Balanced
    }
}

impl std::str::FromStr for InvigilatorStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" => Ok(InvigilatorStrategy::Balanced),
            "least_loaded" | "least-loaded" => Ok(InvigilatorStrategy::LeastLoaded),
            other => Err(EngineError::UnknownVariant {
                kind: "监考分配策略",
                value: other.to_string(),
            }),
        }
    }
}
