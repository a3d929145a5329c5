// ==========================================
// 考场编排系统 - 领域类型定义
// ==========================================
// 职责: 跨实体共享的状态/分类枚举
// 红线: 软删除必须是显式状态字段,不做物理删除
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 记录状态 (Assignment Status)
// ==========================================
// 座位分配与监考安排共用
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Active,   // 生效
    Inactive, // 已失效(软删除)
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AssignmentStatus {
    /// 从字符串解析状态
    ///
    /// 未知值按 INACTIVE 处理，避免脏数据被当作生效记录参与冲突检测
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => AssignmentStatus::Active,
            _ => AssignmentStatus::Inactive,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "ACTIVE",
            AssignmentStatus::Inactive => "INACTIVE",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AssignmentStatus::Active)
    }
}

// ==========================================
// 相邻冲突类型 (Conflict Kind)
// ==========================================
// 用于审计输出,说明相邻两人冲突的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    SameDepartment,           // 同院系
    SameSubject,              // 同科目
    SameDepartmentAndSubject, // 同院系且同科目
}

impl ConflictKind {
    /// 根据两项比较结果判定冲突类型（均不相同时返回 None）
    pub fn classify(same_department: bool, same_subject: bool) -> Option<Self> {
        match (same_department, same_subject) {
            (true, true) => Some(ConflictKind::SameDepartmentAndSubject),
            (true, false) => Some(ConflictKind::SameDepartment),
            (false, true) => Some(ConflictKind::SameSubject),
            (false, false) => None,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::SameDepartment => write!(f, "SAME_DEPARTMENT"),
            ConflictKind::SameSubject => write!(f, "SAME_SUBJECT"),
            ConflictKind::SameDepartmentAndSubject => write!(f, "SAME_DEPARTMENT_AND_SUBJECT"),
        }
    }
}
