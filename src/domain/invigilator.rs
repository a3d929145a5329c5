// ==========================================
// 考场编排系统 - 监考领域模型
// ==========================================
// 红线: 同一监考员不得持有两条时间窗口重叠的 ACTIVE 安排
// ==========================================

use crate::domain::session::SessionWindow;
use crate::domain::types::AssignmentStatus;
use serde::{Deserialize, Serialize};

/// 监考员单日默认最多安排场数
pub const DEFAULT_MAX_ASSIGNMENTS: u32 = 2;

// ==========================================
// Staff - 监考员
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub staff_id: String,
    pub name: String,
    pub department: Option<String>,
    pub max_assignments: u32, // 单日最多监考场数
}

impl Staff {
    pub fn new(staff_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            name: name.into(),
            department: None,
            max_assignments: DEFAULT_MAX_ASSIGNMENTS,
        }
    }
}

// ==========================================
// InvigilatorAssignment - 监考安排
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvigilatorAssignment {
    pub id: Option<i64>,
    pub staff_id: String,
    pub room_id: String,
    pub window: SessionWindow, // 场次窗口（开考时间即场次键）
    pub subject_code: String,
    pub status: AssignmentStatus,
}

impl InvigilatorAssignment {
    /// 构造一条待落库的 ACTIVE 安排
    pub fn new_active(
        staff_id: impl Into<String>,
        room_id: impl Into<String>,
        window: SessionWindow,
        subject_code: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            staff_id: staff_id.into(),
            room_id: room_id.into(),
            window,
            subject_code: subject_code.into(),
            status: AssignmentStatus::Active,
        }
    }

    /// 是否与给定窗口冲突（仅 ACTIVE 记录参与）
    pub fn conflicts_with(&self, window: &SessionWindow) -> bool {
        self.status.is_active() && self.window.overlaps(window)
    }
}

// ==========================================
// SessionRoom - 场次内待监考考场
// ==========================================
// subject_code 取该考场该场次人数最多的科目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRoom {
    pub room_id: String,
    pub subject_code: String,
}

// ==========================================
// DutyChartEntry - 监考安排表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyChartEntry {
    pub assignment_id: i64,
    pub staff_id: String,
    pub staff_name: String,
    pub department: Option<String>,
    pub room_id: String,
    pub room_name: String,
    pub subject_code: String,
    pub window: SessionWindow,
}
