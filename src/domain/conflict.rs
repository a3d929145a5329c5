// ==========================================
// 考场编排系统 - 相邻冲突记录
// ==========================================
// ArrangementValidator 的只读输出，不落库
// ==========================================

use crate::domain::seating::SeatedCandidate;
use crate::domain::types::ConflictKind;
use serde::{Deserialize, Serialize};

/// 冲突一方的快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatParty {
    pub candidate_id: String,
    pub candidate_name: String,
    pub department: String,
    pub subject_code: String,
    pub row: u32,
    pub col: u32,
}

impl SeatParty {
    /// 位置描述，格式 "行-列"
    pub fn position(&self) -> String {
        format!("{}-{}", self.row, self.col)
    }
}

impl From<&SeatedCandidate> for SeatParty {
    fn from(seat: &SeatedCandidate) -> Self {
        Self {
            candidate_id: seat.candidate_id.clone(),
            candidate_name: seat.candidate_name.clone(),
            department: seat.department.clone(),
            subject_code: seat.subject_code.clone(),
            row: seat.row,
            col: seat.col,
        }
    }
}

// ==========================================
// ConflictRecord - 相邻冲突
// ==========================================
// first 的 (row, col) 总是字典序小于 second，每对只报告一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub room_id: String,
    pub kind: ConflictKind,
    pub first: SeatParty,
    pub second: SeatParty,
}

impl ConflictRecord {
    /// 是否为对角相邻
    pub fn is_diagonal(&self) -> bool {
        self.first.row != self.second.row && self.first.col != self.second.col
    }
}
