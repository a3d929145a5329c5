// ==========================================
// 考场编排系统 - 座位分配领域模型
// ==========================================
// 唯一性约束（仅对 ACTIVE 记录）:
// - (room_id, seat_row, seat_col, 场次) 唯一
// - (candidate_id, 场次) 唯一
// 坐标约定: 网格内部 0 起始, SeatAssignment 对外 1 起始
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::room::Room;
use crate::domain::session::SessionKey;
use crate::domain::types::AssignmentStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// SeatAssignment - 座位分配记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub id: Option<i64>,                // 数据库主键（未落库时为 None）
    pub candidate_id: String,           // 学号
    pub subject_code: String,           // 科目
    pub room_id: String,                // 考场
    pub row: u32,                       // 行（1 起始）
    pub col: u32,                       // 列（1 起始）
    pub seat_label: String,             // 座位号
    pub session_key: SessionKey,        // 场次
    pub arrangement_id: Option<String>, // 编排批次
    pub status: AssignmentStatus,       // 状态
}

// ==========================================
// SeatedCandidate - 审计视图（座位 + 考生院系）
// ==========================================
// 由仓储层联表得到，供 ArrangementValidator 使用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatedCandidate {
    pub candidate_id: String,
    pub candidate_name: String,
    pub department: String,
    pub subject_code: String,
    pub room_id: String,
    pub row: u32,
    pub col: u32,
}

// ==========================================
// SeatGrid - 单考场座位网格
// ==========================================
// 每次编排运行独占，重新编排时整体重建
#[derive(Debug, Clone)]
pub struct SeatGrid<'a> {
    rows: usize,
    cols: usize,
    cells: Vec<Option<&'a Candidate>>,
}

impl<'a> SeatGrid<'a> {
    /// 按考场尺寸创建空网格
    pub fn for_room(room: &Room) -> Self {
        let rows = room.rows as usize;
        let cols = room.cols as usize;
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 读取单元格（越界返回 None）
    pub fn get(&self, row: usize, col: usize) -> Option<&'a Candidate> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col]
    }

    /// 按偏移量读取相邻单元格（越界返回 None）
    pub fn neighbour(&self, row: usize, col: usize, dr: i32, dc: i32) -> Option<&'a Candidate> {
        let r = row as i64 + dr as i64;
        let c = col as i64 + dc as i64;
        if r < 0 || c < 0 {
            return None;
        }
        self.get(r as usize, c as usize)
    }

    pub fn is_vacant(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col].is_none()
    }

    /// 落座（调用方保证单元格为空）
    pub fn place(&mut self, row: usize, col: usize, candidate: &'a Candidate) {
        debug_assert!(self.is_vacant(row, col));
        self.cells[row * self.cols + col] = Some(candidate);
    }

    /// 已占用座位数
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// 是否已坐满
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }
}

// ==========================================
// ArrangementStatistics - 场次编排统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomOccupancy {
    pub room_id: String,
    pub room_name: String,
    pub capacity: u32,
    pub occupied: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementStatistics {
    pub session_key: SessionKey,
    pub total_candidates: u32,
    pub rooms_used: u32,
    pub avg_occupancy: f64, // 百分比，保留一位小数
    pub rooms: Vec<RoomOccupancy>,
}

impl ArrangementStatistics {
    /// 由各考场占用情况汇总
    ///
    /// 只统计至少有一名考生的考场，平均占用率按总座位数加权
    pub fn from_rooms(session_key: SessionKey, rooms: Vec<RoomOccupancy>) -> Self {
        let rooms: Vec<RoomOccupancy> = rooms.into_iter().filter(|r| r.occupied > 0).collect();
        let total_candidates: u32 = rooms.iter().map(|r| r.occupied).sum();

        // 按座位加权：总占用 / 总容量
        let total_capacity: u64 = rooms.iter().map(|r| r.capacity as u64).sum();
        let avg_occupancy = if total_capacity == 0 {
            0.0
        } else {
            (total_candidates as f64 / total_capacity as f64 * 1000.0).round() / 10.0
        };

        Self {
            session_key,
            total_candidates,
            rooms_used: rooms.len() as u32,
            avg_occupancy,
            rooms,
        }
    }
}
