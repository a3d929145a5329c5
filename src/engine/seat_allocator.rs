// ==========================================
// 考场编排系统 - 座位分配引擎
// ==========================================
// 职责: 贪心网格落座（首个可行座位，不回溯）
// 输入: 考生名单 + 已排序考场 + 冲突策略 + 随机源
// 输出: 已落座记录 + 未安排考生
// 红线: 不拼 SQL；部分失败以数据返回，不抛错
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::room::Room;
use crate::domain::seating::{SeatAssignment, SeatGrid};
use crate::domain::session::SessionKey;
use crate::domain::types::AssignmentStatus;
use crate::engine::cancel::CancellationToken;
use crate::engine::conflict_policy::ConflictPolicy;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::ordering::arrange_candidates;
use crate::engine::seat_label::{format_seat_label, SeatLabelScheme};
use crate::engine::strategy::ArrangementOrder;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

// ==========================================
// AllocationOutcome - 编排结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AllocationOutcome {
    pub placed: Vec<SeatAssignment>,
    pub unplaced: Vec<Candidate>,
    /// 至少落座一人的考场数
    pub rooms_used: usize,
    /// 因冲突策略被跳过的空座次数
    pub conflicts_resolved: usize,
    /// 是否被中途取消
    pub cancelled: bool,
}

impl AllocationOutcome {
    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }
}

/// 容量缺口（候选人数超过总座位数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityShortfall {
    pub required: usize,
    pub available: usize,
}

impl CapacityShortfall {
    pub fn missing(&self) -> usize {
        self.required.saturating_sub(self.available)
    }
}

// ==========================================
// SeatAllocator - 座位分配引擎
// ==========================================
pub struct SeatAllocator {
    label_scheme: SeatLabelScheme,
}

impl SeatAllocator {
    /// 构造函数
    ///
    /// # 参数
    /// - `label_scheme`: 落座时生成座位号使用的方案
    pub fn new(label_scheme: SeatLabelScheme) -> Self {
        Self { label_scheme }
    }

    pub fn label_scheme(&self) -> SeatLabelScheme {
        self.label_scheme
    }

    /// 编排前校验所有考场
    pub fn validate_rooms(rooms: &[Room]) -> EngineResult<()> {
        for room in rooms {
            room.validate().map_err(|reason| EngineError::InvalidRoom {
                room_id: room.room_id.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// 容量预检（快速失败用）
    ///
    /// # 返回
    /// - Some(shortfall): 候选人数超过总座位数
    /// - None: 容量足够
    pub fn check_capacity(candidate_count: usize, rooms: &[Room]) -> Option<CapacityShortfall> {
        let available: usize = rooms.iter().map(|r| r.capacity as usize).sum();
        if candidate_count > available {
            Some(CapacityShortfall {
                required: candidate_count,
                available,
            })
        } else {
            None
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一次完整编排
    ///
    /// 规则：
    /// 1) 按编排方式确定考生访问顺序（随机源注入，可复现）
    /// 2) 考场按传入顺序依次尝试（调用方已按考场策略排序）
    /// 3) 考场内行优先扫描，取第一个空且策略允许的座位
    /// 4) 全部考场都无可行座位的考生记为未安排，不自动放宽策略
    ///
    /// 同一场次内重复出现的学号只落座一次，其余记为未安排。
    ///
    /// # 返回
    /// - Err(InvalidRoom): 考场参数不合法（任何落座之前）
    /// - Ok(outcome): placed + unplaced 恒等于 candidates 数量
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(
        session = %session_key,
        policy = %policy,
        order = order.as_str(),
        candidates_count = candidates.len(),
        rooms_count = rooms.len()
    ))]
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        candidates: &[Candidate],
        rooms: &[Room],
        policy: ConflictPolicy,
        order: ArrangementOrder,
        session_key: SessionKey,
        rng: &mut R,
        cancel: Option<&CancellationToken>,
    ) -> EngineResult<AllocationOutcome> {
        Self::validate_rooms(rooms)?;

        let mut outcome = AllocationOutcome::default();
        if candidates.is_empty() {
            return Ok(outcome);
        }

        let arranged = arrange_candidates(candidates, order, rng);

        let mut grids: Vec<SeatGrid<'_>> = rooms.iter().map(SeatGrid::for_room).collect();
        let mut occupied: Vec<usize> = vec![0; rooms.len()];
        let mut seated_ids: HashSet<&str> = HashSet::with_capacity(arranged.len());

        for (idx, candidate) in arranged.iter().enumerate() {
            if cancel.map(|t| t.is_cancelled()).unwrap_or(false) {
                warn!(remaining = arranged.len() - idx, "编排已取消，剩余考生记为未安排");
                outcome.cancelled = true;
                outcome.unplaced.extend(arranged[idx..].iter().cloned());
                break;
            }

            if seated_ids.contains(candidate.id.as_str()) {
                warn!(candidate_id = %candidate.id, "同一场次重复报考，跳过");
                outcome.unplaced.push(candidate.clone());
                continue;
            }

            let mut seat: Option<(usize, usize, usize)> = None;
            'rooms: for (room_idx, room) in rooms.iter().enumerate() {
                if occupied[room_idx] >= room.capacity as usize {
                    continue;
                }
                let grid = &grids[room_idx];
                for row in 0..grid.rows() {
                    for col in 0..grid.cols() {
                        if !grid.is_vacant(row, col) {
                            continue;
                        }
                        if policy.permits(candidate, grid, row, col) {
                            seat = Some((room_idx, row, col));
                            break 'rooms;
                        }
                        outcome.conflicts_resolved += 1;
                    }
                }
            }

            match seat {
                Some((room_idx, row, col)) => {
                    let room = &rooms[room_idx];
                    grids[room_idx].place(row, col, candidate);
                    occupied[room_idx] += 1;
                    seated_ids.insert(candidate.id.as_str());
                    outcome.placed.push(self.make_assignment(
                        candidate,
                        room,
                        row as u32 + 1,
                        col as u32 + 1,
                        session_key,
                    )?);
                }
                None => {
                    debug!(candidate_id = %candidate.id, "无可行座位");
                    outcome.unplaced.push(candidate.clone());
                }
            }
        }

        outcome.rooms_used = occupied.iter().filter(|&&n| n > 0).count();

        info!(
            placed = outcome.placed.len(),
            unplaced = outcome.unplaced.len(),
            rooms_used = outcome.rooms_used,
            conflicts_resolved = outcome.conflicts_resolved,
            "座位编排完成"
        );

        Ok(outcome)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 创建 SeatAssignment（row/col 为 1 起始）
    fn make_assignment(
        &self,
        candidate: &Candidate,
        room: &Room,
        row: u32,
        col: u32,
        session_key: SessionKey,
    ) -> EngineResult<SeatAssignment> {
        Ok(SeatAssignment {
            id: None,
            candidate_id: candidate.id.clone(),
            subject_code: candidate.subject_code.clone(),
            room_id: room.room_id.clone(),
            row,
            col,
            seat_label: format_seat_label(&room.room_id, row, col, self.label_scheme, room.cols)?,
            session_key,
            arrangement_id: None,
            status: AssignmentStatus::Active,
        })
    }
}

impl Default for SeatAllocator {
    fn default() -> Self {
        Self::new(SeatLabelScheme::default())
    }
}
