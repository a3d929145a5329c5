// ==========================================
// 考场编排系统 - 编排审计
// ==========================================
// 职责: 对已完成的编排做独立的相邻冲突扫描
// 红线: 纯审计，不修改任何状态
// 说明: Strict 编排应扫描出 0 条；Moderate/Relaxed 有冲突属预期
// ==========================================

use crate::domain::conflict::{ConflictRecord, SeatParty};
use crate::domain::seating::SeatedCandidate;
use crate::domain::types::ConflictKind;
use crate::engine::conflict_policy::ALL_OFFSETS;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub struct ArrangementValidator {
    // 无状态
}

impl ArrangementValidator {
    pub fn new() -> Self {
        Self {}
    }

    /// 扫描整个场次的相邻冲突
    ///
    /// 按考场分组，建立 (row, col) 索引，检查 8 邻域。
    /// 每对相邻考生只输出一条记录，考场按编号、座位按行列排序。
    pub fn validate(&self, seats: &[SeatedCandidate]) -> Vec<ConflictRecord> {
        let mut by_room: BTreeMap<&str, Vec<&SeatedCandidate>> = BTreeMap::new();
        for seat in seats {
            by_room.entry(seat.room_id.as_str()).or_default().push(seat);
        }

        let mut conflicts = Vec::new();
        for (room_id, mut room_seats) in by_room {
            room_seats.sort_by_key(|s| (s.row, s.col));
            let position_map: HashMap<(u32, u32), &SeatedCandidate> =
                room_seats.iter().map(|s| ((s.row, s.col), *s)).collect();

            for seat in &room_seats {
                for (dr, dc) in ALL_OFFSETS {
                    let r = seat.row as i64 + dr as i64;
                    let c = seat.col as i64 + dc as i64;
                    if r < 1 || c < 1 {
                        continue;
                    }
                    let pos = (r as u32, c as u32);
                    // 只看"后面"的邻座，避免同一对报告两次
                    if pos <= (seat.row, seat.col) {
                        continue;
                    }
                    let Some(other) = position_map.get(&pos) else {
                        continue;
                    };

                    let kind = ConflictKind::classify(
                        seat.department == other.department,
                        seat.subject_code == other.subject_code,
                    );
                    if let Some(kind) = kind {
                        conflicts.push(ConflictRecord {
                            room_id: room_id.to_string(),
                            kind,
                            first: SeatParty::from(*seat),
                            second: SeatParty::from(*other),
                        });
                    }
                }
            }
        }

        debug!(seats = seats.len(), conflicts = conflicts.len(), "编排审计完成");
        conflicts
    }
}

impl Default for ArrangementValidator {
    fn default() -> Self {
        Self::new()
    }
}
