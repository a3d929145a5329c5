// ==========================================
// 考场编排系统 - 相邻冲突策略
// ==========================================
// 三档策略，由调用方按次选择:
// - Strict:   8 邻域，任一邻座同院系或同科目即拒绝
// - Moderate: 4 邻域，落座后任一方冲突邻座数 > 1 即拒绝
// - Relaxed:  4 邻域，仅同科目邻座拒绝（容忍同院系）
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::seating::SeatGrid;
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 4 邻域偏移（上下左右）
pub const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// 8 邻域偏移（含对角）
pub const ALL_OFFSETS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

// ==========================================
// ConflictPolicy - 冲突规避等级
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Strict,
    Moderate,
    Relaxed,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Strict => "strict",
            ConflictPolicy::Moderate => "moderate",
            ConflictPolicy::Relaxed => "relaxed",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            ConflictPolicy::Strict => "严格隔离",
            ConflictPolicy::Moderate => "适度隔离",
            ConflictPolicy::Relaxed => "宽松隔离",
        }
    }

    /// 本策略检查的邻域偏移
    pub fn offsets(&self) -> &'static [(i32, i32)] {
        match self {
            ConflictPolicy::Strict => &ALL_OFFSETS,
            ConflictPolicy::Moderate | ConflictPolicy::Relaxed => &ORTHOGONAL_OFFSETS,
        }
    }

    /// 两名考生相邻是否构成本策略意义下的冲突
    fn is_conflicting_pair(&self, candidate: &Candidate, neighbour: &Candidate) -> bool {
        match self {
            ConflictPolicy::Strict | ConflictPolicy::Moderate => {
                candidate.same_department(neighbour) || candidate.same_subject(neighbour)
            }
            ConflictPolicy::Relaxed => candidate.same_subject(neighbour),
        }
    }

    /// 统计 (row, col) 处的冲突邻座数（0 起始坐标）
    pub fn conflicting_neighbours(
        &self,
        candidate: &Candidate,
        grid: &SeatGrid<'_>,
        row: usize,
        col: usize,
    ) -> usize {
        self.offsets()
            .iter()
            .filter_map(|&(dr, dc)| grid.neighbour(row, col, dr, dc))
            .filter(|n| self.is_conflicting_pair(candidate, n))
            .count()
    }

    /// 判断考生能否坐在 (row, col)
    ///
    /// Moderate 下落座后双方的冲突邻座数都不得超过 1，
    /// 因此与考生冲突的邻座自身不能已有冲突邻座。
    /// 不检查座位是否为空，由调用方保证
    pub fn permits(&self, candidate: &Candidate, grid: &SeatGrid<'_>, row: usize, col: usize) -> bool {
        let conflicts = self.conflicting_neighbours(candidate, grid, row, col);
        match self {
            ConflictPolicy::Strict | ConflictPolicy::Relaxed => conflicts == 0,
            ConflictPolicy::Moderate => {
                conflicts <= 1 && !self.saturates_neighbour(candidate, grid, row, col)
            }
        }
    }

    /// 是否存在已有一个冲突邻座、且与考生冲突的相邻考生
    fn saturates_neighbour(&self, candidate: &Candidate, grid: &SeatGrid<'_>, row: usize, col: usize) -> bool {
        self.offsets().iter().any(|&(dr, dc)| {
            let (r, c) = (row as i64 + dr as i64, col as i64 + dc as i64);
            if r < 0 || c < 0 {
                return false;
            }
            let (r, c) = (r as usize, c as usize);
            match grid.get(r, c) {
                Some(n) if self.is_conflicting_pair(candidate, n) => {
                    self.conflicting_neighbours(n, grid, r, c) >= 1
                }
                _ => false,
            }
        })
    }
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy::Strict
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ConflictPolicy::Strict),
            "moderate" => Ok(ConflictPolicy::Moderate),
            "relaxed" => Ok(ConflictPolicy::Relaxed),
            other => Err(EngineError::UnknownVariant {
                kind: "冲突策略",
                value: other.to_string(),
            }),
        }
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::Room;

    fn cand(id: &str, dept: &str, subject: &str) -> Candidate {
        Candidate::new(id, id, dept, subject)
    }

    #[test]
    fn test_strict_rejects_diagonal_department_match() {
        let room = Room::new("R1", 3, 3);
        let a = cand("A", "CSE", "CS101");
        let b = cand("B", "CSE", "MA101");
        let mut grid = SeatGrid::for_room(&room);
        grid.place(0, 0, &a);

        // (1,1) 与 (0,0) 对角相邻，同院系
        assert!(!ConflictPolicy::Strict.permits(&b, &grid, 1, 1));
        // 4 邻域策略不看对角
        assert!(ConflictPolicy::Moderate.permits(&b, &grid, 1, 1));
        assert!(ConflictPolicy::Relaxed.permits(&b, &grid, 1, 1));
    }

    #[test]
    fn test_moderate_allows_single_conflict() {
        let room = Room::new("R1", 3, 3);
        let left = cand("L", "CSE", "CS101");
        let up = cand("U", "ECE", "CS101");
        let new = cand("N", "CSE", "MA101");
        let mut grid = SeatGrid::for_room(&room);

        grid.place(1, 0, &left);
        assert!(ConflictPolicy::Moderate.permits(&new, &grid, 1, 1));

        // 上方再放一个同科目 -> new 与 up 不同科目不同院系，不计入
        grid.place(0, 1, &up);
        assert_eq!(ConflictPolicy::Moderate.conflicting_neighbours(&new, &grid, 1, 1), 1);

        let same_subject_as_up = cand("X", "CSE", "CS101");
        assert_eq!(
            ConflictPolicy::Moderate.conflicting_neighbours(&same_subject_as_up, &grid, 1, 1),
            2
        );
        assert!(!ConflictPolicy::Moderate.permits(&same_subject_as_up, &grid, 1, 1));
    }

    #[test]
    fn test_moderate_protects_placed_neighbour() {
        let room = Room::new("R1", 1, 3);
        let a = cand("A", "CSE", "CS101");
        let b = cand("B", "CSE", "MA101");
        let c = cand("C", "CSE", "PH101");
        let mut grid = SeatGrid::for_room(&room);
        grid.place(0, 0, &a);
        grid.place(0, 1, &b);

        // C 自身只有 B 一个冲突邻座，但 B 会因此有两个
        assert_eq!(ConflictPolicy::Moderate.conflicting_neighbours(&c, &grid, 0, 2), 1);
        assert!(!ConflictPolicy::Moderate.permits(&c, &grid, 0, 2));

        // 不与 B 冲突的考生不受影响
        let d = cand("D", "ECE", "EE201");
        assert!(ConflictPolicy::Moderate.permits(&d, &grid, 0, 2));
    }

    #[test]
    fn test_relaxed_tolerates_department() {
        let room = Room::new("R1", 1, 2);
        let a = cand("A", "CSE", "CS101");
        let same_dept = cand("B", "CSE", "MA101");
        let same_subject = cand("C", "ECE", "CS101");
        let mut grid = SeatGrid::for_room(&room);
        grid.place(0, 0, &a);

        assert!(ConflictPolicy::Relaxed.permits(&same_dept, &grid, 0, 1));
        assert!(!ConflictPolicy::Relaxed.permits(&same_subject, &grid, 0, 1));
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("Strict".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Strict);
        assert_eq!(" relaxed ".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Relaxed);
        assert!("loose".parse::<ConflictPolicy>().is_err());
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Strict);
    }
}
