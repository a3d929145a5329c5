// ==========================================
// 考场编排系统 - 考生顺序与考场优先级
// ==========================================
// 职责: 编排前的两步排序
// 1) 按 ArrangementOrder 决定考生访问顺序（随机源由调用方注入）
// 2) 按 RoomStrategy 决定考场填充优先级
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::room::Room;
use crate::engine::strategy::{ArrangementOrder, RoomStrategy};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// 按编排方式生成考生访问顺序
///
/// - Mixed / Random: 整体均匀洗牌
/// - DepartmentWise: 按院系首次出现顺序分组，组内洗牌
/// - Alphabetical: 按姓名、学号排序（不消耗随机数）
pub fn arrange_candidates<R: Rng + ?Sized>(
    candidates: &[Candidate],
    order: ArrangementOrder,
    rng: &mut R,
) -> Vec<Candidate> {
    match order {
        ArrangementOrder::Mixed | ArrangementOrder::Random => {
            let mut shuffled = candidates.to_vec();
            shuffled.shuffle(rng);
            shuffled
        }
        ArrangementOrder::DepartmentWise => {
            let mut group_index: HashMap<&str, usize> = HashMap::new();
            let mut groups: Vec<Vec<Candidate>> = Vec::new();
            for candidate in candidates {
                let idx = *group_index
                    .entry(candidate.department.as_str())
                    .or_insert_with(|| {
                        groups.push(Vec::new());
                        groups.len() - 1
                    });
                groups[idx].push(candidate.clone());
            }

            let mut arranged = Vec::with_capacity(candidates.len());
            for mut group in groups {
                group.shuffle(rng);
                arranged.extend(group);
            }
            arranged
        }
        ArrangementOrder::Alphabetical => {
            let mut sorted = candidates.to_vec();
            sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            sorted
        }
    }
}

/// 按考场策略排列考场
///
/// 同容量时按 room_id 升序，保证结果确定
pub fn prioritize_rooms(rooms: &[Room], strategy: RoomStrategy, minimal_limit: usize) -> Vec<Room> {
    let mut ordered = rooms.to_vec();
    match strategy {
        RoomStrategy::Optimal | RoomStrategy::Minimal => {
            ordered.sort_by(|a, b| {
                b.capacity
                    .cmp(&a.capacity)
                    .then_with(|| a.room_id.cmp(&b.room_id))
            });
        }
        RoomStrategy::Balanced => {
            ordered.sort_by(|a, b| {
                a.capacity
                    .cmp(&b.capacity)
                    .then_with(|| a.room_id.cmp(&b.room_id))
            });
        }
    }

    if strategy == RoomStrategy::Minimal {
        ordered.truncate(minimal_limit);
    }
    ordered
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn roster() -> Vec<Candidate> {
        vec![
            Candidate::new("S1", "Zoe", "CSE", "CS101"),
            Candidate::new("S2", "Amy", "ECE", "EC101"),
            Candidate::new("S3", "Bob", "CSE", "CS101"),
            Candidate::new("S4", "Amy", "ME", "ME101"),
            Candidate::new("S5", "Eve", "ECE", "EC101"),
        ]
    }

    #[test]
    fn test_shuffle_is_seed_deterministic() {
        let a = arrange_candidates(&roster(), ArrangementOrder::Mixed, &mut ChaCha8Rng::seed_from_u64(7));
        let b = arrange_candidates(&roster(), ArrangementOrder::Mixed, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_department_wise_groups_contiguously() {
        let arranged = arrange_candidates(
            &roster(),
            ArrangementOrder::DepartmentWise,
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        let depts: Vec<&str> = arranged.iter().map(|c| c.department.as_str()).collect();
        assert_eq!(&depts[..2], &["CSE", "CSE"]);
        assert_eq!(&depts[2..4], &["ECE", "ECE"]);
        assert_eq!(depts[4], "ME");
    }

    #[test]
    fn test_alphabetical_breaks_ties_by_id() {
        let arranged = arrange_candidates(
            &roster(),
            ArrangementOrder::Alphabetical,
            &mut ChaCha8Rng::seed_from_u64(0),
        );
        let ids: Vec<&str> = arranged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["S2", "S4", "S3", "S5", "S1"]);
    }

    #[test]
    fn test_room_priority() {
        let rooms = vec![Room::new("B", 3, 3), Room::new("A", 4, 5), Room::new("C", 3, 3)];

        let optimal = prioritize_rooms(&rooms, RoomStrategy::Optimal, 5);
        let ids: Vec<&str> = optimal.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let balanced = prioritize_rooms(&rooms, RoomStrategy::Balanced, 5);
        let ids: Vec<&str> = balanced.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);

        let minimal = prioritize_rooms(&rooms, RoomStrategy::Minimal, 2);
        assert_eq!(minimal.len(), 2);
        assert_eq!(minimal[0].room_id, "A");
    }
}
