// ==========================================
// 考场编排系统 - 监考分配引擎
// ==========================================
// 职责: 场次内考场与监考员的轮转匹配
// 红线: 同一监考员不得持有时间窗口重叠的两条 ACTIVE 安排
// 说明: 冲突以数据返回，冲突项直接跳过，不抛错
// ==========================================

use crate::domain::invigilator::{InvigilatorAssignment, SessionRoom, Staff};
use crate::domain::session::SessionWindow;
use crate::engine::strategy::InvigilatorStrategy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

// ==========================================
// AssignmentConflict - 分配冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentConflict {
    pub staff_id: Option<String>,
    pub room_id: String,
    /// 已占用该监考员的考场（时间重叠时）
    pub held_room_id: Option<String>,
    pub message: String,
}

/// 一次自动分配的结果
#[derive(Debug, Clone, Default)]
pub struct InvigilatorPlan {
    pub made: Vec<InvigilatorAssignment>,
    pub conflicts: Vec<AssignmentConflict>,
}

/// 查找与窗口重叠的 ACTIVE 安排
pub fn find_overlap<'a>(
    existing: &'a [InvigilatorAssignment],
    staff_id: &str,
    window: &SessionWindow,
) -> Option<&'a InvigilatorAssignment> {
    existing
        .iter()
        .find(|a| a.staff_id == staff_id && a.conflicts_with(window))
}

/// 生成重叠冲突（手工分配与自动分配共用）
pub fn overlap_conflict(
    staff_id: &str,
    target_room_id: &str,
    held: &InvigilatorAssignment,
) -> AssignmentConflict {
    AssignmentConflict {
        staff_id: Some(staff_id.to_string()),
        room_id: target_room_id.to_string(),
        held_room_id: Some(held.room_id.clone()),
        message: format!(
            "监考员 {} 已安排在考场 {}（{}），不能同时监考考场 {}",
            staff_id, held.room_id, held.window, target_room_id
        ),
    }
}

// ==========================================
// InvigilatorAssigner - 监考分配引擎
// ==========================================
pub struct InvigilatorAssigner {
    // 无状态引擎
}

impl InvigilatorAssigner {
    pub fn new() -> Self {
        Self {}
    }

    /// 为场次内考场分配监考员
    ///
    /// 规则：
    /// 1) 每个考场至多分配一名监考员
    /// 2) 考场依次轮转，游标在监考员列表上循环前进
    /// 3) 落位前检查该监考员是否已有时间重叠的 ACTIVE 安排（含本次已分配）
    /// 4) 当日安排数达到 max_assignments 的监考员跳过
    /// 5) 被跳过的监考员记为冲突（每人每原因只报告一次）
    ///
    /// # 参数
    /// - `rooms`: 场次内需要监考的考场
    /// - `window`: 场次窗口
    /// - `staff`: 可用监考员
    /// - `existing`: 这些监考员在当日已有的安排
    /// - `strategy`: 分配策略
    #[instrument(skip_all, fields(
        window = %window,
        rooms_count = rooms.len(),
        staff_count = staff.len(),
        strategy = strategy.as_str()
    ))]
    pub fn assign(
        &self,
        rooms: &[SessionRoom],
        window: SessionWindow,
        staff: &[Staff],
        existing: &[InvigilatorAssignment],
        strategy: InvigilatorStrategy,
    ) -> InvigilatorPlan {
        let mut plan = InvigilatorPlan::default();
        if rooms.is_empty() {
            return plan;
        }

        let mut daily_load: HashMap<&str, u32> = HashMap::new();
        for a in existing
            .iter()
            .filter(|a| a.status.is_active() && a.window.exam_date == window.exam_date)
        {
            *daily_load.entry(a.staff_id.as_str()).or_default() += 1;
        }

        let ordered = order_staff(staff, &daily_load, strategy);

        // 本次已落位的安排同样参与重叠检查
        let mut ledger: Vec<InvigilatorAssignment> = existing.to_vec();
        let mut reported: HashSet<(String, &'static str)> = HashSet::new();
        let mut cursor = 0usize;

        for room in rooms {
            let mut assigned = false;

            for _ in 0..ordered.len() {
                let member = ordered[cursor % ordered.len()];
                cursor += 1;

                if let Some(held) = find_overlap(&ledger, &member.staff_id, &window) {
                    if reported.insert((member.staff_id.clone(), "overlap")) {
                        plan.conflicts
                            .push(overlap_conflict(&member.staff_id, &room.room_id, held));
                    }
                    continue;
                }

                let load = daily_load.get(member.staff_id.as_str()).copied().unwrap_or(0);
                if load >= member.max_assignments {
                    if reported.insert((member.staff_id.clone(), "max")) {
                        plan.conflicts.push(AssignmentConflict {
                            staff_id: Some(member.staff_id.clone()),
                            room_id: room.room_id.clone(),
                            held_room_id: None,
                            message: format!(
                                "监考员 {} 当日已安排 {} 场，达到上限 {}",
                                member.staff_id, load, member.max_assignments
                            ),
                        });
                    }
                    continue;
                }

                let assignment = InvigilatorAssignment::new_active(
                    member.staff_id.clone(),
                    room.room_id.clone(),
                    window,
                    room.subject_code.clone(),
                );
                ledger.push(assignment.clone());
                plan.made.push(assignment);
                *daily_load.entry(member.staff_id.as_str()).or_default() += 1;
                assigned = true;
                break;
            }

            if !assigned {
                plan.conflicts.push(AssignmentConflict {
                    staff_id: None,
                    room_id: room.room_id.clone(),
                    held_room_id: None,
                    message: format!("考场 {} 没有可用的监考员", room.room_id),
                });
            }
        }

        info!(
            made = plan.made.len(),
            conflicts = plan.conflicts.len(),
            "监考分配完成"
        );
        plan
    }
}

impl Default for InvigilatorAssigner {
    fn default() -> Self {
        Self::new()
    }
}

/// 按策略确定监考员轮转顺序
fn order_staff<'a>(
    staff: &'a [Staff],
    daily_load: &HashMap<&str, u32>,
    strategy: InvigilatorStrategy,
) -> Vec<&'a Staff> {
    let mut ordered: Vec<&Staff> = staff.iter().collect();
    if strategy == InvigilatorStrategy::LeastLoaded {
        ordered.sort_by(|a, b| {
            let la = daily_load.get(a.staff_id.as_str()).copied().unwrap_or(0);
            let lb = daily_load.get(b.staff_id.as_str()).copied().unwrap_or(0);
            la.cmp(&lb).then_with(|| a.staff_id.cmp(&b.staff_id))
        });
    }
    ordered
}
