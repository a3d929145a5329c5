// ==========================================
// 监考分配 API 集成测试
// ==========================================
// 职责: 覆盖自动分配、手工分配防重、撤销、安排表
// ==========================================


#[cfg(test)]
mod invigilator_api_test {
    use exam_seating::api::{ApiError, GenerateRequest};
    use exam_seating::app::AppState;
    use exam_seating::config::config_keys;
    use std::collections::HashSet;

    use crate::test_helpers::*;

    /// 两个考场、两个科目各 3 人，并完成座位编排
    fn seat_morning(state: &AppState) {
        seed_rooms(state, &[("A", 3, 3), ("B", 3, 3)]);
        seed_subject(
            state,
            "CS101",
            &[("S1", "CSE"), ("S2", "ECE"), ("S3", "ME")],
            EXAM_DATE,
            MORNING,
            "12:00",
        );
        state
            .seating_api
            .generate(&GenerateRequest {
                conflict_policy: Some("relaxed".to_string()),
                seed: Some(11),
                ..GenerateRequest::new(EXAM_DATE, MORNING)
            })
            .unwrap();
        seed_subject(
            state,
            "MA101",
            &[("S4", "CSE"), ("S5", "ECE"), ("S6", "ME")],
            EXAM_DATE,
            MORNING,
            "12:00",
        );
        state
            .seating_api
            .generate(&GenerateRequest {
                conflict_policy: Some("relaxed".to_string()),
                preserve_existing: true,
                seed: Some(12),
                ..GenerateRequest::new(EXAM_DATE, MORNING)
            })
            .unwrap();
    }

    // ==========================================
    // 手工分配
    // ==========================================

    #[test]
    fn test_manual_double_booking_rejected() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seat_morning(&state);
        state.invigilator_api.register_staff("T1", "Tan", Some("CSE")).unwrap();

        let id = state
            .invigilator_api
            .assign_manual("T1", "A", EXAM_DATE, MORNING)
            .unwrap();
        assert!(id > 0);

        let err = state
            .invigilator_api
            .assign_manual("T1", "B", EXAM_DATE, MORNING)
            .unwrap_err();
        match err {
            ApiError::InvigilatorConflict { staff_id, room_id, message } => {
                assert_eq!(staff_id, "T1");
                assert_eq!(room_id, "B");
                assert!(message.contains("考场 A"), "消息应指明已占用的考场: {}", message);
            }
            other => panic!("期望 InvigilatorConflict, 实际 {:?}", other),
        }

        let chart = state.invigilator_api.duty_chart(EXAM_DATE).unwrap();
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].room_id, "A");
        assert_eq!(chart[0].subject_code, "CS101");
    }

    #[test]
    fn test_manual_unknown_staff_is_not_found() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seat_morning(&state);
        assert!(matches!(
            state.invigilator_api.assign_manual("NOBODY", "A", EXAM_DATE, MORNING),
            Err(ApiError::NotFound(_))
        ));
    }

    // ==========================================
    // 自动分配
    // ==========================================

    #[test]
    fn test_auto_assign_covers_each_room_once() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seat_morning(&state);
        for (id, name) in [("T1", "Tan"), ("T2", "Lee"), ("T3", "Kim")] {
            state.invigilator_api.register_staff(id, name, None).unwrap();
        }

        let summary = state
            .invigilator_api
            .assign_invigilators(EXAM_DATE, MORNING, None)
            .unwrap();
        assert_eq!(summary.made_count, 2);
        assert!(summary.conflicts.is_empty());

        let chart = state.invigilator_api.duty_chart(EXAM_DATE).unwrap();
        let rooms: HashSet<&str> = chart.iter().map(|e| e.room_id.as_str()).collect();
        let staff: HashSet<&str> = chart.iter().map(|e| e.staff_id.as_str()).collect();
        assert_eq!(rooms.len(), 2);
        assert_eq!(staff.len(), 2);
        // 安排表按开考时间、姓名排序
        assert!(chart.windows(2).all(|w| w[0].staff_name <= w[1].staff_name));

        // 再次运行：考场已有监考，不重复分配
        let again = state
            .invigilator_api
            .assign_invigilators(EXAM_DATE, MORNING, Some("least_loaded"))
            .unwrap();
        assert_eq!(again.made_count, 0);
        assert_eq!(state.invigilator_api.duty_chart(EXAM_DATE).unwrap().len(), 2);
    }

    #[test]
    fn test_single_staff_two_rooms_reports_conflict() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seat_morning(&state);
        state.invigilator_api.register_staff("T1", "Tan", None).unwrap();

        let summary = state
            .invigilator_api
            .assign_invigilators(EXAM_DATE, MORNING, None)
            .unwrap();

        assert_eq!(summary.made_count, 1);
        assert!(!summary.conflicts.is_empty());
        assert!(summary.conflict_details.iter().any(|c| c.staff_id.is_none()));
        assert_eq!(state.invigilator_api.duty_chart(EXAM_DATE).unwrap().len(), 1);
    }

    #[test]
    fn test_overlapping_sessions_detected_by_interval() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seat_morning(&state);
        // 10:00-13:00 与 09:00-12:00 重叠，但场次键不同
        seed_subject(&state, "PH101", &[("S7", "PHY")], EXAM_DATE, "10:00", "13:00");
        state
            .seating_api
            .generate(&GenerateRequest {
                seed: Some(1),
                ..GenerateRequest::new(EXAM_DATE, "10:00")
            })
            .unwrap();
        state.invigilator_api.register_staff("T1", "Tan", None).unwrap();

        state
            .invigilator_api
            .assign_manual("T1", "A", EXAM_DATE, MORNING)
            .unwrap();

        // 空闲名单按区间排除
        assert!(state
            .invigilator_api
            .available_staff(EXAM_DATE, "10:00")
            .unwrap()
            .is_empty());

        let summary = state
            .invigilator_api
            .assign_invigilators(EXAM_DATE, "10:00", None)
            .unwrap();
        assert_eq!(summary.made_count, 0);
        assert!(summary
            .conflict_details
            .iter()
            .any(|c| c.held_room_id.as_deref() == Some("A")));
    }

    #[test]
    fn test_daily_limit_from_config() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        state
            .config_manager
            .set_global_config_value(config_keys::DEFAULT_MAX_ASSIGNMENTS, "1")
            .unwrap();
        seat_morning(&state);
        seed_subject(&state, "PH101", &[("S7", "PHY")], EXAM_DATE, AFTERNOON, "17:00");
        state
            .seating_api
            .generate(&GenerateRequest {
                seed: Some(1),
                ..GenerateRequest::new(EXAM_DATE, AFTERNOON)
            })
            .unwrap();

        let staff = state.invigilator_api.register_staff("T1", "Tan", None).unwrap();
        assert_eq!(staff.max_assignments, 1);

        state
            .invigilator_api
            .assign_manual("T1", "A", EXAM_DATE, MORNING)
            .unwrap();
        let summary = state
            .invigilator_api
            .assign_invigilators(EXAM_DATE, AFTERNOON, None)
            .unwrap();
        assert_eq!(summary.made_count, 0);
        assert!(summary.conflicts.iter().any(|m| m.contains("上限")));
    }

    // ==========================================
    // 撤销
    // ==========================================

    #[test]
    fn test_unassign_is_soft_delete() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        seat_morning(&state);
        state.invigilator_api.register_staff("T1", "Tan", None).unwrap();
        let id = state
            .invigilator_api
            .assign_manual("T1", "A", EXAM_DATE, MORNING)
            .unwrap();

        assert!(state.invigilator_api.unassign(id).unwrap());
        assert!(!state.invigilator_api.unassign(id).unwrap());
        assert!(matches!(
            state.invigilator_api.unassign(id + 1000),
            Err(ApiError::NotFound(_))
        ));
        assert!(state.invigilator_api.duty_chart(EXAM_DATE).unwrap().is_empty());

        let status: String = conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT status FROM invigilator_assignments WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "INACTIVE");

        // 撤销后可重新分配到另一考场
        assert!(state
            .invigilator_api
            .assign_manual("T1", "B", EXAM_DATE, MORNING)
            .is_ok());
    }
}
