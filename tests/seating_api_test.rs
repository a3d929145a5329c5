// ==========================================
// 座位编排 API 集成测试
// ==========================================
// 职责: 覆盖生成/重新生成/保留已有/审计/统计/回滚
// ==========================================


#[cfg(test)]
mod seating_api_test {
    use exam_seating::api::{ApiError, GenerateRequest};
    use exam_seating::config::config_keys;
    use exam_seating::domain::SessionKey;
    use exam_seating::engine::CancellationToken;
    use std::collections::HashSet;

    use crate::test_helpers::*;

    fn request(policy: &str, seed: u64) -> GenerateRequest {
        let mut req = GenerateRequest::new(EXAM_DATE, MORNING);
        req.conflict_policy = Some(policy.to_string());
        req.seed = Some(seed);
        req
    }

    // ==========================================
    // 容量溢出
    // ==========================================

    #[test]
    fn test_overflow_places_all_but_one() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("R20", 4, 5), ("R12", 3, 4), ("R09", 3, 3)]);
        // 42 名考生各考不同科目，relaxed 下互不冲突
        for i in 0..42 {
            let sid = format!("S{:03}", i);
            let subject = format!("SUB{:03}", i);
            seed_subject(&state, &subject, &[(sid.as_str(), "CSE")], EXAM_DATE, MORNING, "12:00");
        }

        let summary = state.seating_api.generate(&request("relaxed", 7)).unwrap();

        assert_eq!(summary.placed_count, 41);
        assert_eq!(summary.unplaced_count, 1);
        assert_eq!(summary.unplaced.len(), 1);
        assert_eq!(summary.rooms_used, 3);
        assert!(summary.arrangement_id.is_some());
        assert_eq!(count_active_seats(&conn, EXAM_DATE, MORNING), 41);

        let stats = state.seating_api.statistics(EXAM_DATE, MORNING).unwrap();
        assert_eq!(stats.total_candidates, 41);
        assert_eq!(stats.rooms_used, 3);
        assert_eq!(stats.avg_occupancy, 100.0);
    }

    #[test]
    fn test_capacity_fast_fail_writes_nothing() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        state
            .config_manager
            .set_global_config_value(config_keys::CAPACITY_FAST_FAIL, "true")
            .unwrap();
        seed_rooms(&state, &[("R1", 2, 2)]);
        let students = make_students("S", 5, &["CSE", "ECE"]);
        seed_subject(&state, "CS101", &as_refs(&students), EXAM_DATE, MORNING, "12:00");

        let summary = state.seating_api.generate(&request("relaxed", 1)).unwrap();

        let shortfall = summary.capacity_shortfall.unwrap();
        assert_eq!((shortfall.required, shortfall.available), (5, 4));
        assert_eq!(summary.placed_count, 0);
        assert_eq!(summary.unplaced_count, 5);
        assert!(summary.arrangement_id.is_none());
        assert_eq!(count_active_seats(&conn, EXAM_DATE, MORNING), 0);
    }

    // ==========================================
    // 重新生成 / 审计
    // ==========================================

    #[test]
    fn test_regeneration_replaces_previous_run() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 5, 5), ("B", 5, 5)]);
        let students = make_students("S", 12, &["CSE", "ECE", "ME", "CE"]);
        seed_subject(&state, "CS101", &as_refs(&students[..6]), EXAM_DATE, MORNING, "12:00");
        seed_subject(&state, "MA101", &as_refs(&students[6..]), EXAM_DATE, MORNING, "12:00");

        let first = state.seating_api.generate(&request("strict", 1)).unwrap();
        let second = state.seating_api.generate(&request("strict", 2)).unwrap();

        assert_ne!(first.arrangement_id, second.arrangement_id);
        assert_eq!(
            count_active_seats(&conn, EXAM_DATE, MORNING),
            second.placed_count as i64
        );

        let seats = state.seating_api.list_seats(EXAM_DATE, MORNING).unwrap();
        assert!(seats
            .iter()
            .all(|s| s.arrangement_id == second.arrangement_id));

        // 座位与考生在 ACTIVE 记录中均唯一
        let positions: HashSet<(String, u32, u32)> =
            seats.iter().map(|s| (s.room_id.clone(), s.row, s.col)).collect();
        let ids: HashSet<&str> = seats.iter().map(|s| s.candidate_id.as_str()).collect();
        assert_eq!(positions.len(), seats.len());
        assert_eq!(ids.len(), seats.len());
    }

    #[test]
    fn test_strict_arrangement_audits_clean() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 6, 6), ("B", 4, 4)]);
        let students = make_students("S", 20, &["CSE", "ECE", "ME"]);
        seed_subject(&state, "CS101", &as_refs(&students[..10]), EXAM_DATE, MORNING, "12:00");
        seed_subject(&state, "EE201", &as_refs(&students[10..]), EXAM_DATE, MORNING, "12:00");

        let summary = state.seating_api.generate(&request("strict", 99)).unwrap();
        assert_eq!(summary.placed_count + summary.unplaced_count, 20);

        let conflicts = state.seating_api.validate(EXAM_DATE, MORNING).unwrap();
        assert!(conflicts.is_empty(), "strict 编排不应有相邻冲突: {:?}", conflicts);
    }

    #[test]
    fn test_same_seed_reproduces_layout() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 4, 4)]);
        let students = make_students("S", 8, &["CSE", "ECE"]);
        seed_subject(&state, "CS101", &as_refs(&students), EXAM_DATE, MORNING, "12:00");

        let mut req = request("moderate", 2024);
        req.arrangement_type = Some("random".to_string());

        state.seating_api.generate(&req).unwrap();
        let first: Vec<(String, u32, u32)> = state
            .seating_api
            .list_seats(EXAM_DATE, MORNING)
            .unwrap()
            .into_iter()
            .map(|s| (s.candidate_id, s.row, s.col))
            .collect();

        state.seating_api.generate(&req).unwrap();
        let second: Vec<(String, u32, u32)> = state
            .seating_api
            .list_seats(EXAM_DATE, MORNING)
            .unwrap()
            .into_iter()
            .map(|s| (s.candidate_id, s.row, s.col))
            .collect();

        assert_eq!(first, second);
    }

    // ==========================================
    // 保留已有编排
    // ==========================================

    #[test]
    fn test_preserve_existing_only_seats_newcomers() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 3, 3), ("B", 3, 3)]);
        seed_subject(
            &state,
            "CS101",
            &[("S1", "CSE"), ("S2", "ECE"), ("S3", "ME")],
            EXAM_DATE,
            MORNING,
            "12:00",
        );
        state.seating_api.generate(&request("relaxed", 3)).unwrap();
        let before = state.seating_api.list_seats(EXAM_DATE, MORNING).unwrap();
        assert!(before.iter().all(|s| s.room_id == "A"));

        seed_subject(
            &state,
            "MA101",
            &[("S4", "CSE"), ("S5", "ECE"), ("S6", "ME")],
            EXAM_DATE,
            MORNING,
            "12:00",
        );
        let mut req = request("relaxed", 4);
        req.preserve_existing = true;
        let summary = state.seating_api.generate(&req).unwrap();

        assert_eq!(summary.placed_count, 3);
        assert_eq!(count_active_seats(&conn, EXAM_DATE, MORNING), 6);

        let after = state.seating_api.list_seats(EXAM_DATE, MORNING).unwrap();
        for seat in &before {
            assert!(after
                .iter()
                .any(|s| s.candidate_id == seat.candidate_id && s.row == seat.row && s.col == seat.col));
        }
        assert!(after
            .iter()
            .filter(|s| ["S4", "S5", "S6"].contains(&s.candidate_id.as_str()))
            .all(|s| s.room_id == "B"));
    }

    // ==========================================
    // 失败与取消
    // ==========================================

    #[test]
    fn test_failed_write_keeps_previous_arrangement() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 3, 3)]);
        seed_subject(
            &state,
            "CS101",
            &[("S1", "CSE"), ("S2", "ECE"), ("S3", "ME")],
            EXAM_DATE,
            MORNING,
            "12:00",
        );
        let first = state.seating_api.generate(&request("relaxed", 5)).unwrap();

        // 写入 BAD 考生时中止，模拟写库中途失败
        conn.lock()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TRIGGER fail_bad_insert BEFORE INSERT ON seating_arrangements
                WHEN NEW.student_id = 'BAD'
                BEGIN
                    SELECT RAISE(ABORT, 'simulated write failure');
                END;
                "#,
            )
            .unwrap();
        state.candidate_repo.upsert_student("BAD", "Bad", "CSE").unwrap();
        state.candidate_repo.enroll("BAD", "CS101").unwrap();

        let result = state.seating_api.generate(&request("relaxed", 6));
        assert!(matches!(result, Err(ApiError::DatabaseError(_))));

        let seats = state.seating_api.list_seats(EXAM_DATE, MORNING).unwrap();
        assert_eq!(seats.len(), 3);
        assert!(seats.iter().all(|s| s.arrangement_id == first.arrangement_id));
        assert_eq!(count_active_seats(&conn, EXAM_DATE, MORNING), 3);
    }

    #[test]
    fn test_cancelled_run_does_not_persist() {
        let (_tmp, conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 3, 3)]);
        seed_subject(&state, "CS101", &[("S1", "CSE"), ("S2", "ECE")], EXAM_DATE, MORNING, "12:00");

        let token = CancellationToken::new();
        token.cancel();
        let result = state
            .seating_api
            .generate_with_cancel(&request("strict", 1), Some(&token));

        assert!(matches!(result, Err(ApiError::Cancelled(_))));
        assert_eq!(count_active_seats(&conn, EXAM_DATE, MORNING), 0);
    }

    // ==========================================
    // 输入校验 / 并发
    // ==========================================

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 3, 3)]);

        let result = state.seating_api.generate(&request("lenient", 1));
        assert!(matches!(result, Err(ApiError::ValidationError(_))));

        let bad_date = GenerateRequest::new("2024/06/10", MORNING);
        assert!(matches!(
            state.seating_api.generate(&bad_date),
            Err(ApiError::ValidationError(_))
        ));

        assert!(matches!(
            state.seating_api.format_seat_label("A", 0, 1, None, 3),
            Err(ApiError::ValidationError(_))
        ));
        assert_eq!(
            state
                .seating_api
                .format_seat_label("LAB2", 1, 7, Some("room_prefix"), 10)
                .unwrap(),
            "LAB2-007"
        );
    }

    #[test]
    fn test_session_busy_while_locked() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 3, 3)]);
        seed_subject(&state, "CS101", &[("S1", "CSE")], EXAM_DATE, MORNING, "12:00");

        let key = SessionKey::parse(EXAM_DATE, MORNING).unwrap();
        let guard = state.session_locks.try_acquire(key).unwrap();
        assert!(matches!(
            state.seating_api.generate(&request("strict", 1)),
            Err(ApiError::SessionBusy(_))
        ));

        drop(guard);
        assert!(state.seating_api.generate(&request("strict", 1)).is_ok());
    }

    #[test]
    fn test_zero_candidates_is_empty_success() {
        let (_tmp, _conn, state) = create_test_state().unwrap();
        seed_rooms(&state, &[("A", 3, 3)]);

        let summary = state.seating_api.generate(&request("strict", 1)).unwrap();
        assert_eq!(summary.placed_count, 0);
        assert_eq!(summary.unplaced_count, 0);
        assert!(summary.is_complete());

        let stats = state.seating_api.statistics(EXAM_DATE, MORNING).unwrap();
        assert_eq!(stats.rooms_used, 0);
    }
}
