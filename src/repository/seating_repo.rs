// ==========================================
// 考场编排系统 - 座位分配仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: seating_arrangements（软删除，status = ACTIVE / INACTIVE）
// 约束: 重新编排的"先清除后写入"必须在同一事务内完成
// ==========================================

use crate::domain::invigilator::SessionRoom;
use crate::domain::seating::{RoomOccupancy, SeatAssignment, SeatedCandidate};
use crate::domain::session::SessionKey;
use crate::domain::types::AssignmentStatus;
use crate::repository::error::{conversion_error, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row, Transaction};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct SeatingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SeatingRepository {
    /// 创建新的 SeatingRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 写入一次编排结果
    ///
    /// # 参数
    /// - `session`: 场次
    /// - `assignments`: 本次运行的座位分配
    /// - `preserve_existing`: false 时先将该场次全部 ACTIVE 记录置为 INACTIVE
    ///
    /// # 返回
    /// - `Ok((deactivated, inserted))`: 失效条数与写入条数
    ///
    /// # 红线
    /// - 失效与写入在同一事务内，任何一步失败整体回滚，旧编排保持 ACTIVE
    pub fn replace_session(
        &self,
        session: &SessionKey,
        assignments: &[SeatAssignment],
        preserve_existing: bool,
    ) -> RepositoryResult<(usize, usize)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let deactivated = if preserve_existing {
            0
        } else {
            Self::deactivate_in_tx(&tx, session)?
        };

        for a in assignments {
            Self::insert_in_tx(&tx, a)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok((deactivated, assignments.len()))
    }

    /// 将场次下全部 ACTIVE 座位置为 INACTIVE
    pub fn deactivate_session(&self, session: &SessionKey) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let n = Self::deactivate_in_tx(&tx, session)?;
        tx.commit()?;
        Ok(n)
    }

    fn deactivate_in_tx(tx: &Transaction<'_>, session: &SessionKey) -> RepositoryResult<usize> {
        let n = tx.execute(
            r#"
            UPDATE seating_arrangements
            SET status = 'INACTIVE', updated_at = datetime('now')
            WHERE exam_date = ?1 AND session_time = ?2 AND status = 'ACTIVE'
            "#,
            params![session.date_str(), session.time_str()],
        )?;
        Ok(n)
    }

    fn insert_in_tx(tx: &Transaction<'_>, a: &SeatAssignment) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO seating_arrangements (
                arrangement_id, student_id, subject_code, room_id,
                seat_row, seat_col, seat_label, exam_date, session_time, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                a.arrangement_id,
                a.candidate_id,
                a.subject_code,
                a.room_id,
                a.row,
                a.col,
                a.seat_label,
                a.session_key.date_str(),
                a.session_key.time_str(),
                a.status.to_db_str(),
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询场次的 ACTIVE 座位（按考场、行、列排序）
    pub fn find_active_by_session(&self, session: &SessionKey) -> RepositoryResult<Vec<SeatAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, arrangement_id, student_id, subject_code, room_id,
                   seat_row, seat_col, seat_label, exam_date, session_time, status
            FROM seating_arrangements
            WHERE exam_date = ?1 AND session_time = ?2 AND status = 'ACTIVE'
            ORDER BY room_id, seat_row, seat_col
            "#,
        )?;

        let rows = stmt
            .query_map(params![session.date_str(), session.time_str()], Self::map_row)?
            .collect::<SqliteResult<Vec<SeatAssignment>>>()?;
        Ok(rows)
    }

    /// 查询场次 ACTIVE 座位及考生院系（审计视图）
    pub fn find_seated_candidates(&self, session: &SessionKey) -> RepositoryResult<Vec<SeatedCandidate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sa.student_id, s.name, s.department, sa.subject_code,
                   sa.room_id, sa.seat_row, sa.seat_col
            FROM seating_arrangements sa
            JOIN students s ON s.student_id = sa.student_id
            WHERE sa.exam_date = ?1 AND sa.session_time = ?2 AND sa.status = 'ACTIVE'
            ORDER BY sa.room_id, sa.seat_row, sa.seat_col
            "#,
        )?;

        let rows = stmt
            .query_map(params![session.date_str(), session.time_str()], |row| {
                Ok(SeatedCandidate {
                    candidate_id: row.get(0)?,
                    candidate_name: row.get(1)?,
                    department: row.get(2)?,
                    subject_code: row.get(3)?,
                    room_id: row.get(4)?,
                    row: row.get(5)?,
                    col: row.get(6)?,
                })
            })?
            .collect::<SqliteResult<Vec<SeatedCandidate>>>()?;
        Ok(rows)
    }

    /// 场次内已有 ACTIVE 座位的考场
    pub fn occupied_room_ids(&self, session: &SessionKey) -> RepositoryResult<HashSet<String>> {
        self.distinct_column(session, "room_id")
    }

    /// 场次内已入座的考生
    pub fn seated_candidate_ids(&self, session: &SessionKey) -> RepositoryResult<HashSet<String>> {
        self.distinct_column(session, "student_id")
    }

    fn distinct_column(&self, session: &SessionKey, column: &str) -> RepositoryResult<HashSet<String>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT DISTINCT {} FROM seating_arrangements \
             WHERE exam_date = ?1 AND session_time = ?2 AND status = 'ACTIVE'",
            column
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![session.date_str(), session.time_str()], |row| row.get(0))?
            .collect::<SqliteResult<HashSet<String>>>()?;
        Ok(ids)
    }

    /// 各考场占用情况（仅含有 ACTIVE 座位的考场）
    pub fn room_occupancy(&self, session: &SessionKey) -> RepositoryResult<Vec<RoomOccupancy>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.room_id, r.name, r.capacity, COUNT(sa.id)
            FROM seating_arrangements sa
            JOIN rooms r ON r.room_id = sa.room_id
            WHERE sa.exam_date = ?1 AND sa.session_time = ?2 AND sa.status = 'ACTIVE'
            GROUP BY r.room_id, r.name, r.capacity
            ORDER BY r.room_id
            "#,
        )?;

        let rows = stmt
            .query_map(params![session.date_str(), session.time_str()], |row| {
                Ok(RoomOccupancy {
                    room_id: row.get(0)?,
                    room_name: row.get(1)?,
                    capacity: row.get(2)?,
                    occupied: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<RoomOccupancy>>>()?;
        Ok(rows)
    }

    /// 场次内在用考场及其主科目（人数最多的科目，同数取编码较小者）
    pub fn session_rooms(&self, session: &SessionKey) -> RepositoryResult<Vec<SessionRoom>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT room_id, subject_code, COUNT(*) AS n
            FROM seating_arrangements
            WHERE exam_date = ?1 AND session_time = ?2 AND status = 'ACTIVE'
            GROUP BY room_id, subject_code
            ORDER BY room_id, n DESC, subject_code
            "#,
        )?;

        let pairs = stmt
            .query_map(params![session.date_str(), session.time_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<SqliteResult<Vec<(String, String)>>>()?;

        let mut rooms: Vec<SessionRoom> = Vec::new();
        for (room_id, subject_code) in pairs {
            if rooms.last().map(|r| r.room_id != room_id).unwrap_or(true) {
                rooms.push(SessionRoom { room_id, subject_code });
            }
        }
        Ok(rooms)
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<SeatAssignment> {
        let exam_date: String = row.get(8)?;
        let session_time: String = row.get(9)?;
        let session_key = SessionKey::parse(&exam_date, &session_time)
            .ok_or_else(|| conversion_error(8, "exam_date/session_time", &format!("{} {}", exam_date, session_time)))?;
        let status: String = row.get(10)?;

        Ok(SeatAssignment {
            id: Some(row.get(0)?),
            arrangement_id: row.get(1)?,
            candidate_id: row.get(2)?,
            subject_code: row.get(3)?,
            room_id: row.get(4)?,
            row: row.get(5)?,
            col: row.get(6)?,
            seat_label: row.get(7)?,
            session_key,
            status: AssignmentStatus::from_db_str(&status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup() -> (Arc<Mutex<Connection>>, SessionKey) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO students (student_id, name, department) VALUES
                ('S1', 'Ann', 'CSE'), ('S2', 'Bob', 'ECE'), ('S3', 'Cid', 'ME');
            INSERT INTO rooms (room_id, name, rows, cols, capacity) VALUES ('R1', 'Hall 1', 2, 2, 4);
            "#,
        )
        .unwrap();
        let key = SessionKey::parse("2024-06-10", "09:00").unwrap();
        (Arc::new(Mutex::new(conn)), key)
    }

    fn seat(key: SessionKey, id: &str, subject: &str, row: u32, col: u32) -> SeatAssignment {
        SeatAssignment {
            id: None,
            candidate_id: id.to_string(),
            subject_code: subject.to_string(),
            room_id: "R1".to_string(),
            row,
            col,
            seat_label: format!("{}", (row - 1) * 2 + col),
            session_key: key,
            arrangement_id: Some("run-1".to_string()),
            status: AssignmentStatus::Active,
        }
    }

    #[test]
    fn test_replace_session_deactivates_previous_run() {
        let (conn, key) = setup();
        let repo = SeatingRepository::new(conn);

        repo.replace_session(&key, &[seat(key, "S1", "CS101", 1, 1)], false).unwrap();
        let (deactivated, inserted) = repo
            .replace_session(&key, &[seat(key, "S1", "CS101", 2, 2), seat(key, "S2", "MA101", 1, 1)], false)
            .unwrap();

        assert_eq!((deactivated, inserted), (1, 2));
        let active = repo.find_active_by_session(&key).unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].candidate_id, "S2");
        assert_eq!(active[1].row, 2);
    }

    #[test]
    fn test_failed_insert_rolls_back_deactivation() {
        let (conn, key) = setup();
        let repo = SeatingRepository::new(conn);
        repo.replace_session(&key, &[seat(key, "S1", "CS101", 1, 1)], false).unwrap();

        // 同一座位两次写入 -> 唯一索引冲突
        let result = repo.replace_session(
            &key,
            &[seat(key, "S2", "CS101", 1, 2), seat(key, "S3", "CS101", 1, 2)],
            false,
        );
        assert!(matches!(result, Err(RepositoryError::UniqueConstraintViolation(_))));

        let active = repo.find_active_by_session(&key).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].candidate_id, "S1");
    }

    #[test]
    fn test_session_rooms_majority_subject() {
        let (conn, key) = setup();
        let repo = SeatingRepository::new(conn);
        repo.replace_session(
            &key,
            &[
                seat(key, "S1", "MA101", 1, 1),
                seat(key, "S2", "CS101", 1, 2),
                seat(key, "S3", "CS101", 2, 1),
            ],
            false,
        )
        .unwrap();

        let rooms = repo.session_rooms(&key).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].subject_code, "CS101");

        let occupancy = repo.room_occupancy(&key).unwrap();
        assert_eq!(occupancy[0].occupied, 3);
        assert_eq!(repo.occupied_room_ids(&key).unwrap().len(), 1);
        assert!(repo.seated_candidate_ids(&key).unwrap().contains("S3"));
    }
}
