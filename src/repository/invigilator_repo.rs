// ==========================================
// 考场编排系统 - 监考仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: invigilators / invigilator_assignments（软删除）
// 时间比较: exam_date / session_time / end_time 均为定长字符串，可直接按字典序比较
// ==========================================

use crate::domain::invigilator::{DutyChartEntry, InvigilatorAssignment, Staff};
use crate::domain::session::{SessionWindow, DATE_FORMAT, TIME_FORMAT};
use crate::domain::types::AssignmentStatus;
use crate::repository::error::{conversion_error, RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const ASSIGNMENT_COLUMNS: &str =
    "id, staff_id, room_id, exam_date, session_time, end_time, subject_code, status";

const STAFF_COLUMNS: &str = "staff_id, name, department, max_assignments";

pub struct InvigilatorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InvigilatorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 监考员
    // ==========================================

    /// 插入或更新监考员
    pub fn upsert_staff(&self, staff: &Staff) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO invigilators (staff_id, name, department, max_assignments, is_active)
            VALUES (?1, ?2, ?3, ?4, 1)
            ON CONFLICT(staff_id) DO UPDATE SET
                name = ?2, department = ?3, max_assignments = ?4, is_active = 1
            "#,
            params![staff.staff_id, staff.name, staff.department, staff.max_assignments],
        )?;
        Ok(())
    }

    /// 查询监考员
    pub fn find_staff(&self, staff_id: &str) -> RepositoryResult<Option<Staff>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM invigilators WHERE staff_id = ?1 AND is_active = 1",
            STAFF_COLUMNS
        );
        let staff = conn.query_row(&sql, params![staff_id], map_staff).optional()?;
        Ok(staff)
    }

    /// 全部启用的监考员（按编号）
    pub fn active_staff(&self) -> RepositoryResult<Vec<Staff>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM invigilators WHERE is_active = 1 ORDER BY staff_id",
            STAFF_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let staff = stmt
            .query_map([], map_staff)?
            .collect::<SqliteResult<Vec<Staff>>>()?;
        Ok(staff)
    }

    /// 在给定窗口内空闲的监考员
    ///
    /// 排除已持有与窗口重叠的 ACTIVE 安排的人员
    pub fn available_staff(&self, window: &SessionWindow) -> RepositoryResult<Vec<Staff>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM invigilators i
            WHERE i.is_active = 1
              AND NOT EXISTS (
                  SELECT 1 FROM invigilator_assignments ia
                  WHERE ia.staff_id = i.staff_id
                    AND ia.status = 'ACTIVE'
                    AND ia.exam_date = ?1
                    AND ia.session_time < ?3
                    AND ?2 < ia.end_time
              )
            ORDER BY i.staff_id
            "#,
            STAFF_COLUMNS
        );
        let (date, start, end) = window_params(window);
        let mut stmt = conn.prepare(&sql)?;
        let staff = stmt
            .query_map(params![date, start, end], map_staff)?
            .collect::<SqliteResult<Vec<Staff>>>()?;
        Ok(staff)
    }

    // ==========================================
    // 监考安排
    // ==========================================

    /// 是否存在与窗口重叠的 ACTIVE 安排
    pub fn exists_overlapping(&self, staff_id: &str, window: &SessionWindow) -> RepositoryResult<bool> {
        Ok(self.find_overlapping(staff_id, window)?.is_some())
    }

    /// 查询与窗口重叠的 ACTIVE 安排（取开考最早的一条）
    pub fn find_overlapping(
        &self,
        staff_id: &str,
        window: &SessionWindow,
    ) -> RepositoryResult<Option<InvigilatorAssignment>> {
        let conn = self.get_conn()?;
        find_overlapping_in(&conn, staff_id, window)
    }

    /// 查询某日全部 ACTIVE 安排
    pub fn find_active_by_date(&self, exam_date: NaiveDate) -> RepositoryResult<Vec<InvigilatorAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM invigilator_assignments \
             WHERE exam_date = ?1 AND status = 'ACTIVE' ORDER BY session_time, staff_id",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![exam_date.format(DATE_FORMAT).to_string()], map_assignment)?
            .collect::<SqliteResult<Vec<InvigilatorAssignment>>>()?;
        Ok(rows)
    }

    /// 按主键查询（含已失效记录）
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<InvigilatorAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM invigilator_assignments WHERE id = ?1",
            ASSIGNMENT_COLUMNS
        );
        let row = conn.query_row(&sql, params![id], map_assignment).optional()?;
        Ok(row)
    }

    /// 批量写入监考安排
    ///
    /// # 返回
    /// - `Ok(ids)`: 新记录主键，顺序与入参一致
    ///
    /// # 红线
    /// - 事务内逐条复核时间窗口重叠；任一条重叠则整体回滚
    pub fn insert_batch(&self, assignments: &[InvigilatorAssignment]) -> RepositoryResult<Vec<i64>> {
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(assignments.len());

        for a in assignments {
            if let Some(held) = find_overlapping_in(&tx, &a.staff_id, &a.window)? {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "监考员 {} 在 {} 已有安排（考场 {}）",
                    a.staff_id, held.window, held.room_id
                )));
            }
            ids.push(insert_in_tx(&tx, a)?);
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(ids)
    }

    /// 软删除一条安排
    ///
    /// # 返回
    /// - `Ok(true)`: 由 ACTIVE 置为 INACTIVE
    /// - `Ok(false)`: 记录已是 INACTIVE
    /// - `Err(NotFound)`: 主键不存在
    pub fn deactivate(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM invigilator_assignments WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match status {
            None => Err(RepositoryError::NotFound {
                entity: "InvigilatorAssignment".to_string(),
                id: id.to_string(),
            }),
            Some(s) if !AssignmentStatus::from_db_str(&s).is_active() => Ok(false),
            Some(_) => {
                conn.execute(
                    r#"
                    UPDATE invigilator_assignments
                    SET status = 'INACTIVE', updated_at = datetime('now')
                    WHERE id = ?1
                    "#,
                    params![id],
                )?;
                Ok(true)
            }
        }
    }

    /// 某日监考安排表（按开考时间、姓名排序）
    pub fn duty_chart(&self, exam_date: NaiveDate) -> RepositoryResult<Vec<DutyChartEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT ia.id, ia.staff_id, i.name, i.department, ia.room_id, r.name,
                   ia.subject_code, ia.exam_date, ia.session_time, ia.end_time
            FROM invigilator_assignments ia
            JOIN invigilators i ON i.staff_id = ia.staff_id
            JOIN rooms r ON r.room_id = ia.room_id
            WHERE ia.exam_date = ?1 AND ia.status = 'ACTIVE'
            ORDER BY ia.session_time, i.name, ia.room_id
            "#,
        )?;

        let rows = stmt
            .query_map(params![exam_date.format(DATE_FORMAT).to_string()], |row| {
                Ok(DutyChartEntry {
                    assignment_id: row.get(0)?,
                    staff_id: row.get(1)?,
                    staff_name: row.get(2)?,
                    department: row.get(3)?,
                    room_id: row.get(4)?,
                    room_name: row.get(5)?,
                    subject_code: row.get(6)?,
                    window: parse_window(row, 7)?,
                })
            })?
            .collect::<SqliteResult<Vec<DutyChartEntry>>>()?;
        Ok(rows)
    }
}

// ==========================================
// 行映射 / SQL 辅助
// ==========================================

fn window_params(window: &SessionWindow) -> (String, String, String) {
    (
        window.exam_date.format(DATE_FORMAT).to_string(),
        window.start.format(TIME_FORMAT).to_string(),
        window.end.format(TIME_FORMAT).to_string(),
    )
}

fn find_overlapping_in(
    conn: &Connection,
    staff_id: &str,
    window: &SessionWindow,
) -> RepositoryResult<Option<InvigilatorAssignment>> {
    let sql = format!(
        r#"
        SELECT {} FROM invigilator_assignments
        WHERE staff_id = ?1 AND status = 'ACTIVE' AND exam_date = ?2
          AND session_time < ?4 AND ?3 < end_time
        ORDER BY session_time
        LIMIT 1
        "#,
        ASSIGNMENT_COLUMNS
    );
    let (date, start, end) = window_params(window);
    let row = conn
        .query_row(&sql, params![staff_id, date, start, end], map_assignment)
        .optional()?;
    Ok(row)
}

fn insert_in_tx(tx: &Transaction<'_>, a: &InvigilatorAssignment) -> RepositoryResult<i64> {
    let (date, start, end) = window_params(&a.window);
    tx.execute(
        r#"
        INSERT INTO invigilator_assignments (
            staff_id, room_id, exam_date, session_time, end_time, subject_code, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![a.staff_id, a.room_id, date, start, end, a.subject_code, a.status.to_db_str()],
    )?;
    Ok(tx.last_insert_rowid())
}

fn map_staff(row: &Row<'_>) -> SqliteResult<Staff> {
    Ok(Staff {
        staff_id: row.get(0)?,
        name: row.get(1)?,
        department: row.get(2)?,
        max_assignments: row.get(3)?,
    })
}

/// 从 idx 起的 (exam_date, session_time, end_time) 三列解析窗口
fn parse_window(row: &Row<'_>, idx: usize) -> SqliteResult<SessionWindow> {
    let date: String = row.get(idx)?;
    let start: String = row.get(idx + 1)?;
    let end: String = row.get(idx + 2)?;

    let exam_date =
        NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|_| conversion_error(idx, "exam_date", &date))?;
    let start_time = NaiveTime::parse_from_str(&start, TIME_FORMAT)
        .map_err(|_| conversion_error(idx + 1, "session_time", &start))?;
    let end_time =
        NaiveTime::parse_from_str(&end, TIME_FORMAT).map_err(|_| conversion_error(idx + 2, "end_time", &end))?;

    Ok(SessionWindow::new(exam_date, start_time, end_time))
}

fn map_assignment(row: &Row<'_>) -> SqliteResult<InvigilatorAssignment> {
    let status: String = row.get(7)?;
    Ok(InvigilatorAssignment {
        id: Some(row.get(0)?),
        staff_id: row.get(1)?,
        room_id: row.get(2)?,
        window: parse_window(row, 3)?,
        subject_code: row.get(6)?,
        status: AssignmentStatus::from_db_str(&status),
    })
}
