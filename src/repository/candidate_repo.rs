// ==========================================
// 考场编排系统 - 考生名单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: students / subjects / student_subjects / exams
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::session::{SessionKey, DATE_FORMAT, TIME_FORMAT};
use crate::repository::error::{conversion_error, RepositoryError, RepositoryResult};
use crate::repository::roster::RosterResolver;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// CandidateRepository - 考生名单仓储
// ==========================================
pub struct CandidateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CandidateRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 基础数据写入（供导入层/测试使用）=====

    /// 插入或更新考生
    pub fn upsert_student(&self, student_id: &str, name: &str, department: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO students (student_id, name, department, is_active)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(student_id) DO UPDATE SET name = ?2, department = ?3, is_active = 1
            "#,
            params![student_id, name, department],
        )?;
        Ok(())
    }

    /// 插入或更新科目
    pub fn upsert_subject(&self, subject_code: &str, subject_name: &str, department: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO subjects (subject_code, subject_name, department, is_active)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(subject_code) DO UPDATE SET subject_name = ?2, department = ?3, is_active = 1
            "#,
            params![subject_code, subject_name, department],
        )?;
        Ok(())
    }

    /// 考生报考科目
    pub fn enroll(&self, student_id: &str, subject_code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO student_subjects (student_id, subject_code, is_active)
            VALUES (?1, ?2, 1)
            ON CONFLICT(student_id, subject_code) DO UPDATE SET is_active = 1
            "#,
            params![student_id, subject_code],
        )?;
        Ok(())
    }

    /// 新增考试安排
    ///
    /// # 返回
    /// - Ok(id): 新记录主键
    pub fn insert_exam(
        &self,
        subject_code: &str,
        exam_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO exams (subject_code, exam_date, start_time, end_time, is_active)
            VALUES (?1, ?2, ?3, ?4, 1)
            "#,
            params![
                subject_code,
                exam_date.format(DATE_FORMAT).to_string(),
                start_time.format(TIME_FORMAT).to_string(),
                end_time.format(TIME_FORMAT).to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl RosterResolver for CandidateRepository {
    fn subjects_in_session(&self, session: &SessionKey) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT e.subject_code
            FROM exams e
            JOIN subjects s ON s.subject_code = e.subject_code
            WHERE e.exam_date = ?1 AND e.start_time = ?2
              AND e.is_active = 1 AND s.is_active = 1
            ORDER BY e.subject_code
            "#,
        )?;

        let subjects = stmt
            .query_map(params![session.date_str(), session.time_str()], |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(subjects)
    }

    fn enrolled_candidates(&self, subject_code: &str) -> RepositoryResult<Vec<Candidate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.student_id, s.name, s.department, ss.subject_code
            FROM students s
            JOIN student_subjects ss ON ss.student_id = s.student_id
            WHERE ss.subject_code = ?1 AND ss.is_active = 1 AND s.is_active = 1
            ORDER BY s.student_id
            "#,
        )?;

        let candidates = stmt
            .query_map(params![subject_code], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    department: row.get(2)?,
                    subject_code: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<Candidate>>>()?;
        Ok(candidates)
    }

    fn session_end_time(&self, session: &SessionKey) -> RepositoryResult<Option<NaiveTime>> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn
            .query_row(
                r#"
                SELECT MAX(end_time) FROM exams
                WHERE exam_date = ?1 AND start_time = ?2 AND is_active = 1
                "#,
                params![session.date_str(), session.time_str()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        match raw {
            None => Ok(None),
            Some(s) => NaiveTime::parse_from_str(&s, TIME_FORMAT)
                .map(Some)
                .map_err(|_| RepositoryError::from(conversion_error(0, "end_time", &s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup() -> CandidateRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        CandidateRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    #[test]
    fn test_session_roster_and_end_time() {
        let repo = setup();
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        repo.upsert_subject("CS101", "Programming", "CSE").unwrap();
        repo.upsert_subject("MA101", "Calculus", "MATH").unwrap();
        for (id, dept) in [("S2", "ECE"), ("S1", "CSE")] {
            repo.upsert_student(id, id, dept).unwrap();
            repo.enroll(id, "CS101").unwrap();
        }
        repo.upsert_student("S3", "S3", "ME").unwrap();
        repo.enroll("S3", "MA101").unwrap();
        repo.insert_exam("CS101", date, t("09:00"), t("11:00")).unwrap();
        repo.insert_exam("MA101", date, t("09:00"), t("12:00")).unwrap();

        let key = SessionKey::parse("2024-06-10", "09:00").unwrap();
        assert_eq!(repo.subjects_in_session(&key).unwrap(), vec!["CS101", "MA101"]);

        let ids: Vec<String> = repo
            .candidates_for_session(&key)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);

        assert_eq!(repo.session_end_time(&key).unwrap(), Some(t("12:00")));
    }

    #[test]
    fn test_empty_session_has_no_end_time() {
        let repo = setup();
        let key = SessionKey::parse("2024-06-11", "14:00").unwrap();
        assert!(repo.subjects_in_session(&key).unwrap().is_empty());
        assert_eq!(repo.session_end_time(&key).unwrap(), None);
    }
}
