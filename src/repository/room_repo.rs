// ==========================================
// 考场编排系统 - 考场仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: rooms
// ==========================================

use crate::domain::room::Room;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::roster::RoomInventory;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ROOM_COLUMNS: &str = "room_id, name, rows, cols, capacity";

pub struct RoomRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoomRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<Room> {
        Ok(Room {
            room_id: row.get(0)?,
            name: row.get(1)?,
            rows: row.get(2)?,
            cols: row.get(3)?,
            capacity: row.get(4)?,
        })
    }

    /// 插入或更新考场（重新启用）
    pub fn upsert(&self, room: &Room) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO rooms (room_id, name, rows, cols, capacity, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            ON CONFLICT(room_id) DO UPDATE SET
                name = ?2, rows = ?3, cols = ?4, capacity = ?5, is_active = 1
            "#,
            params![room.room_id, room.name, room.rows, room.cols, room.capacity],
        )?;
        Ok(())
    }

    /// 停用考场
    pub fn deactivate(&self, room_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("UPDATE rooms SET is_active = 0 WHERE room_id = ?1", params![room_id])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Room".to_string(),
                id: room_id.to_string(),
            });
        }
        Ok(())
    }

    /// 按编号查询
    pub fn find_by_id(&self, room_id: &str) -> RepositoryResult<Option<Room>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM rooms WHERE room_id = ?1", ROOM_COLUMNS);
        let room = conn
            .query_row(&sql, params![room_id], Self::map_row)
            .optional()?;
        Ok(room)
    }
}

impl RoomInventory for RoomRepository {
    fn active_rooms(&self) -> RepositoryResult<Vec<Room>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM rooms WHERE is_active = 1 ORDER BY room_id",
            ROOM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rooms = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Room>>>()?;
        Ok(rooms)
    }
}
