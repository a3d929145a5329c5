// ==========================================
// 考场编排系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::invigilator::DEFAULT_MAX_ASSIGNMENTS;
use crate::engine::conflict_policy::ConflictPolicy;
use crate::engine::seat_label::SeatLabelScheme;
use crate::engine::strategy::{ArrangementOrder, RoomStrategy};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 默认场次时长（分钟）
pub const DEFAULT_SESSION_MINUTES: i64 = 180;

/// Minimal 考场策略默认最多使用的考场数
pub const DEFAULT_MINIMAL_ROOM_LIMIT: usize = 5;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// 未显式配置的键以默认值补齐，便于记录一次编排所用的完整口径
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let mut config_map: BTreeMap<String, String> = config_keys::DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        {
            let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            let mut stmt =
                conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

            for row in rows {
                let (key, value) = row?;
                config_map.insert(key, value);
            }
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 座位编排配置 =====

    /// 默认相邻冲突策略（未知值报错，不静默回退）
    pub fn get_default_conflict_policy(&self) -> Result<ConflictPolicy, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_CONFLICT_POLICY, "strict")?;
        Ok(value.parse::<ConflictPolicy>()?)
    }

    /// 默认考生排列方式
    pub fn get_default_arrangement_type(&self) -> Result<ArrangementOrder, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_ARRANGEMENT_TYPE, "mixed")?;
        Ok(value.parse::<ArrangementOrder>()?)
    }

    /// 默认考场使用策略
    pub fn get_default_room_strategy(&self) -> Result<RoomStrategy, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_ROOM_STRATEGY, "optimal")?;
        Ok(value.parse::<RoomStrategy>()?)
    }

    /// 座位号格式
    pub fn get_seat_label_scheme(&self) -> Result<SeatLabelScheme, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SEAT_LABEL_SCHEME, "sequential")?;
        Ok(value.parse::<SeatLabelScheme>()?)
    }

    /// Minimal 策略最多使用的考场数（至少 1）
    pub fn get_minimal_room_limit(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MINIMAL_ROOM_LIMIT, "5")?;
        Ok(value
            .trim()
            .parse::<usize>()
            .unwrap_or(DEFAULT_MINIMAL_ROOM_LIMIT)
            .max(1))
    }

    /// 容量不足时是否直接拒绝编排
    pub fn get_capacity_fast_fail(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::CAPACITY_FAST_FAIL, "false")?;
        Ok(matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
    }

    /// 场次默认时长（分钟），exams 表缺少结束时间时使用
    pub fn get_default_session_minutes(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_SESSION_MINUTES, "180")?;
        let minutes = value.trim().parse::<i64>().unwrap_or(DEFAULT_SESSION_MINUTES);
        Ok(if minutes > 0 { minutes } else { DEFAULT_SESSION_MINUTES })
    }

    // ===== 监考配置 =====

    /// 新增监考员的默认单日上限
    pub fn get_default_max_assignments(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_MAX_ASSIGNMENTS, "2")?;
        Ok(value.trim().parse::<u32>().unwrap_or(DEFAULT_MAX_ASSIGNMENTS))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 座位编排
    pub const DEFAULT_CONFLICT_POLICY: &str = "seating.default_conflict_policy";
    pub const DEFAULT_ARRANGEMENT_TYPE: &str = "seating.default_arrangement_type";
    pub const DEFAULT_ROOM_STRATEGY: &str = "seating.default_room_strategy";
    pub const SEAT_LABEL_SCHEME: &str = "seating.seat_label_scheme";
    pub const MINIMAL_ROOM_LIMIT: &str = "seating.minimal_room_limit";
    pub const CAPACITY_FAST_FAIL: &str = "seating.capacity_fast_fail";
    pub const DEFAULT_SESSION_MINUTES: &str = "seating.default_session_minutes";

    // 监考
    pub const DEFAULT_MAX_ASSIGNMENTS: &str = "invigilation.default_max_assignments";

    /// 默认值表（快照补齐用）
    pub const DEFAULTS: &[(&str, &str)] = &[
        (DEFAULT_CONFLICT_POLICY, "strict"),
        (DEFAULT_ARRANGEMENT_TYPE, "mixed"),
        (DEFAULT_ROOM_STRATEGY, "optimal"),
        (SEAT_LABEL_SCHEME, "sequential"),
        (MINIMAL_ROOM_LIMIT, "5"),
        (CAPACITY_FAST_FAIL, "false"),
        (DEFAULT_SESSION_MINUTES, "180"),
        (DEFAULT_MAX_ASSIGNMENTS, "2"),
    ];
}
