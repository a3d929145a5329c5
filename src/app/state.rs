// ==========================================
// 考场编排系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 全部仓储共享同一连接（Arc<Mutex<Connection>>）
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{InvigilatorApi, SeatingApi, SessionLockRegistry};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{
    CandidateRepository, InvigilatorRepository, RoomInventory, RoomRepository, RosterResolver,
    SeatingRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 座位编排API
    pub seating_api: Arc<SeatingApi>,

    /// 监考分配API
    pub invigilator_api: Arc<InvigilatorApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 考生名单仓储（基础数据写入）
    pub candidate_repo: Arc<CandidateRepository>,

    /// 考场仓储（基础数据写入）
    pub room_repo: Arc<RoomRepository>,

    /// 场次锁（编排与监考共用）
    pub session_locks: Arc<SessionLockRegistry>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)))?;
        state.db_path = db_path;
        Ok(state)
    }

    /// 从已有连接创建（测试与嵌入式宿主使用）
    ///
    /// 调用方负责建表
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let candidate_repo = Arc::new(CandidateRepository::new(conn.clone()));
        let room_repo = Arc::new(RoomRepository::new(conn.clone()));
        let seating_repo = Arc::new(SeatingRepository::new(conn.clone()));
        let invigilator_repo = Arc::new(InvigilatorRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let session_locks = Arc::new(SessionLockRegistry::new());

        let roster: Arc<dyn RosterResolver> = candidate_repo.clone();
        let room_inventory: Arc<dyn RoomInventory> = room_repo.clone();

        // ==========================================
        // 初始化API层
        // ==========================================
        let seating_api = Arc::new(SeatingApi::new(
            roster.clone(),
            room_inventory,
            seating_repo.clone(),
            config_manager.clone(),
            session_locks.clone(),
        ));

        let invigilator_api = Arc::new(InvigilatorApi::new(
            roster,
            seating_repo,
            invigilator_repo,
            config_manager.clone(),
            session_locks.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path: String::from(":memory:"),
            seating_api,
            invigilator_api,
            config_manager,
            candidate_repo,
            room_repo,
            session_locks,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级：
/// 1. 环境变量 EXAM_SEATING_DB_PATH
/// 2. 用户数据目录下 exam-seating/exam_seating.db
/// 3. 当前目录 ./exam_seating.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("EXAM_SEATING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./exam_seating.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("exam-seating");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("exam_seating.db");
        }
    }

    path.to_string_lossy().to_string()
}
