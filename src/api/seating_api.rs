// ==========================================
// 考场编排系统 - 座位编排 API
// ==========================================
// 职责: 生成/清除/审计/统计场次座位编排
// 并发: 同一场次串行（场次锁），不同场次可并行
// 持久化: 先清除后写入在同一事务内完成
// ==========================================

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::parse_session_key;
use crate::api::session_lock::SessionLockRegistry;
use crate::config::ConfigManager;
use crate::domain::candidate::Candidate;
use crate::domain::conflict::ConflictRecord;
use crate::domain::seating::{ArrangementStatistics, SeatAssignment};
use crate::domain::session::SessionKey;
use crate::engine::cancel::CancellationToken;
use crate::engine::conflict_policy::ConflictPolicy;
use crate::engine::seat_allocator::{CapacityShortfall, SeatAllocator};
use crate::engine::seat_label::{format_seat_label, SeatLabelScheme};
use crate::engine::strategy::{ArrangementOrder, RoomStrategy};
use crate::engine::{prioritize_rooms, ArrangementValidator};
use crate::repository::roster::{RoomInventory, RosterResolver};
use crate::repository::seating_repo::SeatingRepository;

// ==========================================
// 请求 / 响应
// ==========================================

/// 生成编排请求
///
/// 策略字段为 None 时取配置默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub exam_date: String,    // YYYY-MM-DD
    pub session_time: String, // HH:MM
    pub arrangement_type: Option<String>,
    pub conflict_policy: Option<String>,
    pub room_strategy: Option<String>,
    pub preserve_existing: bool,
    pub seed: Option<u64>,
}

impl GenerateRequest {
    pub fn new(exam_date: impl Into<String>, session_time: impl Into<String>) -> Self {
        Self {
            exam_date: exam_date.into(),
            session_time: session_time.into(),
            ..Default::default()
        }
    }
}

/// 生成编排结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSummary {
    /// 本次编排批次；容量不足直接拒绝时为 None（未写库）
    pub arrangement_id: Option<String>,
    pub session_key: SessionKey,
    pub placed_count: usize,
    pub unplaced_count: usize,
    pub rooms_used: usize,
    pub conflicts_resolved: usize,
    pub unplaced: Vec<Candidate>,
    pub seed: u64,
    pub capacity_shortfall: Option<CapacityShortfall>,
}

impl GenerateSummary {
    pub fn is_complete(&self) -> bool {
        self.unplaced_count == 0 && self.capacity_shortfall.is_none()
    }
}

// ==========================================
// SeatingApi - 座位编排 API
// ==========================================
pub struct SeatingApi {
    roster: Arc<dyn RosterResolver>,
    room_inventory: Arc<dyn RoomInventory>,
    seating_repo: Arc<SeatingRepository>,
    config_manager: Arc<ConfigManager>,
    session_locks: Arc<SessionLockRegistry>,
    validator: ArrangementValidator,
}

impl SeatingApi {
    /// 创建新的SeatingApi实例
    pub fn new(
        roster: Arc<dyn RosterResolver>,
        room_inventory: Arc<dyn RoomInventory>,
        seating_repo: Arc<SeatingRepository>,
        config_manager: Arc<ConfigManager>,
        session_locks: Arc<SessionLockRegistry>,
    ) -> Self {
        Self {
            roster,
            room_inventory,
            seating_repo,
            config_manager,
            session_locks,
            validator: ArrangementValidator::new(),
        }
    }

    // ==========================================
    // 编排
    // ==========================================

    /// 生成场次座位编排
    ///
    /// # 返回
    /// - Ok(GenerateSummary): 含未安排考生（部分安排不是错误）
    /// - Err(SessionBusy): 同一场次已有编排在进行
    /// - Err(ValidationError): 日期/时间/策略/考场参数不合法
    pub fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateSummary> {
        self.generate_with_cancel(request, None)
    }

    /// 生成场次座位编排（可取消）
    ///
    /// 取消后不写库，原编排保持不变
    pub fn generate_with_cancel(
        &self,
        request: &GenerateRequest,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<GenerateSummary> {
        let session_key = parse_session_key(&request.exam_date, &request.session_time)?;
        let policy = self.resolve_policy(request.conflict_policy.as_deref())?;
        let order = self.resolve_order(request.arrangement_type.as_deref())?;
        let room_strategy = self.resolve_room_strategy(request.room_strategy.as_deref())?;
        let label_scheme = self
            .config_manager
            .get_seat_label_scheme()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let minimal_limit = self
            .config_manager
            .get_minimal_room_limit()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let fast_fail = self
            .config_manager
            .get_capacity_fast_fail()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let _guard = self.session_locks.try_acquire(session_key)?;

        // 1. 读取考生与考场
        let mut candidates = self.roster.candidates_for_session(&session_key)?;
        let mut rooms = self.room_inventory.active_rooms()?;
        SeatAllocator::validate_rooms(&rooms)?;

        if request.preserve_existing {
            let occupied = self.seating_repo.occupied_room_ids(&session_key)?;
            let seated = self.seating_repo.seated_candidate_ids(&session_key)?;
            rooms.retain(|r| !occupied.contains(&r.room_id));
            candidates.retain(|c| !seated.contains(&c.id));
            info!(
                session = %session_key,
                skipped_rooms = occupied.len(),
                skipped_candidates = seated.len(),
                "保留已有编排，仅安排剩余考生"
            );
        }

        let rooms = prioritize_rooms(&rooms, room_strategy, minimal_limit);
        let seed = request.seed.unwrap_or_else(|| rand::rng().random());

        // 2. 容量预检（配置开启时直接拒绝）
        if fast_fail {
            if let Some(shortfall) = SeatAllocator::check_capacity(candidates.len(), &rooms) {
                warn!(
                    session = %session_key,
                    required = shortfall.required,
                    available = shortfall.available,
                    "考场容量不足，未执行编排"
                );
                return Ok(GenerateSummary {
                    arrangement_id: None,
                    session_key,
                    placed_count: 0,
                    unplaced_count: candidates.len(),
                    rooms_used: 0,
                    conflicts_resolved: 0,
                    unplaced: candidates,
                    seed,
                    capacity_shortfall: Some(shortfall),
                });
            }
        }

        // 3. 落座
        let allocator = SeatAllocator::new(label_scheme);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut outcome = allocator.allocate(
            &candidates,
            &rooms,
            policy,
            order,
            session_key,
            &mut rng,
            cancel,
        )?;

        if outcome.cancelled {
            return Err(ApiError::Cancelled(format!(
                "场次 {} 编排已取消，原编排保持不变",
                session_key
            )));
        }

        // 4. 写库（事务内先清除后写入）
        let arrangement_id = uuid::Uuid::new_v4().to_string();
        for seat in outcome.placed.iter_mut() {
            seat.arrangement_id = Some(arrangement_id.clone());
        }
        let (deactivated, inserted) =
            self.seating_repo
                .replace_session(&session_key, &outcome.placed, request.preserve_existing)?;

        info!(
            session = %session_key,
            arrangement_id = %arrangement_id,
            seed,
            deactivated,
            inserted,
            unplaced = outcome.unplaced.len(),
            "座位编排已写入"
        );

        Ok(GenerateSummary {
            arrangement_id: Some(arrangement_id),
            session_key,
            placed_count: outcome.placed_count(),
            unplaced_count: outcome.unplaced_count(),
            rooms_used: outcome.rooms_used,
            conflicts_resolved: outcome.conflicts_resolved,
            unplaced: outcome.unplaced,
            seed,
            capacity_shortfall: None,
        })
    }

    /// 清除场次编排（软删除）
    ///
    /// # 返回
    /// - Ok(usize): 失效的座位数
    pub fn clear(&self, exam_date: &str, session_time: &str) -> ApiResult<usize> {
        let session_key = parse_session_key(exam_date, session_time)?;
        let _guard = self.session_locks.try_acquire(session_key)?;
        let n = self.seating_repo.deactivate_session(&session_key)?;
        info!(session = %session_key, deactivated = n, "场次编排已清除");
        Ok(n)
    }

    // ==========================================
    // 查询 / 审计
    // ==========================================

    /// 查询场次当前生效的座位
    pub fn list_seats(&self, exam_date: &str, session_time: &str) -> ApiResult<Vec<SeatAssignment>> {
        let session_key = parse_session_key(exam_date, session_time)?;
        Ok(self.seating_repo.find_active_by_session(&session_key)?)
    }

    /// 审计场次编排中的相邻冲突
    ///
    /// # 返回
    /// - Ok(Vec<ConflictRecord>): 每对相邻冲突只报告一次
    pub fn validate(&self, exam_date: &str, session_time: &str) -> ApiResult<Vec<ConflictRecord>> {
        let session_key = parse_session_key(exam_date, session_time)?;
        let seats = self.seating_repo.find_seated_candidates(&session_key)?;
        let conflicts = self.validator.validate(&seats);
        if !conflicts.is_empty() {
            warn!(session = %session_key, conflicts = conflicts.len(), "编排审计发现相邻冲突");
        }
        Ok(conflicts)
    }

    /// 场次编排统计
    pub fn statistics(&self, exam_date: &str, session_time: &str) -> ApiResult<ArrangementStatistics> {
        let session_key = parse_session_key(exam_date, session_time)?;
        let rooms = self.seating_repo.room_occupancy(&session_key)?;
        Ok(ArrangementStatistics::from_rooms(session_key, rooms))
    }

    /// 计算座位号
    ///
    /// # 参数
    /// - scheme: None 时取配置的座位号格式
    pub fn format_seat_label(
        &self,
        room_id: &str,
        row: u32,
        col: u32,
        scheme: Option<&str>,
        cols: u32,
    ) -> ApiResult<String> {
        let scheme = match scheme {
            Some(s) => s.parse::<SeatLabelScheme>()?,
            None => self
                .config_manager
                .get_seat_label_scheme()
                .map_err(|e| ApiError::InternalError(e.to_string()))?,
        };
        Ok(format_seat_label(room_id, row, col, scheme, cols)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn resolve_policy(&self, raw: Option<&str>) -> ApiResult<ConflictPolicy> {
        match raw {
            Some(s) => Ok(s.parse::<ConflictPolicy>()?),
            None => self
                .config_manager
                .get_default_conflict_policy()
                .map_err(|e| ApiError::InternalError(e.to_string())),
        }
    }

    fn resolve_order(&self, raw: Option<&str>) -> ApiResult<ArrangementOrder> {
        match raw {
            Some(s) => Ok(s.parse::<ArrangementOrder>()?),
            None => self
                .config_manager
                .get_default_arrangement_type()
                .map_err(|e| ApiError::InternalError(e.to_string())),
        }
    }

    fn resolve_room_strategy(&self, raw: Option<&str>) -> ApiResult<RoomStrategy> {
        match raw {
            Some(s) => Ok(s.parse::<RoomStrategy>()?),
            None => self
                .config_manager
                .get_default_room_strategy()
                .map_err(|e| ApiError::InternalError(e.to_string())),
        }
    }
}
