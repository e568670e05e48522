// ==========================================
// 力量举试举追踪引擎 - 比赛查询 API
// ==========================================
// 职责: 面向看板/热身区面板的派生视图查询
// 输入: SnapshotStore 中的最新一致快照
// 输出: 出场队列 / 倒计时 / 热身批次 / 配片 / 热身阶梯
// ==========================================
// 说明:
// - 每次查询开始时取一次快照，计算全程基于该快照
// - 出场队列按台位修订号缓存，修订号变化即重算
// ==========================================

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::config::engine_config::EngineConfig;
use crate::domain::meet::MeetState;
use crate::domain::types::{Discipline, WeightUnit};
use crate::engine::countdown::{Countdown, CountdownPredictor};
use crate::engine::order_resolver::{OrderResolver, PlatformQueue, QueueEntry};
use crate::engine::plate::{self, Bar, Plate, PlateDecomposer, PlateLoad};
use crate::engine::rack_planner::{RackGroup, RackPlanner, Wave};
use crate::engine::warmup::{warmup_for_countdown, WarmupStep};
use crate::services::SnapshotStore;

// platform_id -> (revision, queue)
type QueueCache = HashMap<String, (u64, Arc<PlatformQueue>)>;

/// 器材库 (按配置单位)
#[derive(Debug, Clone, Serialize)]
pub struct PlateLibrary {
    pub unit: WeightUnit,
    pub plates: Vec<Plate>,
    pub bars: Vec<Bar>,
    pub collars: Vec<f64>,
}

/// 运动员热身计划
#[derive(Debug, Clone, Serialize)]
pub struct WarmupPlan {
    pub countdown: Countdown,
    pub steps: Vec<WarmupStep>,
}

// ==========================================
// MeetApi - 比赛查询 API
// ==========================================
pub struct MeetApi {
    store: Arc<SnapshotStore>,
    config: EngineConfig,
    resolver: OrderResolver,
    predictor: CountdownPredictor,
    planner: RackPlanner,
    decomposer: PlateDecomposer,
    queue_cache: Mutex<QueueCache>,
}

impl MeetApi {
    pub fn new(store: Arc<SnapshotStore>, config: EngineConfig) -> Self {
        Self {
            store,
            predictor: CountdownPredictor::new(config.countdown.clone()),
            planner: RackPlanner::new(config.rack.clone()),
            decomposer: PlateDecomposer::new(config.plates.clone()),
            resolver: OrderResolver::new(),
            config,
            queue_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 当前快照 (调用方自行组合查询时使用)
    pub fn snapshot(&self) -> Arc<MeetState> {
        self.store.snapshot()
    }

    // ==========================================
    // 出场队列
    // ==========================================

    /// 台位出场队列 (getPlatformQueue)
    ///
    /// # 返回
    /// - 已申报在前、未申报在后的待判定试举；全部完成时为空队列
    /// - 台位从未出现过时返回 NotFound
    pub fn get_platform_queue(&self, platform_id: &str) -> ApiResult<Arc<PlatformQueue>> {
        let meet = self.store.snapshot();
        self.queue_for(&meet, platform_id)
    }

    /// 台位当前试举
    pub fn get_current_attempt(&self, platform_id: &str) -> ApiResult<Option<QueueEntry>> {
        Ok(self.get_platform_queue(platform_id)?.current().cloned())
    }

    /// 全部台位出场队列 (按台位编号)
    pub fn get_all_platform_queues(&self) -> ApiResult<BTreeMap<String, PlatformQueue>> {
        let meet = self.store.snapshot();
        let mut queues = BTreeMap::new();
        for platform_id in meet.platforms() {
            let queue = self.queue_for(&meet, &platform_id)?;
            queues.insert(platform_id, queue.as_ref().clone());
        }
        Ok(queues)
    }

    fn cache_lock(&self) -> ApiResult<MutexGuard<'_, QueueCache>> {
        self.queue_cache
            .lock()
            .map_err(|e| ApiError::InternalError(format!("锁获取失败: {}", e)))
    }

    fn queue_for(&self, meet: &MeetState, platform_id: &str) -> ApiResult<Arc<PlatformQueue>> {
        let revision = meet.platform_revision(platform_id);
        if revision == 0 {
            return Err(ApiError::NotFound(format!("台位(id={})不存在", platform_id)));
        }

        if let Some((cached_revision, queue)) = self.cache_lock()?.get(platform_id) {
            if *cached_revision == revision {
                return Ok(Arc::clone(queue));
            }
        }

        // 排序在锁外进行，其他台位的读者不必等待
        let queue = Arc::new(self.resolver.resolve(meet, platform_id));

        let mut cache = self.cache_lock()?;
        if let Some((cached_revision, cached)) = cache.get(platform_id) {
            // 并发读者已写入同一或更新的修订号
            if *cached_revision == revision {
                return Ok(Arc::clone(cached));
            }
            if *cached_revision > revision {
                return Ok(queue);
            }
        }
        cache.insert(platform_id.to_string(), (revision, Arc::clone(&queue)));
        Ok(queue)
    }

    // ==========================================
    // 倒计时
    // ==========================================

    /// 运动员下一次试举的倒计时 (getCountdown)
    pub fn get_countdown(&self, lifter_id: &str) -> ApiResult<Countdown> {
        let meet = self.store.snapshot();
        let lifter = meet.lifter(lifter_id)?;
        let queue = self.queue_for(&meet, &lifter.platform_id)?;
        Ok(self.predictor.predict_next_in_queue(&meet, &queue, lifter))
    }

    /// 指定试举的倒计时
    pub fn get_slot_countdown(
        &self,
        lifter_id: &str,
        discipline: Discipline,
        attempt_no: u8,
    ) -> ApiResult<Countdown> {
        let meet = self.store.snapshot();
        let lifter = meet.lifter(lifter_id)?;
        let queue = self.queue_for(&meet, &lifter.platform_id)?;
        Ok(self
            .predictor
            .predict_slot_in_queue(&meet, &queue, lifter, discipline, attempt_no)?)
    }

    /// 全部运动员的倒计时 (按运动员编号)
    pub fn get_all_countdowns(&self) -> ApiResult<Vec<Countdown>> {
        let meet = self.store.snapshot();
        let mut countdowns = Vec::new();
        for lifter in meet.lifters() {
            let queue = self.queue_for(&meet, &lifter.platform_id)?;
            countdowns.push(self.predictor.predict_next_in_queue(&meet, &queue, lifter));
        }
        Ok(countdowns)
    }

    // ==========================================
    // 热身架
    // ==========================================

    /// 热身架使用计划 (getWave)
    ///
    /// 无成员或无人有已申报下一把时返回空计划
    pub fn get_wave(&self, rack_id: &str) -> ApiResult<Wave> {
        if rack_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("rack_id 不能为空".to_string()));
        }
        let meet = self.store.snapshot();
        Ok(self.planner.plan(&meet, rack_id))
    }

    pub fn get_all_waves(&self) -> Vec<Wave> {
        self.planner.plan_all(&self.store.snapshot())
    }

    pub fn get_rack_groups(&self) -> Vec<RackGroup> {
        self.planner.rack_groups(&self.store.snapshot())
    }

    // ==========================================
    // 配片与热身
    // ==========================================

    /// 配片 (decomposePlate)
    pub fn decompose_plate(
        &self,
        target_weight: f64,
        bar_weight: f64,
        collar_weight: f64,
    ) -> ApiResult<PlateLoad> {
        Ok(self
            .decomposer
            .decompose(target_weight, bar_weight, collar_weight)?)
    }

    /// 使用配置的默认杆与卡扣配片
    pub fn decompose_plate_default(&self, target_weight: f64) -> ApiResult<PlateLoad> {
        Ok(self.decomposer.decompose_default(target_weight)?)
    }

    pub fn plate_library(&self) -> PlateLibrary {
        let unit = self.decomposer.unit();
        PlateLibrary {
            unit,
            plates: plate::standard_plates(unit).to_vec(),
            bars: plate::bar_options(unit).to_vec(),
            collars: plate::collar_options(unit),
        }
    }

    /// 运动员当前项目的热身阶梯 (基于保守 ETA)
    pub fn get_warmup_plan(&self, lifter_id: &str) -> ApiResult<WarmupPlan> {
        let meet = self.store.snapshot();
        let lifter = meet.lifter(lifter_id)?;
        let queue = self.queue_for(&meet, &lifter.platform_id)?;
        let countdown = self.predictor.predict_next_in_queue(&meet, &queue, lifter);
        let steps = warmup_for_countdown(lifter, &countdown, self.decomposer.unit());
        Ok(WarmupPlan { countdown, steps })
    }
}
