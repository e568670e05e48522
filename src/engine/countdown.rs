// ==========================================
// 力量举试举追踪引擎 - 倒计时预测器
// ==========================================
// 职责: 计算目标运动员距上场的剩余把数与预计时间
// 输入: 出场队列 + 台位节奏估计
// 输出: Countdown (剩余把数三态 + ETA + 提醒等级)
// ==========================================
// 规则:
// - attempts_out = 目标试举在已申报队列中的零基位置 (0 = 正在上场)
// - eta = attempts_out × 节奏 (秒/把)
// - 目标未申报 → UNDECLARED; 九把全部完成 → DONE
// - 每次调用基于最新快照同步重算，不含定时器
// ==========================================

use crate::config::engine_config::CountdownConfig;
use crate::domain::lifter::{AttemptSlot, Lifter};
use crate::domain::meet::MeetState;
use crate::domain::types::{AlertLevel, Discipline};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::order_resolver::{OrderResolver, PlatformQueue};
use serde::Serialize;

// ==========================================
// AttemptsOut - 剩余把数三态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptsOut {
    /// 前面还有 n 把
    Out(usize),
    /// 目标试举尚未申报，位置不确定
    Undeclared,
    /// 已完成全部试举
    Done,
}

impl AttemptsOut {
    pub fn count(&self) -> Option<usize> {
        match self {
            AttemptsOut::Out(n) => Some(*n),
            _ => None,
        }
    }
}

// ==========================================
// Countdown - 倒计时结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Countdown {
    pub lifter_id: String,
    pub platform_id: String,
    pub discipline: Option<Discipline>,
    pub attempt_no: Option<u8>,
    pub weight: Option<f64>,
    pub attempts_out: AttemptsOut,
    /// 仅在 attempts_out 为确定数值时给出
    pub eta_seconds: Option<f64>,
    /// 含保守缓冲的 ETA
    pub buffered_eta_seconds: Option<f64>,
    pub pace_seconds: f64,
    pub alert: Option<AlertLevel>,
    /// 目标前一位 / 后一位运动员
    pub previous_lifter_id: Option<String>,
    pub next_lifter_id: Option<String>,
    /// 计算所基于的快照版本
    pub snapshot_version: u64,
}

// ==========================================
// CountdownPredictor - 倒计时预测器
// ==========================================
pub struct CountdownPredictor {
    config: CountdownConfig,
    resolver: OrderResolver,
}

impl CountdownPredictor {
    pub fn new(config: CountdownConfig) -> Self {
        Self {
            config,
            resolver: OrderResolver::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 运动员下一次试举的倒计时 (getCountdown)
    pub fn predict(&self, meet: &MeetState, lifter_id: &str) -> EngineResult<Countdown> {
        let lifter = meet.lifter(lifter_id)?;
        let queue = self.resolver.resolve(meet, &lifter.platform_id);
        Ok(self.predict_next_in_queue(meet, &queue, lifter))
    }

    /// 指定试举的倒计时
    pub fn predict_slot(
        &self,
        meet: &MeetState,
        lifter_id: &str,
        discipline: Discipline,
        attempt_no: u8,
    ) -> EngineResult<Countdown> {
        let lifter = meet.lifter(lifter_id)?;
        let queue = self.resolver.resolve(meet, &lifter.platform_id);
        self.predict_slot_in_queue(meet, &queue, lifter, discipline, attempt_no)
    }

    /// 基于已生成的队列计算指定试举
    pub fn predict_slot_in_queue(
        &self,
        meet: &MeetState,
        queue: &PlatformQueue,
        lifter: &Lifter,
        discipline: Discipline,
        attempt_no: u8,
    ) -> EngineResult<Countdown> {
        let slot = lifter.slot(discipline, attempt_no)?;
        self.predict_in_queue(meet, queue, lifter, slot)
    }

    /// 基于已生成的队列计算 (批量查询时复用队列)
    pub fn predict_next_in_queue(
        &self,
        meet: &MeetState,
        queue: &PlatformQueue,
        lifter: &Lifter,
    ) -> Countdown {
        match lifter.next_pending() {
            Some(slot) => self
                .predict_in_queue(meet, queue, lifter, slot)
                .unwrap_or_else(|e| {
                    tracing::warn!(lifter_id = %lifter.lifter_id, error = %e, "队列与快照不一致，按未申报处理");
                    self.terminal(meet, lifter, Some(slot), AttemptsOut::Undeclared)
                }),
            None => self.terminal(meet, lifter, None, AttemptsOut::Done),
        }
    }

    fn predict_in_queue(
        &self,
        meet: &MeetState,
        queue: &PlatformQueue,
        lifter: &Lifter,
        slot: &AttemptSlot,
    ) -> EngineResult<Countdown> {
        if slot.outcome.is_decided() {
            return Ok(self.terminal(meet, lifter, Some(slot), AttemptsOut::Done));
        }
        if !slot.is_declared() {
            return Ok(self.terminal(meet, lifter, Some(slot), AttemptsOut::Undeclared));
        }

        let position = queue
            .position_of(&lifter.lifter_id, slot.discipline, slot.attempt_no)
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "{} {} 第{}把不在台位 {} 的队列中",
                    lifter.lifter_id, slot.discipline, slot.attempt_no, queue.platform_id
                ))
            })?;

        let pace = meet.pace_seconds(&lifter.platform_id);
        let eta = position as f64 * pace;
        let declared = queue.declared();

        Ok(Countdown {
            lifter_id: lifter.lifter_id.clone(),
            platform_id: lifter.platform_id.clone(),
            discipline: Some(slot.discipline),
            attempt_no: Some(slot.attempt_no),
            weight: slot.requested_weight,
            attempts_out: AttemptsOut::Out(position),
            eta_seconds: Some(eta),
            buffered_eta_seconds: Some(self.buffered(eta)),
            pace_seconds: pace,
            alert: Some(self.alert_level(position)),
            previous_lifter_id: position
                .checked_sub(1)
                .and_then(|i| declared.get(i))
                .map(|e| e.lifter_id.clone()),
            next_lifter_id: declared.get(position + 1).map(|e| e.lifter_id.clone()),
            snapshot_version: meet.version(),
        })
    }

    // ==========================================
    // 提醒与缓冲
    // ==========================================

    /// 按剩余把数判定提醒等级
    ///
    /// # 规则 (默认阈值)
    /// - 0 → ON_PLATFORM
    /// - ≤3 → FINAL_CALL
    /// - ≤5 → CRITICAL_WINDOW
    /// - ≤10 → BEGIN_BAR_WORK
    /// - ≤15 → PREP_WINDOW
    /// - 其余 → CRUISE
    pub fn alert_level(&self, attempts_out: usize) -> AlertLevel {
        let n = attempts_out as u64;
        if n == 0 {
            AlertLevel::OnPlatform
        } else if n <= self.config.final_call_attempts as u64 {
            AlertLevel::FinalCall
        } else if n <= self.config.critical_attempts as u64 {
            AlertLevel::CriticalWindow
        } else if n <= self.config.bar_work_attempts as u64 {
            AlertLevel::BeginBarWork
        } else if n <= self.config.prep_attempts as u64 {
            AlertLevel::PrepWindow
        } else {
            AlertLevel::Cruise
        }
    }

    fn buffered(&self, eta_seconds: f64) -> f64 {
        eta_seconds * (1.0 + self.config.eta_buffer_percent.max(0.0) / 100.0)
    }

    fn terminal(
        &self,
        meet: &MeetState,
        lifter: &Lifter,
        slot: Option<&AttemptSlot>,
        attempts_out: AttemptsOut,
    ) -> Countdown {
        Countdown {
            lifter_id: lifter.lifter_id.clone(),
            platform_id: lifter.platform_id.clone(),
            discipline: slot.map(|s| s.discipline),
            attempt_no: slot.map(|s| s.attempt_no),
            weight: slot.and_then(|s| s.requested_weight),
            attempts_out,
            eta_seconds: None,
            buffered_eta_seconds: None,
            pace_seconds: meet.pace_seconds(&lifter.platform_id),
            alert: None,
            previous_lifter_id: None,
            next_lifter_id: None,
            snapshot_version: meet.version(),
        }
    }
}

impl Default for CountdownPredictor {
    fn default() -> Self {
        Self::new(CountdownConfig::default())
    }
}
