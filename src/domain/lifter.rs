// ==========================================
// 力量举试举追踪引擎 - 运动员与试举位
// ==========================================
// 职责: 运动员身份信息 + 三个项目共九次试举
// 红线: 试举位从 PENDING 只能判定一次，不可重开
// ==========================================

use crate::domain::types::{Discipline, Outcome, RefereeVotes};
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// 每个项目的试举次数
pub const ATTEMPTS_PER_DISCIPLINE: u8 = 3;

// ==========================================
// AttemptSlot - 单次试举
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSlot {
    pub discipline: Discipline,
    pub attempt_no: u8,                  // 1-3
    pub requested_weight: Option<f64>,   // None = 尚未申报
    pub outcome: Outcome,
    pub votes: RefereeVotes,
}

impl AttemptSlot {
    pub fn new(discipline: Discipline, attempt_no: u8) -> Self {
        Self {
            discipline,
            attempt_no,
            requested_weight: None,
            outcome: Outcome::Pending,
            votes: RefereeVotes::default(),
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.outcome.is_decided()
    }

    pub fn is_declared(&self) -> bool {
        self.requested_weight.is_some()
    }
}

// ==========================================
// Lifter - 运动员
// ==========================================
/// 身份字段在比赛中不变；rack_id / 台位 / 组别可由裁判长调整
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lifter {
    pub lifter_id: String,
    pub name: String,
    pub division: Option<String>,      // 性别/组别
    pub bodyweight_kg: Option<f64>,
    pub platform_id: String,
    pub flight_id: String,
    pub lot_no: u32,                   // 抽签号 (同重量时的出场顺序)
    pub rack_id: Option<String>,
    attempts: Vec<AttemptSlot>,        // 固定 9 个: 深蹲1-3, 卧推1-3, 硬拉1-3
}

impl Lifter {
    /// 创建运动员，九个试举位全部为待申报
    pub fn new(
        lifter_id: impl Into<String>,
        name: impl Into<String>,
        platform_id: impl Into<String>,
        flight_id: impl Into<String>,
        lot_no: u32,
    ) -> Self {
        let attempts = Discipline::ALL
            .iter()
            .flat_map(|d| (1..=ATTEMPTS_PER_DISCIPLINE).map(move |n| AttemptSlot::new(*d, n)))
            .collect();

        Self {
            lifter_id: lifter_id.into(),
            name: name.into(),
            division: None,
            bodyweight_kg: None,
            platform_id: platform_id.into(),
            flight_id: flight_id.into(),
            lot_no,
            rack_id: None,
            attempts,
        }
    }

    pub fn with_rack(mut self, rack_id: impl Into<String>) -> Self {
        self.rack_id = Some(rack_id.into());
        self
    }

    pub fn with_division(mut self, division: impl Into<String>) -> Self {
        self.division = Some(division.into());
        self
    }

    pub fn with_bodyweight(mut self, bodyweight_kg: f64) -> Self {
        self.bodyweight_kg = Some(bodyweight_kg);
        self
    }

    // ==========================================
    // 试举位访问
    // ==========================================

    /// 全部九个试举位（按项目、序号排列）
    pub fn attempts(&self) -> &[AttemptSlot] {
        &self.attempts
    }

    /// 某个项目的三个试举位
    pub fn discipline_slots(&self, discipline: Discipline) -> &[AttemptSlot] {
        let offset = discipline.slot_offset();
        &self.attempts[offset..offset + ATTEMPTS_PER_DISCIPLINE as usize]
    }

    pub fn slot(&self, discipline: Discipline, attempt_no: u8) -> EngineResult<&AttemptSlot> {
        let idx = Self::slot_index(discipline, attempt_no)?;
        Ok(&self.attempts[idx])
    }

    pub(crate) fn slot_mut(
        &mut self,
        discipline: Discipline,
        attempt_no: u8,
    ) -> EngineResult<&mut AttemptSlot> {
        let idx = Self::slot_index(discipline, attempt_no)?;
        Ok(&mut self.attempts[idx])
    }

    fn slot_index(discipline: Discipline, attempt_no: u8) -> EngineResult<usize> {
        if !(1..=ATTEMPTS_PER_DISCIPLINE).contains(&attempt_no) {
            return Err(EngineError::InvalidAttemptNumber(attempt_no));
        }
        Ok(discipline.slot_offset() + (attempt_no - 1) as usize)
    }

    /// 下一个待判定的试举位（按比赛顺序）
    pub fn next_pending(&self) -> Option<&AttemptSlot> {
        self.attempts.iter().find(|s| s.is_pending())
    }

    /// 九次试举是否全部判定
    pub fn is_done(&self) -> bool {
        self.attempts.iter().all(|s| !s.is_pending())
    }

    /// 某项目最佳成功重量
    pub fn best_good(&self, discipline: Discipline) -> Option<f64> {
        self.discipline_slots(discipline)
            .iter()
            .filter(|s| s.outcome == Outcome::Good)
            .filter_map(|s| s.requested_weight)
            .fold(None, |best, w| Some(best.map_or(w, |b: f64| b.max(w))))
    }

    /// 开把重量 (第一把申报重量)
    pub fn opener(&self, discipline: Discipline) -> Option<f64> {
        self.discipline_slots(discipline)
            .first()
            .and_then(|s| s.requested_weight)
    }
}
