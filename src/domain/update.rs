// ==========================================
// 力量举试举追踪引擎 - 数据源更新记录
// ==========================================
// 职责: 外部实时数据源归一化后的单条试举更新，以及原子应用逻辑
// 红线: 序号不大于已应用序号的更新直接丢弃 (计数，不报错)
// 红线: 单条更新要么全部生效，要么完全不生效
// ==========================================

use crate::domain::lifter::Lifter;
use crate::domain::meet::MeetState;
use crate::domain::types::{Discipline, Outcome, RefereeVotes};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// AttemptUpdate - 归一化试举更新
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptUpdate {
    /// 单调递增的更新序号
    pub seq: u64,
    pub lifter_id: String,
    pub discipline: Discipline,
    pub attempt_no: u8,
    #[serde(default)]
    pub declared_weight: Option<f64>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub referee_votes: Option<RefereeVotes>,
    pub platform_id: String,
    pub flight_id: String,
    /// 热身架归属
    /// - 缺省/null: 未携带，保持裁判台现有分配
    /// - 空字符串: 清除共用架
    #[serde(default)]
    pub rack_id: Option<String>,

    // 以下字段仅在首次出现该运动员时用于登记
    #[serde(default)]
    pub lifter_name: Option<String>,
    #[serde(default)]
    pub lot_no: Option<u32>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub bodyweight_kg: Option<f64>,

    /// 判定发生时间 (用于节奏估计)
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl AttemptUpdate {
    /// 仅包含必填字段的更新
    pub fn new(
        seq: u64,
        lifter_id: impl Into<String>,
        discipline: Discipline,
        attempt_no: u8,
        platform_id: impl Into<String>,
        flight_id: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            lifter_id: lifter_id.into(),
            discipline,
            attempt_no,
            declared_weight: None,
            outcome: None,
            referee_votes: None,
            platform_id: platform_id.into(),
            flight_id: flight_id.into(),
            rack_id: None,
            lifter_name: None,
            lot_no: None,
            division: None,
            bodyweight_kg: None,
            observed_at: None,
        }
    }

    pub fn declare(mut self, weight: f64) -> Self {
        self.declared_weight = Some(weight);
        self
    }

    pub fn decide(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn votes(mut self, votes: RefereeVotes) -> Self {
        self.referee_votes = Some(votes);
        self
    }

    pub fn rack(mut self, rack_id: impl Into<String>) -> Self {
        self.rack_id = Some(rack_id.into());
        self
    }

    /// 显式清除热身架
    pub fn clear_rack(mut self) -> Self {
        self.rack_id = Some(String::new());
        self
    }

    pub fn lot(mut self, lot_no: u32) -> Self {
        self.lot_no = Some(lot_no);
        self
    }

    pub fn at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = Some(observed_at);
        self
    }

    /// 热身架变更: None = 未携带，Some(None) = 清除，Some(Some(id)) = 设定
    pub fn rack_change(&self) -> Option<Option<String>> {
        self.rack_id.as_ref().map(|id| {
            if id.trim().is_empty() {
                None
            } else {
                Some(id.clone())
            }
        })
    }

    /// 实际生效的判定结果: 显式结果优先，否则取裁判灯多数
    fn effective_outcome(&self) -> Option<Outcome> {
        match self.outcome {
            Some(Outcome::Pending) | None => self.referee_votes.and_then(|v| v.majority()),
            Some(outcome) => Some(outcome),
        }
    }
}

// ==========================================
// 应用结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyOutcome {
    /// 已应用，快照发生变化
    Applied,
    /// 已应用，但内容与当前快照一致
    Unchanged,
    /// 序号过期或重复，已丢弃
    Stale,
}

impl MeetState {
    /// 原子应用一条数据源更新
    ///
    /// # 流程
    /// 1. 过期序号 → Stale
    /// 2. 在副本上依次执行: 登记 → 台位/组别 → 热身架 → 申报 → 判定
    /// 3. 全部成功后替换当前快照；任一步失败则快照保持不变
    pub fn apply_update(&mut self, update: &AttemptUpdate) -> EngineResult<ApplyOutcome> {
        if update.seq <= self.last_applied_seq() {
            tracing::debug!(
                seq = update.seq,
                last_applied = self.last_applied_seq(),
                "丢弃过期更新"
            );
            return Ok(ApplyOutcome::Stale);
        }

        let mut next = self.clone();
        next.apply_steps(update)?;
        next.set_last_applied_seq(update.seq);

        let outcome = if next.version() == self.version() {
            ApplyOutcome::Unchanged
        } else {
            ApplyOutcome::Applied
        };
        *self = next;
        Ok(outcome)
    }

    fn apply_steps(&mut self, update: &AttemptUpdate) -> EngineResult<()> {
        let lifter_id = update.lifter_id.as_str();

        // 1. 首次出现的运动员
        if !self.contains_lifter(lifter_id) {
            let lot_no = update
                .lot_no
                .unwrap_or_else(|| self.lifters_on_platform(&update.platform_id).count() as u32 + 1);
            let mut lifter = Lifter::new(
                lifter_id,
                update.lifter_name.clone().unwrap_or_else(|| lifter_id.to_string()),
                update.platform_id.clone(),
                update.flight_id.clone(),
                lot_no,
            );
            lifter.division = update.division.clone();
            lifter.bodyweight_kg = update.bodyweight_kg;
            lifter.rack_id = update.rack_change().flatten();
            self.register_lifter(lifter)?;
        }

        // 2. 台位/组别与热身架
        self.reassign_flight(lifter_id, &update.platform_id, &update.flight_id)?;
        if let Some(rack_id) = update.rack_change() {
            self.set_rack(lifter_id, rack_id)?;
        }

        // 3. 申报
        if let Some(weight) = update.declared_weight {
            let current = self.lifter(lifter_id)?.slot(update.discipline, update.attempt_no)?;
            let already_decided = current.outcome.is_decided();
            if !(already_decided && current.requested_weight == Some(weight)) {
                self.record_declaration(lifter_id, update.discipline, update.attempt_no, weight)?;
            }
        }

        // 4. 判定 (相同结果重复推送视为无变化)
        if let Some(outcome) = update.effective_outcome() {
            let current = self.lifter(lifter_id)?.slot(update.discipline, update.attempt_no)?;
            if current.outcome == outcome {
                return Ok(());
            }
            if current.outcome.is_decided() {
                return Err(EngineError::AlreadyDecided {
                    lifter_id: lifter_id.to_string(),
                    discipline: update.discipline,
                    attempt_no: update.attempt_no,
                    existing: current.outcome,
                });
            }

            let platform_id = self.lifter(lifter_id)?.platform_id.clone();
            self.record_outcome(
                lifter_id,
                update.discipline,
                update.attempt_no,
                outcome,
                update.referee_votes,
            )?;
            if let Some(at) = update.observed_at {
                self.note_outcome_time(&platform_id, at);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::engine_config::PaceConfig;

    fn update(seq: u64) -> AttemptUpdate {
        AttemptUpdate::new(seq, "L001", Discipline::Squat, 1, "A", "1").lot(4)
    }

    #[test]
    fn test_first_update_registers_lifter() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        let result = meet.apply_update(&update(1).declare(120.0).rack("R1")).unwrap();

        assert_eq!(result, ApplyOutcome::Applied);
        let lifter = meet.lifter("L001").unwrap();
        assert_eq!(lifter.lot_no, 4);
        assert_eq!(lifter.rack_id.as_deref(), Some("R1"));
        assert_eq!(lifter.slot(Discipline::Squat, 1).unwrap().requested_weight, Some(120.0));
        assert_eq!(meet.last_applied_seq(), 1);
    }

    #[test]
    fn test_stale_update_dropped() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        meet.apply_update(&update(5).declare(120.0)).unwrap();
        let before = meet.clone();

        assert_eq!(meet.apply_update(&update(5).declare(125.0)).unwrap(), ApplyOutcome::Stale);
        assert_eq!(meet.apply_update(&update(3).declare(125.0)).unwrap(), ApplyOutcome::Stale);
        assert_eq!(meet, before);
    }

    #[test]
    fn test_failed_update_leaves_state_untouched() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        meet.apply_update(&update(1).declare(120.0).decide(Outcome::Good)).unwrap();
        let before = meet.clone();

        // 换架成功但判定冲突 → 整条回滚
        let err = meet
            .apply_update(&update(2).rack("R9").decide(Outcome::NoLift))
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyDecided { .. }));
        assert_eq!(meet, before);
        assert_eq!(meet.lifter("L001").unwrap().rack_id, None);
    }

    #[test]
    fn test_feed_without_rack_keeps_director_rack() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        meet.apply_update(&update(1).declare(100.0)).unwrap();
        meet.set_rack("L001", Some("RACK".to_string())).unwrap();

        meet.apply_update(&update(2).declare(102.5)).unwrap();
        let lifter = meet.lifter("L001").unwrap();
        assert_eq!(lifter.rack_id.as_deref(), Some("RACK"));
        assert_eq!(lifter.slot(Discipline::Squat, 1).unwrap().requested_weight, Some(102.5));

        // 数据源显式携带时仍可改架与清除
        meet.apply_update(&update(3).rack("R2")).unwrap();
        assert_eq!(meet.lifter("L001").unwrap().rack_id.as_deref(), Some("R2"));
        meet.apply_update(&update(4).clear_rack()).unwrap();
        assert_eq!(meet.lifter("L001").unwrap().rack_id, None);
    }

    #[test]
    fn test_blank_rack_registers_without_rack() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        meet.apply_update(&update(1).declare(100.0).rack("  ")).unwrap();
        assert_eq!(meet.lifter("L001").unwrap().rack_id, None);
    }

    #[test]
    fn test_repeated_outcome_is_unchanged() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        meet.apply_update(&update(1).declare(120.0).decide(Outcome::Good)).unwrap();
        let result = meet
            .apply_update(&update(2).declare(120.0).decide(Outcome::Good))
            .unwrap();
        assert_eq!(result, ApplyOutcome::Unchanged);
        assert_eq!(meet.last_applied_seq(), 2);
    }

    #[test]
    fn test_votes_decide_when_outcome_missing() {
        let mut meet = MeetState::new("M1", PaceConfig::default());
        meet.apply_update(
            &update(1)
                .declare(120.0)
                .votes(RefereeVotes::new(Some(false), Some(true), Some(false))),
        )
        .unwrap();
        let slot = meet.lifter("L001").unwrap().slot(Discipline::Squat, 1).unwrap().clone();
        assert_eq!(slot.outcome, Outcome::NoLift);
        assert_eq!(slot.votes.head, Some(true));
    }

    #[test]
    fn test_update_deserializes_from_feed_json() {
        let raw = r#"{"seq":7,"lifter_id":"L9","discipline":"BENCH","attempt_no":2,
                      "declared_weight":92.5,"platform_id":"B","flight_id":"2","rack_id":null}"#;
        let update: AttemptUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.discipline, Discipline::Bench);
        assert_eq!(update.declared_weight, Some(92.5));
        assert_eq!(update.outcome, None);
        assert_eq!(update.rack_id, None);
        assert_eq!(update.rack_change(), None);

        let cleared: AttemptUpdate = serde_json::from_str(
            r#"{"seq":8,"lifter_id":"L9","discipline":"BENCH","attempt_no":2,
                "platform_id":"B","flight_id":"2","rack_id":""}"#,
        )
        .unwrap();
        assert_eq!(cleared.rack_change(), Some(None));
    }
}
