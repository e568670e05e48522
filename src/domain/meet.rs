// ==========================================
// 力量举试举追踪引擎 - 比赛实时状态
// ==========================================
// 职责: 单一可变比赛快照 (版本化)，承载申报/判定/换架变更
// 红线: 变更失败时状态不变 (先校验后写入)
// 红线: 任一成功变更都会推进版本号与受影响台位的修订号,
//       派生视图 (出场队列/倒计时/热身批次) 依修订号失效
// ==========================================

use crate::config::engine_config::PaceConfig;
use crate::domain::lifter::Lifter;
use crate::domain::types::{Discipline, Outcome, RefereeVotes};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::pace::PaceEstimator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// MeetState - 比赛快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetState {
    meet_id: String,
    version: u64,
    last_applied_seq: u64,
    lifters: BTreeMap<String, Lifter>,
    platform_revisions: BTreeMap<String, u64>,
    pace: BTreeMap<String, PaceEstimator>,
    last_outcome_at: BTreeMap<String, DateTime<Utc>>,
    pace_config: PaceConfig,
}

impl MeetState {
    pub fn new(meet_id: impl Into<String>, pace_config: PaceConfig) -> Self {
        Self {
            meet_id: meet_id.into(),
            version: 0,
            last_applied_seq: 0,
            lifters: BTreeMap::new(),
            platform_revisions: BTreeMap::new(),
            pace: BTreeMap::new(),
            last_outcome_at: BTreeMap::new(),
            pace_config,
        }
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn meet_id(&self) -> &str {
        &self.meet_id
    }

    /// 快照版本号，每次成功变更 +1
    pub fn version(&self) -> u64 {
        self.version
    }

    /// 最近一次已应用的数据源序号
    pub fn last_applied_seq(&self) -> u64 {
        self.last_applied_seq
    }

    pub(crate) fn set_last_applied_seq(&mut self, seq: u64) {
        self.last_applied_seq = seq;
    }

    /// 台位修订号；台位不存在时为 0
    pub fn platform_revision(&self, platform_id: &str) -> u64 {
        self.platform_revisions.get(platform_id).copied().unwrap_or(0)
    }

    pub fn lifter(&self, lifter_id: &str) -> EngineResult<&Lifter> {
        self.lifters
            .get(lifter_id)
            .ok_or_else(|| EngineError::LifterNotFound(lifter_id.to_string()))
    }

    pub fn contains_lifter(&self, lifter_id: &str) -> bool {
        self.lifters.contains_key(lifter_id)
    }

    pub fn lifters(&self) -> impl Iterator<Item = &Lifter> {
        self.lifters.values()
    }

    /// 当前分配在某台位上的运动员
    pub fn lifters_on_platform<'a>(&'a self, platform_id: &'a str) -> impl Iterator<Item = &'a Lifter> {
        self.lifters.values().filter(move |l| l.platform_id == platform_id)
    }

    /// 全部台位 (有序)
    pub fn platforms(&self) -> Vec<String> {
        self.lifters
            .values()
            .map(|l| l.platform_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 全部热身架编号 (有序)
    pub fn rack_ids(&self) -> Vec<String> {
        self.lifters
            .values()
            .filter_map(|l| l.rack_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 某台位当前节奏估计 (秒/把)
    pub fn pace_seconds(&self, platform_id: &str) -> f64 {
        self.pace
            .get(platform_id)
            .map(|p| p.seconds_per_attempt(&self.pace_config))
            .unwrap_or(self.pace_config.default_seconds_per_attempt)
    }

    pub fn pace_config(&self) -> &PaceConfig {
        &self.pace_config
    }

    /// 修订号与另一快照不同的台位
    pub fn revised_platforms(&self, other: &MeetState) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .platform_revisions
            .keys()
            .chain(other.platform_revisions.keys())
            .collect();
        keys.into_iter()
            .filter(|p| self.platform_revision(p) != other.platform_revision(p))
            .cloned()
            .collect()
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 登记运动员
    pub fn register_lifter(&mut self, lifter: Lifter) -> EngineResult<()> {
        if lifter.lifter_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("lifter_id 不能为空".to_string()));
        }
        if self.lifters.contains_key(&lifter.lifter_id) {
            return Err(EngineError::InvalidInput(format!(
                "运动员已存在: {}",
                lifter.lifter_id
            )));
        }

        let platform_id = lifter.platform_id.clone();
        tracing::debug!(lifter_id = %lifter.lifter_id, platform = %platform_id, "登记运动员");
        self.lifters.insert(lifter.lifter_id.clone(), lifter);
        self.touch(&[platform_id.as_str()]);
        Ok(())
    }

    /// 申报重量 (recordDeclaration)
    ///
    /// # 规则
    /// - 已判定的试举不可再申报
    /// - 同一项目内按序申报，且已申报重量随试举序号单调不减
    /// - 与当前申报相同的重量视为无变化，不推进版本
    pub fn record_declaration(
        &mut self,
        lifter_id: &str,
        discipline: Discipline,
        attempt_no: u8,
        weight: f64,
    ) -> EngineResult<()> {
        let lifter = self.lifter(lifter_id)?;
        let slot = lifter.slot(discipline, attempt_no)?;

        let reject = |reason: String| EngineError::InvalidDeclaration {
            lifter_id: lifter_id.to_string(),
            discipline,
            attempt_no,
            weight,
            reason,
        };

        if !weight.is_finite() || weight <= 0.0 {
            return Err(reject("申报重量必须为正数".to_string()));
        }
        if slot.outcome.is_decided() {
            return Err(reject(format!("该试举已判定为 {}", slot.outcome)));
        }
        if slot.requested_weight == Some(weight) {
            return Ok(());
        }

        for other in lifter.discipline_slots(discipline) {
            let Some(other_weight) = other.requested_weight else {
                if other.attempt_no < attempt_no {
                    return Err(reject(format!("第{}把尚未申报", other.attempt_no)));
                }
                continue;
            };
            if other.attempt_no < attempt_no && weight < other_weight {
                return Err(reject(format!(
                    "低于第{}把的 {} ({})",
                    other.attempt_no, other_weight, other.outcome
                )));
            }
            if other.attempt_no > attempt_no && weight > other_weight {
                return Err(reject(format!(
                    "高于第{}把已申报的 {}",
                    other.attempt_no, other_weight
                )));
            }
        }

        let platform_id = lifter.platform_id.clone();
        self.lifter_mut(lifter_id)?
            .slot_mut(discipline, attempt_no)?
            .requested_weight = Some(weight);
        self.touch(&[platform_id.as_str()]);

        tracing::info!(
            lifter_id,
            %discipline,
            attempt_no,
            weight,
            version = self.version,
            "申报已记录"
        );
        Ok(())
    }

    /// 记录判定结果 (recordOutcome)
    ///
    /// # 规则
    /// - 结果必须为 GOOD / NO_LIFT
    /// - 试举必须已申报
    /// - 每个试举只判定一次，重复判定返回 AlreadyDecided
    pub fn record_outcome(
        &mut self,
        lifter_id: &str,
        discipline: Discipline,
        attempt_no: u8,
        outcome: Outcome,
        votes: Option<RefereeVotes>,
    ) -> EngineResult<()> {
        let lifter = self.lifter(lifter_id)?;
        let slot = lifter.slot(discipline, attempt_no)?;

        if slot.outcome.is_decided() {
            return Err(EngineError::AlreadyDecided {
                lifter_id: lifter_id.to_string(),
                discipline,
                attempt_no,
                existing: slot.outcome,
            });
        }
        if !outcome.is_decided() {
            return Err(EngineError::InvalidInput(
                "判定结果不能为 PENDING".to_string(),
            ));
        }
        if !slot.is_declared() {
            return Err(EngineError::InvalidInput(format!(
                "{} {} 第{}把尚未申报重量，无法判定",
                lifter_id, discipline, attempt_no
            )));
        }

        let platform_id = lifter.platform_id.clone();
        let slot = self
            .lifter_mut(lifter_id)?
            .slot_mut(discipline, attempt_no)?;
        slot.outcome = outcome;
        if let Some(votes) = votes {
            slot.votes = votes;
        }
        self.touch(&[platform_id.as_str()]);

        tracing::info!(
            lifter_id,
            %discipline,
            attempt_no,
            %outcome,
            version = self.version,
            "判定已记录"
        );
        Ok(())
    }

    /// 调整热身架归属 (None = 不共用热身架)
    pub fn set_rack(&mut self, lifter_id: &str, rack_id: Option<String>) -> EngineResult<()> {
        let lifter = self.lifter(lifter_id)?;
        if lifter.rack_id == rack_id {
            return Ok(());
        }

        let platform_id = lifter.platform_id.clone();
        tracing::info!(lifter_id, from = ?lifter.rack_id, to = ?rack_id, "热身架归属变更");
        self.lifter_mut(lifter_id)?.rack_id = rack_id;
        self.touch(&[platform_id.as_str()]);
        Ok(())
    }

    /// 调整台位/组别
    pub fn reassign_flight(
        &mut self,
        lifter_id: &str,
        platform_id: &str,
        flight_id: &str,
    ) -> EngineResult<()> {
        if platform_id.trim().is_empty() || flight_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("台位/组别不能为空".to_string()));
        }

        let lifter = self.lifter(lifter_id)?;
        if lifter.platform_id == platform_id && lifter.flight_id == flight_id {
            return Ok(());
        }

        let old_platform = lifter.platform_id.clone();
        tracing::info!(
            lifter_id,
            from_platform = %old_platform,
            to_platform = platform_id,
            flight = flight_id,
            "台位/组别变更"
        );

        let lifter = self.lifter_mut(lifter_id)?;
        lifter.platform_id = platform_id.to_string();
        lifter.flight_id = flight_id.to_string();
        self.touch(&[old_platform.as_str(), platform_id]);
        Ok(())
    }

    /// 直接记录一个节奏样本 (秒/把)
    pub fn record_pace_sample(&mut self, platform_id: &str, seconds: f64) -> bool {
        let config = self.pace_config.clone();
        self.pace
            .entry(platform_id.to_string())
            .or_insert_with(|| PaceEstimator::new(&config))
            .observe(seconds, &config)
    }

    /// 记录台上一次判定发生的时间，并将与上一次判定的间隔计入节奏
    pub fn note_outcome_time(&mut self, platform_id: &str, at: DateTime<Utc>) {
        if let Some(previous) = self.last_outcome_at.get(platform_id).copied() {
            let gap = (at - previous).num_milliseconds() as f64 / 1000.0;
            if !self.record_pace_sample(platform_id, gap) {
                tracing::debug!(platform = platform_id, gap, "节奏样本被忽略");
            }
        }
        if self
            .last_outcome_at
            .get(platform_id)
            .map_or(true, |previous| at > *previous)
        {
            self.last_outcome_at.insert(platform_id.to_string(), at);
        }
    }

    // ==========================================
    // 内部方法
    // ==========================================

    fn lifter_mut(&mut self, lifter_id: &str) -> EngineResult<&mut Lifter> {
        self.lifters
            .get_mut(lifter_id)
            .ok_or_else(|| EngineError::LifterNotFound(lifter_id.to_string()))
    }

    /// 推进版本号与台位修订号
    fn touch(&mut self, platforms: &[&str]) {
        self.version += 1;
        for platform in platforms {
            *self.platform_revisions.entry(platform.to_string()).or_insert(0) += 1;
        }
    }
}
