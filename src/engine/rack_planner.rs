// ==========================================
// 力量举试举追踪引擎 - 热身架排程引擎
// ==========================================
// 职责: 共用热身架的运动员分批 (Wave) 与跨台冲突检测
// 输入: 比赛快照 + 各台位出场队列
// 输出: Wave (按批次排列的使用顺序 + 冲突列表)
// ==========================================
// 规则:
// - 同一重量的成员归为一批，批内无需换片
// - 批次按重量升序 (与比赛加重方向一致)
// - 含临近上场成员 (剩余把数 ≤ urgent_attempts_out) 的批次提前
// - 批内按剩余把数升序，再按运动员编号
// - 不同台位、剩余把数相差不超过 conflict_buffer 的成员对报告冲突，
//   不跨台重排
// ==========================================

use crate::config::engine_config::RackConfig;
use crate::domain::meet::MeetState;
use crate::domain::types::Discipline;
use crate::engine::order_resolver::{OrderResolver, PlatformQueue};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

const WEIGHT_EPSILON: f64 = 1e-9;

// ==========================================
// 输出结构
// ==========================================

/// 共用同一热身架的运动员集合 (由 Lifter.rack_id 推导)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RackGroup {
    pub rack_id: String,
    pub member_ids: Vec<String>,
}

/// 批次中的一名运动员
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveMember {
    pub lifter_id: String,
    pub lifter_name: String,
    pub platform_id: String,
    pub discipline: Discipline,
    pub attempt_no: u8,
    pub weight: f64,
    pub attempts_out: usize,
}

/// 同一重量的一批
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveCluster {
    pub weight: f64,
    /// 含临近上场成员，已提前
    pub urgent: bool,
    pub members: Vec<WaveMember>,
}

/// 跨台排程冲突 (非致命，随 Wave 一并返回)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulingConflict {
    pub lifter_id_a: String,
    pub lifter_id_b: String,
    pub platform_a: String,
    pub platform_b: String,
    pub attempts_out_a: usize,
    pub attempts_out_b: usize,
    /// JSON 格式的冲突原因
    pub reason: String,
}

/// 热身架使用计划
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wave {
    pub rack_id: String,
    pub clusters: Vec<WaveCluster>,
    pub conflicts: Vec<SchedulingConflict>,
    /// 按此顺序使用需要的换重次数
    pub weight_changes: usize,
    /// 下一把尚未申报或已全部完成、未参与排程的成员
    pub unscheduled: Vec<String>,
    pub snapshot_version: u64,
}

impl Wave {
    /// 扁平化的使用顺序
    pub fn order(&self) -> Vec<&str> {
        self.clusters
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.lifter_id.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

// ==========================================
// RackPlanner - 热身架排程引擎
// ==========================================
pub struct RackPlanner {
    config: RackConfig,
    resolver: OrderResolver,
}

impl RackPlanner {
    pub fn new(config: RackConfig) -> Self {
        Self {
            config,
            resolver: OrderResolver::new(),
        }
    }

    // ==========================================
    // 分组
    // ==========================================

    /// 由 rack_id 推导全部热身架分组
    pub fn rack_groups(&self, meet: &MeetState) -> Vec<RackGroup> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for lifter in meet.lifters() {
            if let Some(rack_id) = &lifter.rack_id {
                groups
                    .entry(rack_id.clone())
                    .or_default()
                    .push(lifter.lifter_id.clone());
            }
        }

        groups
            .into_iter()
            .map(|(rack_id, member_ids)| RackGroup { rack_id, member_ids })
            .collect()
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 生成某热身架的使用计划 (getWave)
    ///
    /// 无成员或无成员有已申报的下一把时返回空计划
    pub fn plan(&self, meet: &MeetState, rack_id: &str) -> Wave {
        let mut queues: BTreeMap<String, PlatformQueue> = BTreeMap::new();
        let mut members = Vec::new();
        let mut unscheduled = Vec::new();

        for lifter in meet.lifters().filter(|l| l.rack_id.as_deref() == Some(rack_id)) {
            let Some(slot) = lifter.next_pending() else {
                unscheduled.push(lifter.lifter_id.clone());
                continue;
            };
            let Some(weight) = slot.requested_weight else {
                unscheduled.push(lifter.lifter_id.clone());
                continue;
            };

            let queue = queues
                .entry(lifter.platform_id.clone())
                .or_insert_with(|| self.resolver.resolve(meet, &lifter.platform_id));
            let Some(attempts_out) =
                queue.position_of(&lifter.lifter_id, slot.discipline, slot.attempt_no)
            else {
                unscheduled.push(lifter.lifter_id.clone());
                continue;
            };

            members.push(WaveMember {
                lifter_id: lifter.lifter_id.clone(),
                lifter_name: lifter.name.clone(),
                platform_id: lifter.platform_id.clone(),
                discipline: slot.discipline,
                attempt_no: slot.attempt_no,
                weight,
                attempts_out,
            });
        }

        let conflicts = self.detect_conflicts(rack_id, &members);
        let clusters = self.build_clusters(members);
        let weight_changes = clusters.len().saturating_sub(1);

        if !conflicts.is_empty() {
            tracing::warn!(rack_id, conflicts = conflicts.len(), "热身架存在跨台冲突");
        }
        tracing::debug!(rack_id, clusters = clusters.len(), weight_changes, "热身批次已生成");

        Wave {
            rack_id: rack_id.to_string(),
            clusters,
            conflicts,
            weight_changes,
            unscheduled,
            snapshot_version: meet.version(),
        }
    }

    /// 全部热身架的使用计划
    pub fn plan_all(&self, meet: &MeetState) -> Vec<Wave> {
        meet.rack_ids()
            .iter()
            .map(|rack_id| self.plan(meet, rack_id))
            .collect()
    }

    // ==========================================
    // 分批
    // ==========================================

    fn build_clusters(&self, mut members: Vec<WaveMember>) -> Vec<WaveCluster> {
        members.sort_by(|a, b| {
            a.weight
                .total_cmp(&b.weight)
                .then_with(|| a.attempts_out.cmp(&b.attempts_out))
                .then_with(|| a.lifter_id.cmp(&b.lifter_id))
        });

        let mut clusters: Vec<WaveCluster> = Vec::new();
        for member in members {
            match clusters.last_mut() {
                Some(cluster) if (cluster.weight - member.weight).abs() < WEIGHT_EPSILON => {
                    cluster.members.push(member);
                }
                _ => clusters.push(WaveCluster {
                    weight: member.weight,
                    urgent: false,
                    members: vec![member],
                }),
            }
        }

        let urgent_limit = self.config.urgent_attempts_out as usize;
        for cluster in clusters.iter_mut() {
            cluster.urgent = cluster.members.iter().any(|m| m.attempts_out <= urgent_limit);
        }

        // 临近上场的批次提前 (按最早到点成员)，其余保持重量升序
        clusters.sort_by(|a, b| match (a.urgent, b.urgent) {
            (true, true) => soonest(a)
                .cmp(&soonest(b))
                .then_with(|| a.weight.total_cmp(&b.weight)),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => a.weight.total_cmp(&b.weight),
        });

        clusters
    }

    // ==========================================
    // 冲突检测
    // ==========================================

    fn detect_conflicts(&self, rack_id: &str, members: &[WaveMember]) -> Vec<SchedulingConflict> {
        let buffer = self.config.conflict_buffer as usize;
        let mut sorted: Vec<&WaveMember> = members.iter().collect();
        sorted.sort_by(|a, b| a.lifter_id.cmp(&b.lifter_id));

        let mut conflicts = Vec::new();
        for (i, a) in sorted.iter().enumerate() {
            for b in sorted.iter().skip(i + 1) {
                if a.platform_id == b.platform_id {
                    continue;
                }
                let gap = a.attempts_out.abs_diff(b.attempts_out);
                if gap > buffer {
                    continue;
                }

                conflicts.push(SchedulingConflict {
                    lifter_id_a: a.lifter_id.clone(),
                    lifter_id_b: b.lifter_id.clone(),
                    platform_a: a.platform_id.clone(),
                    platform_b: b.platform_id.clone(),
                    attempts_out_a: a.attempts_out,
                    attempts_out_b: b.attempts_out,
                    reason: json!({
                        "type": "OVERLAPPING_WINDOW",
                        "reason": "共用热身架的两名运动员在不同台位几乎同时上场",
                        "rack_id": rack_id,
                        "gap_attempts": gap,
                        "conflict_buffer": buffer,
                        "weights": [a.weight, b.weight],
                    })
                    .to_string(),
                });
            }
        }
        conflicts
    }
}

impl Default for RackPlanner {
    fn default() -> Self {
        Self::new(RackConfig::default())
    }
}

fn soonest(cluster: &WaveCluster) -> usize {
    cluster
        .members
        .iter()
        .map(|m| m.attempts_out)
        .min()
        .unwrap_or(usize::MAX)
}
