// ==========================================
// 力量举试举追踪引擎 - 出场顺序解析器
// ==========================================
// 职责: 按台位生成待判定试举的出场队列
// 输入: 比赛快照
// 输出: PlatformQueue (已申报部分 + 未申报部分)
// ==========================================
// 排序键 (已申报):
// 1) 项目 (深蹲 → 卧推 → 硬拉)
// 2) 组别 (组别按序上台)
// 3) 申报重量升序
// 4) 抽签号升序
// 5) 试举序号升序 (同一运动员同重量时)
// 未申报试举排在最后，按 (项目, 组别, 序号, 抽签号) 排列，不计入剩余把数
// ==========================================

use crate::domain::lifter::{AttemptSlot, Lifter};
use crate::domain::meet::MeetState;
use crate::domain::types::Discipline;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

// ==========================================
// QueueEntry - 队列中的一次试举
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub lifter_id: String,
    pub lifter_name: String,
    pub flight_id: String,
    pub lot_no: u32,
    pub rack_id: Option<String>,
    pub discipline: Discipline,
    pub attempt_no: u8,
    pub weight: Option<f64>,
}

impl QueueEntry {
    fn from_slot(lifter: &Lifter, slot: &AttemptSlot) -> Self {
        Self {
            lifter_id: lifter.lifter_id.clone(),
            lifter_name: lifter.name.clone(),
            flight_id: lifter.flight_id.clone(),
            lot_no: lifter.lot_no,
            rack_id: lifter.rack_id.clone(),
            discipline: slot.discipline,
            attempt_no: slot.attempt_no,
            weight: slot.requested_weight,
        }
    }

    pub fn is_slot(&self, lifter_id: &str, discipline: Discipline, attempt_no: u8) -> bool {
        self.lifter_id == lifter_id && self.discipline == discipline && self.attempt_no == attempt_no
    }
}

// ==========================================
// PlatformQueue - 台位出场队列 (派生视图)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformQueue {
    pub platform_id: String,
    /// 生成时的台位修订号
    pub revision: u64,
    declared: Vec<QueueEntry>,
    undeclared: Vec<QueueEntry>,
}

impl PlatformQueue {
    /// 已申报、参与排序的试举
    pub fn declared(&self) -> &[QueueEntry] {
        &self.declared
    }

    /// 尚未申报的待判定试举
    pub fn undeclared(&self) -> &[QueueEntry] {
        &self.undeclared
    }

    /// 完整顺序: 已申报在前，未申报在后
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.declared.iter().chain(self.undeclared.iter())
    }

    /// 当前试举 (队首)
    pub fn current(&self) -> Option<&QueueEntry> {
        self.declared.first()
    }

    /// 目标试举在已申报队列中的位置 (0 = 正在上场)
    pub fn position_of(&self, lifter_id: &str, discipline: Discipline, attempt_no: u8) -> Option<usize> {
        self.declared
            .iter()
            .position(|e| e.is_slot(lifter_id, discipline, attempt_no))
    }

    pub fn len(&self) -> usize {
        self.declared.len() + self.undeclared.len()
    }

    /// 所有待判定试举均已完成 (合法终态)
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty() && self.undeclared.is_empty()
    }
}

// ==========================================
// OrderResolver - 出场顺序解析器
// ==========================================
pub struct OrderResolver {
    // 无状态引擎
}

impl OrderResolver {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 生成某台位的出场队列
    pub fn resolve(&self, meet: &MeetState, platform_id: &str) -> PlatformQueue {
        let mut declared = Vec::new();
        let mut undeclared = Vec::new();

        for lifter in meet.lifters_on_platform(platform_id) {
            for slot in lifter.attempts().iter().filter(|s| s.is_pending()) {
                let entry = QueueEntry::from_slot(lifter, slot);
                if slot.is_declared() {
                    declared.push(entry);
                } else {
                    undeclared.push(entry);
                }
            }
        }

        declared.sort_by(|a, b| self.compare_declared(a, b));
        undeclared.sort_by(|a, b| self.compare_undeclared(a, b));

        tracing::debug!(
            platform = platform_id,
            declared = declared.len(),
            undeclared = undeclared.len(),
            "出场队列已生成"
        );

        PlatformQueue {
            platform_id: platform_id.to_string(),
            revision: meet.platform_revision(platform_id),
            declared,
            undeclared,
        }
    }

    /// 生成全部台位的出场队列
    pub fn resolve_all(&self, meet: &MeetState) -> BTreeMap<String, PlatformQueue> {
        meet.platforms()
            .into_iter()
            .map(|p| {
                let queue = self.resolve(meet, &p);
                (p, queue)
            })
            .collect()
    }

    /// 当前试举指针
    pub fn current_attempt(&self, meet: &MeetState, platform_id: &str) -> Option<QueueEntry> {
        self.resolve(meet, platform_id).current().cloned()
    }

    // ==========================================
    // 比较方法
    // ==========================================

    /// 已申报试举比较
    ///
    /// # 返回
    /// Ordering::Less 表示 a 先上场
    pub fn compare_declared(&self, a: &QueueEntry, b: &QueueEntry) -> Ordering {
        a.discipline
            .cmp(&b.discipline)
            .then_with(|| compare_flight(&a.flight_id, &b.flight_id))
            .then_with(|| {
                let wa = a.weight.unwrap_or(f64::INFINITY);
                let wb = b.weight.unwrap_or(f64::INFINITY);
                wa.total_cmp(&wb)
            })
            .then_with(|| a.lot_no.cmp(&b.lot_no))
            .then_with(|| a.attempt_no.cmp(&b.attempt_no))
            .then_with(|| a.lifter_id.cmp(&b.lifter_id))
    }

    /// 未申报试举比较 (按组别出场顺序)
    fn compare_undeclared(&self, a: &QueueEntry, b: &QueueEntry) -> Ordering {
        a.discipline
            .cmp(&b.discipline)
            .then_with(|| compare_flight(&a.flight_id, &b.flight_id))
            .then_with(|| a.attempt_no.cmp(&b.attempt_no))
            .then_with(|| a.lot_no.cmp(&b.lot_no))
            .then_with(|| a.lifter_id.cmp(&b.lifter_id))
    }
}

impl Default for OrderResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// 组别排序键: 纯数字组别在前并按数值，其余按去空白后的字符串
fn flight_key(label: &str) -> (bool, u64, &str) {
    let label = label.trim();
    match label.parse::<u64>() {
        Ok(n) => (false, n, label),
        Err(_) => (true, 0, label),
    }
}

fn compare_flight(a: &str, b: &str) -> Ordering {
    flight_key(a).cmp(&flight_key(b))
}
