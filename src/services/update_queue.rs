// ==========================================
// 力量举试举追踪引擎 - 数据源更新队列
// ==========================================
// 职责: 有界队列接收归一化更新，单一写入任务串行应用
// 输入: AttemptUpdate (来自外部数据源适配器)
// 输出: 版本化只读快照 (Arc<MeetState>) + 比赛事件
// ==========================================
// 红线: 只有写入任务修改快照；读者拿到的快照永不被原地修改
// 红线: 过期序号丢弃并计数；被拒绝的更新不产生任何部分变更
// ==========================================

use crate::domain::meet::MeetState;
use crate::domain::update::{ApplyOutcome, AttemptUpdate};
use crate::engine::error::EngineError;
use crate::engine::events::{MeetEvent, MeetEventType, OptionalEventPublisher};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// ==========================================
// FeedError - 队列错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("更新队列已关闭")]
    QueueClosed,

    #[error("更新队列已满")]
    QueueFull,

    #[error("更新被拒绝: {0}")]
    Rejected(#[from] EngineError),

    #[error("写入任务异常退出: {0}")]
    WriterFailed(String),
}

// ==========================================
// SnapshotStore - 当前快照
// ==========================================
// 读者取 Arc 后在锁外计算，写锁只覆盖指针替换
pub struct SnapshotStore {
    current: RwLock<Arc<MeetState>>,
}

impl SnapshotStore {
    pub fn new(meet: MeetState) -> Self {
        Self {
            current: RwLock::new(Arc::new(meet)),
        }
    }

    /// 取当前一致快照
    pub fn snapshot(&self) -> Arc<MeetState> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn replace(&self, next: Arc<MeetState>) {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
    }
}

// ==========================================
// FeedStats - 计数器
// ==========================================
#[derive(Debug, Default)]
pub struct FeedStats {
    applied: AtomicU64,
    unchanged: AtomicU64,
    stale: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedStatsSnapshot {
    pub applied: u64,
    pub unchanged: u64,
    pub stale: u64,
    pub rejected: u64,
}

impl FeedStats {
    pub fn snapshot(&self) -> FeedStatsSnapshot {
        FeedStatsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

struct FeedMessage {
    update: AttemptUpdate,
    ack: Option<oneshot::Sender<Result<ApplyOutcome, FeedError>>>,
}

// ==========================================
// UpdateQueue - 有界更新队列 + 单一写入任务
// ==========================================
pub struct UpdateQueue {
    sender: mpsc::Sender<FeedMessage>,
    store: Arc<SnapshotStore>,
    stats: Arc<FeedStats>,
    writer: JoinHandle<()>,
}

impl UpdateQueue {
    /// 启动写入任务 (需在 tokio 运行时内调用)
    ///
    /// # 参数
    /// - `meet`: 初始快照
    /// - `capacity`: 队列容量 (0 按 1 处理)
    /// - `publisher`: 每次提交后发布事件
    pub fn start(meet: MeetState, capacity: usize, publisher: OptionalEventPublisher) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let store = Arc::new(SnapshotStore::new(meet));
        let stats = Arc::new(FeedStats::default());

        let writer = tokio::spawn(run_writer(
            receiver,
            Arc::clone(&store),
            Arc::clone(&stats),
            publisher,
        ));
        tracing::info!(capacity, "更新写入任务已启动");

        Self {
            sender,
            store,
            stats,
            writer,
        }
    }

    /// 入队 (队列满时等待)
    pub async fn submit(&self, update: AttemptUpdate) -> Result<(), FeedError> {
        self.sender
            .send(FeedMessage { update, ack: None })
            .await
            .map_err(|_| FeedError::QueueClosed)
    }

    /// 入队 (队列满时立即返回 QueueFull)
    pub fn try_submit(&self, update: AttemptUpdate) -> Result<(), FeedError> {
        self.sender
            .try_send(FeedMessage { update, ack: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => FeedError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => FeedError::QueueClosed,
            })
    }

    /// 入队并等待写入任务的应用结果
    pub async fn submit_and_wait(&self, update: AttemptUpdate) -> Result<ApplyOutcome, FeedError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(FeedMessage {
                update,
                ack: Some(ack),
            })
            .await
            .map_err(|_| FeedError::QueueClosed)?;
        done.await.map_err(|_| FeedError::QueueClosed)?
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn snapshot(&self) -> Arc<MeetState> {
        self.store.snapshot()
    }

    pub fn stats(&self) -> FeedStatsSnapshot {
        self.stats.snapshot()
    }

    /// 计数器句柄 (关闭队列后仍可读取最终计数)
    pub fn stats_handle(&self) -> Arc<FeedStats> {
        Arc::clone(&self.stats)
    }

    /// 关闭队列，等待已入队更新全部应用后返回最终快照
    pub async fn shutdown(self) -> Result<Arc<MeetState>, FeedError> {
        let UpdateQueue {
            sender,
            store,
            writer,
            ..
        } = self;
        drop(sender);
        writer
            .await
            .map_err(|e| FeedError::WriterFailed(e.to_string()))?;
        Ok(store.snapshot())
    }
}

// ==========================================
// 写入任务
// ==========================================

async fn run_writer(
    mut receiver: mpsc::Receiver<FeedMessage>,
    store: Arc<SnapshotStore>,
    stats: Arc<FeedStats>,
    publisher: OptionalEventPublisher,
) {
    while let Some(message) = receiver.recv().await {
        let result = apply_one(&store, &stats, &publisher, &message.update);
        if let Some(ack) = message.ack {
            // 调用方已放弃等待时忽略
            let _ = ack.send(result);
        }
    }
    tracing::info!(stats = ?stats.snapshot(), "更新写入任务退出");
}

fn apply_one(
    store: &SnapshotStore,
    stats: &FeedStats,
    publisher: &OptionalEventPublisher,
    update: &AttemptUpdate,
) -> Result<ApplyOutcome, FeedError> {
    let current = store.snapshot();
    let mut next = MeetState::clone(&current);

    match next.apply_update(update) {
        Ok(ApplyOutcome::Stale) => {
            stats.stale.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                seq = update.seq,
                last_applied = current.last_applied_seq(),
                lifter_id = %update.lifter_id,
                "丢弃过期更新"
            );
            Ok(ApplyOutcome::Stale)
        }
        Ok(ApplyOutcome::Unchanged) => {
            stats.unchanged.fetch_add(1, Ordering::Relaxed);
            // 仅推进已应用序号
            store.replace(Arc::new(next));
            Ok(ApplyOutcome::Unchanged)
        }
        Ok(ApplyOutcome::Applied) => {
            stats.applied.fetch_add(1, Ordering::Relaxed);
            let event = MeetEvent::new(
                next.meet_id(),
                next.version(),
                update.seq,
                classify(&current, &next, update),
                update.lifter_id.clone(),
                next.revised_platforms(&current),
            );
            store.replace(Arc::new(next));

            tracing::info!(
                seq = update.seq,
                version = event.version,
                event_type = event.event_type.as_str(),
                lifter_id = %update.lifter_id,
                "更新已提交"
            );
            if let Err(e) = publisher.publish(event) {
                tracing::warn!(seq = update.seq, error = %e, "事件发布失败");
            }
            Ok(ApplyOutcome::Applied)
        }
        Err(e) => {
            stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(seq = update.seq, lifter_id = %update.lifter_id, error = %e, "更新被拒绝");
            Err(FeedError::Rejected(e))
        }
    }
}

/// 由提交前后快照判定事件类型
fn classify(before: &MeetState, after: &MeetState, update: &AttemptUpdate) -> MeetEventType {
    if !before.contains_lifter(&update.lifter_id) {
        return MeetEventType::LifterRegistered;
    }

    let slot_state = |meet: &MeetState| {
        meet.lifter(&update.lifter_id)
            .and_then(|l| l.slot(update.discipline, update.attempt_no))
            .map(|s| (s.outcome, s.requested_weight))
            .ok()
    };

    match (slot_state(before), slot_state(after)) {
        (Some((outcome_before, _)), Some((outcome_after, _))) if outcome_before != outcome_after => {
            MeetEventType::OutcomeRecorded
        }
        (Some((_, weight_before)), Some((_, weight_after))) if weight_before != weight_after => {
            MeetEventType::DeclarationRecorded
        }
        _ => MeetEventType::LifterReassigned,
    }
}
