// ==========================================
// 力量举试举追踪引擎 - 服务层
// ==========================================
// 职责: 快照所有权与数据源更新的串行写入
// ==========================================

pub mod update_queue;

pub use update_queue::{FeedError, FeedStats, FeedStatsSnapshot, SnapshotStore, UpdateQueue};
