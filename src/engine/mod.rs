// ==========================================
// 力量举试举追踪引擎 - 引擎层
// ==========================================
// 职责: 基于比赛快照计算派生视图 (队列/倒计时/热身批次/配片)
// 红线: 引擎无 I/O、无定时器，每次调用基于传入快照同步重算
// 红线: 排程冲突随结果返回，不作为错误
// ==========================================

pub mod countdown;
pub mod error;
pub mod events;
pub mod order_resolver;
pub mod pace;
pub mod plate;
pub mod rack_planner;
pub mod warmup;

// 重导出核心引擎
pub use countdown::{AttemptsOut, Countdown, CountdownPredictor};
pub use error::{EngineError, EngineResult};
pub use events::{
    MeetEvent, MeetEventPublisher, MeetEventType, NoOpEventPublisher, OptionalEventPublisher,
};
pub use order_resolver::{OrderResolver, PlatformQueue, QueueEntry};
pub use pace::PaceEstimator;
pub use plate::{PlateCount, PlateDecomposer, PlateLoad};
pub use rack_planner::{RackGroup, RackPlanner, SchedulingConflict, Wave, WaveCluster, WaveMember};
pub use warmup::{build_warmup_plan, WarmupStep};
