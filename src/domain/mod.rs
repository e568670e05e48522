// ==========================================
// 力量举试举追踪引擎 - 领域模型层
// ==========================================
// 职责: 定义运动员、试举、比赛快照与数据源更新
// 红线: 不含派生视图计算，不含 I/O
// ==========================================

pub mod lifter;
pub mod meet;
pub mod types;
pub mod update;

// 重导出核心类型
pub use lifter::{AttemptSlot, Lifter, ATTEMPTS_PER_DISCIPLINE};
pub use meet::MeetState;
pub use types::{AlertLevel, Discipline, Outcome, RefereeVotes, WeightUnit};
pub use update::{ApplyOutcome, AttemptUpdate};
