// ==========================================
// 力量举试举追踪引擎 - 核心库
// ==========================================
// 技术栈: Rust + tokio + SQLite (仅配置)
// 系统定位: 比赛现场热身区辅助 (出场队列/倒计时/热身架/配片)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 运动员/试举/比赛快照
pub mod domain;

// 引擎层 - 派生视图计算
pub mod engine;

// 配置层 - 引擎参数
pub mod config;

// 服务层 - 更新队列与快照所有权
pub mod services;

// API 层 - 查询接口
pub mod api;

// 数据库基础设施（配置表连接初始化）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AlertLevel, Discipline, Outcome, RefereeVotes, WeightUnit};

// 领域实体
pub use domain::{ApplyOutcome, AttemptSlot, AttemptUpdate, Lifter, MeetState};

// 引擎
pub use engine::{
    AttemptsOut, Countdown, CountdownPredictor, EngineError, EngineResult, OrderResolver,
    PlateDecomposer, PlatformQueue, RackPlanner, SchedulingConflict, Wave,
};

// 配置
pub use config::{ConfigManager, EngineConfig};

// 服务
pub use services::{SnapshotStore, UpdateQueue};

// API
pub use api::{ApiError, ApiResult, MeetApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "力量举试举追踪引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
