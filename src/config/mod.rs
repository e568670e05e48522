// ==========================================
// 力量举试举追踪引擎 - 配置层
// ==========================================
// 职责: 引擎参数定义与覆写加载
// 存储: config_kv 表 (仅配置，比赛快照不落库)
// ==========================================

pub mod config_manager;
pub mod config_reader_trait;
pub mod engine_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
pub use config_reader_trait::EngineConfigReader;
pub use engine_config::{
    CountdownConfig, EngineConfig, FeedConfig, PaceConfig, PlateConfig, RackConfig,
};
