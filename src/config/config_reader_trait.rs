// ==========================================
// 力量举试举追踪引擎 - 配置读取 Trait
// ==========================================
// 职责: 定义启动时所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::ConfigResult;
use crate::config::engine_config::EngineConfig;
use async_trait::async_trait;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 获取生效的引擎配置
    ///
    /// # 默认值
    /// - 缺省键使用 EngineConfig::default() 对应字段
    async fn load_engine_config(&self) -> ConfigResult<EngineConfig>;

    /// 获取原始覆写项快照 (JSON)
    async fn get_config_snapshot(&self) -> ConfigResult<String>;
}
