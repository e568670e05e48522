// ==========================================
// 力量举试举追踪引擎 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表加载引擎配置覆写
// 存储: config_kv 表 (scope_id='global', key, value)
// 红线: 缺省键回落默认值；无法解析的值报错，不静默回落
// ==========================================

use crate::config::config_reader_trait::EngineConfigReader;
use crate::config::engine_config::EngineConfig;
use crate::db::{configure_sqlite_connection, ensure_config_table, open_sqlite_connection};
use crate::domain::types::WeightUnit;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ==========================================
// ConfigError - 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("配置值非法: {key}={value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("锁获取失败: {0}")]
    LockPoisoned(String),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径 (不存在时创建 config_kv 表)
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_config_table(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn.lock().map_err(|e| ConfigError::LockPoisoned(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_config_table(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| ConfigError::LockPoisoned(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| ConfigError::LockPoisoned(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| ConfigError::LockPoisoned(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 加载引擎配置: 默认值 + config_kv 覆写
    pub fn load_engine_config(&self) -> ConfigResult<EngineConfig> {
        let mut config = EngineConfig::default();

        // 节奏
        self.override_parsed(config_keys::PACE_DEFAULT_SECONDS, &mut config.pace.default_seconds_per_attempt)?;
        self.override_parsed(config_keys::PACE_EWMA_ALPHA, &mut config.pace.ewma_alpha)?;
        self.override_parsed(config_keys::PACE_MIN_SAMPLES, &mut config.pace.min_samples)?;
        self.override_parsed(config_keys::PACE_MAX_SAMPLE_SECONDS, &mut config.pace.max_sample_seconds)?;

        // 倒计时
        self.override_parsed(config_keys::ETA_BUFFER_PERCENT, &mut config.countdown.eta_buffer_percent)?;
        self.override_parsed(config_keys::ALERT_FINAL_CALL, &mut config.countdown.final_call_attempts)?;
        self.override_parsed(config_keys::ALERT_CRITICAL, &mut config.countdown.critical_attempts)?;
        self.override_parsed(config_keys::ALERT_BAR_WORK, &mut config.countdown.bar_work_attempts)?;
        self.override_parsed(config_keys::ALERT_PREP, &mut config.countdown.prep_attempts)?;

        // 热身架
        self.override_parsed(config_keys::RACK_CONFLICT_BUFFER, &mut config.rack.conflict_buffer)?;
        self.override_parsed(config_keys::RACK_URGENT_ATTEMPTS_OUT, &mut config.rack.urgent_attempts_out)?;

        // 配片
        if let Some(raw) = self.get_global_config_value(config_keys::PLATE_UNIT)? {
            config.plates.unit = WeightUnit::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: config_keys::PLATE_UNIT.to_string(),
                value: raw.clone(),
                reason: "仅支持 kg / lb".to_string(),
            })?;
        }
        self.override_parsed(config_keys::PLATE_TOLERANCE, &mut config.plates.tolerance)?;
        self.override_parsed(config_keys::PLATE_BAR_WEIGHT, &mut config.plates.bar_weight)?;
        self.override_parsed(config_keys::PLATE_COLLAR_WEIGHT, &mut config.plates.collar_weight_per_side)?;

        // 数据源
        self.override_parsed(config_keys::FEED_QUEUE_CAPACITY, &mut config.feed.queue_capacity)?;

        validate_engine_config(&config)?;
        tracing::info!(
            unit = %config.plates.unit,
            conflict_buffer = config.rack.conflict_buffer,
            queue_capacity = config.feed.queue_capacity,
            "引擎配置已加载"
        );
        Ok(config)
    }

    /// 存在配置时解析并覆写目标字段
    fn override_parsed<T>(&self, key: &str, target: &mut T) -> ConfigResult<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(());
        };
        *target = raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// 校验数值范围
fn validate_engine_config(config: &EngineConfig) -> ConfigResult<()> {
    let invalid = |key: &str, value: String, reason: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
        reason: reason.to_string(),
    };

    let alpha = config.pace.ewma_alpha;
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(invalid(config_keys::PACE_EWMA_ALPHA, alpha.to_string(), "取值范围 (0, 1]"));
    }
    if !(config.pace.default_seconds_per_attempt > 0.0) {
        return Err(invalid(
            config_keys::PACE_DEFAULT_SECONDS,
            config.pace.default_seconds_per_attempt.to_string(),
            "必须为正数",
        ));
    }
    if !(config.plates.tolerance >= 0.0) {
        return Err(invalid(
            config_keys::PLATE_TOLERANCE,
            config.plates.tolerance.to_string(),
            "不能为负数",
        ));
    }
    if config.feed.queue_capacity == 0 {
        return Err(invalid(config_keys::FEED_QUEUE_CAPACITY, "0".to_string(), "必须大于 0"));
    }
    Ok(())
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn load_engine_config(&self) -> ConfigResult<EngineConfig> {
        ConfigManager::load_engine_config(self)
    }

    async fn get_config_snapshot(&self) -> ConfigResult<String> {
        ConfigManager::get_config_snapshot(self)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 节奏
    pub const PACE_DEFAULT_SECONDS: &str = "pace.default_seconds_per_attempt";
    pub const PACE_EWMA_ALPHA: &str = "pace.ewma_alpha";
    pub const PACE_MIN_SAMPLES: &str = "pace.min_samples";
    pub const PACE_MAX_SAMPLE_SECONDS: &str = "pace.max_sample_seconds";

    // 倒计时
    pub const ETA_BUFFER_PERCENT: &str = "countdown.eta_buffer_percent";
    pub const ALERT_FINAL_CALL: &str = "countdown.final_call_attempts";
    pub const ALERT_CRITICAL: &str = "countdown.critical_attempts";
    pub const ALERT_BAR_WORK: &str = "countdown.bar_work_attempts";
    pub const ALERT_PREP: &str = "countdown.prep_attempts";

    // 热身架
    pub const RACK_CONFLICT_BUFFER: &str = "rack.conflict_buffer";
    pub const RACK_URGENT_ATTEMPTS_OUT: &str = "rack.urgent_attempts_out";

    // 配片
    pub const PLATE_UNIT: &str = "plates.unit";
    pub const PLATE_TOLERANCE: &str = "plates.tolerance";
    pub const PLATE_BAR_WEIGHT: &str = "plates.bar_weight";
    pub const PLATE_COLLAR_WEIGHT: &str = "plates.collar_weight_per_side";

    // 数据源
    pub const FEED_QUEUE_CAPACITY: &str = "feed.queue_capacity";
}
