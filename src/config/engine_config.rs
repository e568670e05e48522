// ==========================================
// 力量举试举追踪引擎 - 引擎配置
// ==========================================
// 职责: 倒计时、热身架排程、配片等可调参数
// 说明: 全部字段带默认值，缺省键回落到默认
// ==========================================

use crate::domain::types::WeightUnit;
use serde::{Deserialize, Serialize};

// ==========================================
// 节奏估计配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceConfig {
    /// 样本不足时使用的默认节奏 (秒/把)
    pub default_seconds_per_attempt: f64,
    /// 指数加权平滑系数 (0, 1]
    pub ewma_alpha: f64,
    /// 启用滚动估计前所需的最少样本数
    pub min_samples: u32,
    /// 超过该间隔的样本视为组间休息，不计入节奏
    pub max_sample_seconds: f64,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            default_seconds_per_attempt: 60.0,
            ewma_alpha: 0.3,
            min_samples: 3,
            max_sample_seconds: 600.0,
        }
    }
}

// ==========================================
// 倒计时配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// 保守 ETA 的额外缓冲百分比
    pub eta_buffer_percent: f64,
    /// 提醒阈值 (剩余把数)
    pub final_call_attempts: u32,
    pub critical_attempts: u32,
    pub bar_work_attempts: u32,
    pub prep_attempts: u32,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            eta_buffer_percent: 20.0,
            final_call_attempts: 3,
            critical_attempts: 5,
            bar_work_attempts: 10,
            prep_attempts: 15,
        }
    }
}

// ==========================================
// 热身架配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackConfig {
    /// 跨台冲突判定窗口 (把数)
    pub conflict_buffer: u32,
    /// 剩余把数不超过该值的运动员所在批次提前
    pub urgent_attempts_out: u32,
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            conflict_buffer: 2,
            urgent_attempts_out: 1,
        }
    }
}

// ==========================================
// 配片配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateConfig {
    pub unit: WeightUnit,
    /// 还原总重允许的误差
    pub tolerance: f64,
    pub bar_weight: f64,
    pub collar_weight_per_side: f64,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            unit: WeightUnit::Kg,
            tolerance: 0.001,
            bar_weight: 20.0,
            collar_weight_per_side: 2.5,
        }
    }
}

// ==========================================
// 数据源配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// 更新队列容量 (有界)
    pub queue_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

// ==========================================
// EngineConfig - 引擎配置全集
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pace: PaceConfig,
    pub countdown: CountdownConfig,
    pub rack: RackConfig,
    pub plates: PlateConfig,
    pub feed: FeedConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pace.default_seconds_per_attempt, 60.0);
        assert_eq!(config.rack.conflict_buffer, 2);
        assert_eq!(config.countdown.prep_attempts, 15);
        assert_eq!(config.plates.unit, WeightUnit::Kg);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"rack":{"conflict_buffer":4},"plates":{"unit":"lb"}}"#)
                .unwrap();
        assert_eq!(config.rack.conflict_buffer, 4);
        assert_eq!(config.rack.urgent_attempts_out, 1);
        assert_eq!(config.plates.unit, WeightUnit::Lb);
        assert_eq!(config.plates.tolerance, 0.001);
        assert_eq!(config.pace, PaceConfig::default());
    }
}
