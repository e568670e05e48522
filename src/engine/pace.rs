// ==========================================
// 力量举试举追踪引擎 - 台上节奏估计
// ==========================================
// 职责: 按台位维护每把耗时的指数加权滚动平均
// 输入: 相邻两次判定之间的间隔 (秒)
// 输出: 当前节奏估计 (秒/把)
// ==========================================

use crate::config::engine_config::PaceConfig;
use serde::{Deserialize, Serialize};

/// 单个台位的节奏估计器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceEstimator {
    ewma_seconds: f64,
    samples: u32,
}

impl PaceEstimator {
    /// 以默认节奏为种子创建
    pub fn new(config: &PaceConfig) -> Self {
        Self {
            ewma_seconds: config.default_seconds_per_attempt,
            samples: 0,
        }
    }

    /// 记录一个样本
    ///
    /// # 返回
    /// - `true`: 样本被采纳
    /// - `false`: 样本非正或超过组间休息阈值，被忽略
    pub fn observe(&mut self, seconds: f64, config: &PaceConfig) -> bool {
        if !seconds.is_finite() || seconds <= 0.0 || seconds > config.max_sample_seconds {
            return false;
        }

        let alpha = config.ewma_alpha.clamp(f64::EPSILON, 1.0);
        self.ewma_seconds = alpha * seconds + (1.0 - alpha) * self.ewma_seconds;
        self.samples += 1;
        true
    }

    /// 当前节奏估计
    ///
    /// 样本数不足 min_samples 时返回配置的默认值
    pub fn seconds_per_attempt(&self, config: &PaceConfig) -> f64 {
        if self.samples < config.min_samples {
            config.default_seconds_per_attempt
        } else {
            self.ewma_seconds
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_until_min_samples() {
        let config = PaceConfig::default();
        let mut pace = PaceEstimator::new(&config);

        assert_eq!(pace.seconds_per_attempt(&config), 60.0);
        pace.observe(90.0, &config);
        pace.observe(90.0, &config);
        assert_eq!(pace.sample_count(), 2);
        assert_eq!(pace.seconds_per_attempt(&config), 60.0);

        pace.observe(90.0, &config);
        let estimate = pace.seconds_per_attempt(&config);
        assert!(estimate > 60.0 && estimate < 90.0);
    }

    #[test]
    fn test_ewma_converges() {
        let config = PaceConfig {
            min_samples: 1,
            ..PaceConfig::default()
        };
        let mut pace = PaceEstimator::new(&config);
        for _ in 0..50 {
            pace.observe(45.0, &config);
        }
        assert!((pace.seconds_per_attempt(&config) - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_rejects_breaks_and_nonsense() {
        let config = PaceConfig::default();
        let mut pace = PaceEstimator::new(&config);
        assert!(!pace.observe(0.0, &config));
        assert!(!pace.observe(-5.0, &config));
        assert!(!pace.observe(1800.0, &config));
        assert!(!pace.observe(f64::NAN, &config));
        assert_eq!(pace.sample_count(), 0);
    }
}
