// ==========================================
// 力量举试举追踪引擎 - 热身阶梯
// ==========================================
// 职责: 由开把重量与预计上场时间生成热身组
// 输入: 开把重量 + 重量单位 + ETA
// 输出: 各热身阶段的重量与开始时间
// ==========================================

use crate::domain::lifter::Lifter;
use crate::domain::types::WeightUnit;
use crate::engine::countdown::Countdown;
use serde::Serialize;

/// 热身阶段定义
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WarmupPhase {
    pub label: &'static str,
    /// 开把重量百分比
    pub percent: f64,
    /// 距上场的分钟数
    pub minutes_before: f64,
    pub rep_scheme: &'static str,
}

/// 默认热身阶段
pub const WARMUP_PHASES: [WarmupPhase; 5] = [
    WarmupPhase {
        label: "活动度与空杆",
        percent: 0.30,
        minutes_before: 20.0,
        rep_scheme: "8-10 次 · 熟悉动作",
    },
    WarmupPhase {
        label: "速度组",
        percent: 0.50,
        minutes_before: 15.0,
        rep_scheme: "2 x 3 快速",
    },
    WarmupPhase {
        label: "递增组",
        percent: 0.70,
        minutes_before: 10.0,
        rep_scheme: "2 x 2 控制",
    },
    WarmupPhase {
        label: "最后热身",
        percent: 0.85,
        minutes_before: 6.0,
        rep_scheme: "1-2 个单次",
    },
    WarmupPhase {
        label: "上场准备",
        percent: 1.00,
        minutes_before: 0.0,
        rep_scheme: "开把可视化",
    },
];

/// 一组热身
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmupStep {
    pub label: String,
    pub percent: f64,
    pub weight: f64,
    pub rep_scheme: String,
    /// 距现在多少秒开始；ETA 未知时为 None
    pub start_in_seconds: Option<f64>,
}

/// 按步长四舍五入 (保留三位小数)
pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return value;
    }
    ((value / increment).round() * increment * 1000.0).round() / 1000.0
}

/// 生成热身阶梯
///
/// 开把重量缺失或为 0 时返回空列表
pub fn build_warmup_plan(
    opener: Option<f64>,
    unit: WeightUnit,
    eta_seconds: Option<f64>,
) -> Vec<WarmupStep> {
    let Some(opener) = opener.filter(|w| w.is_finite() && *w > 0.0) else {
        return Vec::new();
    };
    let increment = unit.rounding_increment();

    WARMUP_PHASES
        .iter()
        .map(|phase| WarmupStep {
            label: phase.label.to_string(),
            percent: phase.percent,
            weight: round_to_increment(opener * phase.percent, increment),
            rep_scheme: phase.rep_scheme.to_string(),
            start_in_seconds: eta_seconds.map(|eta| (eta - phase.minutes_before * 60.0).max(0.0)),
        })
        .collect()
}

/// 根据倒计时结果为运动员生成当前项目的热身阶梯 (使用保守 ETA)
pub fn warmup_for_countdown(lifter: &Lifter, countdown: &Countdown, unit: WeightUnit) -> Vec<WarmupStep> {
    let Some(discipline) = countdown.discipline else {
        return Vec::new();
    };
    build_warmup_plan(lifter.opener(discipline), unit, countdown.buffered_eta_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_increment() {
        assert_eq!(round_to_increment(61.3, 0.5), 61.5);
        assert_eq!(round_to_increment(61.2, 0.5), 61.0);
        assert_eq!(round_to_increment(203.4, 1.0), 203.0);
        assert_eq!(round_to_increment(7.7, 0.0), 7.7);
    }

    #[test]
    fn test_plan_weights_and_start_times() {
        let plan = build_warmup_plan(Some(200.0), WeightUnit::Kg, Some(900.0));
        let weights: Vec<f64> = plan.iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![60.0, 100.0, 140.0, 170.0, 200.0]);

        // 20 分钟前的阶段已到点
        assert_eq!(plan[0].start_in_seconds, Some(0.0));
        assert_eq!(plan[2].start_in_seconds, Some(300.0));
        assert_eq!(plan[4].start_in_seconds, Some(900.0));
    }

    #[test]
    fn test_phases_ramp_toward_opener() {
        assert!(WARMUP_PHASES.windows(2).all(|w| w[0].percent < w[1].percent));
        assert!(WARMUP_PHASES.windows(2).all(|w| w[0].minutes_before > w[1].minutes_before));
        assert_eq!(WARMUP_PHASES[4].percent, 1.0);
    }

    #[test]
    fn test_no_opener_no_plan() {
        assert!(build_warmup_plan(None, WeightUnit::Kg, Some(60.0)).is_empty());
        assert!(build_warmup_plan(Some(0.0), WeightUnit::Kg, None).is_empty());
    }
}
