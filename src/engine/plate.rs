// ==========================================
// 力量举试举追踪引擎 - 配片计算
// ==========================================
// 职责: 目标杠铃总重 → 每侧杠铃片组合
// 算法: 从大到小贪心取片 (标准校准片为规范币制，贪心即最少片数)
// 红线: 无法在容差内精确配出时返回 Infeasible，不做静默取整
// 说明: 纯函数，无状态、无 I/O
// ==========================================

use crate::config::engine_config::PlateConfig;
use crate::domain::types::WeightUnit;
use crate::engine::error::{EngineError, EngineResult};
use serde::Serialize;

/// 取整防抖 (浮点累计误差)
const FLOOR_EPSILON: f64 = 1e-9;

// ==========================================
// 器材库
// ==========================================

/// 杠铃片规格
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Plate {
    pub weight: f64,
    pub label: &'static str,
}

/// 杠铃杆规格
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub weight: f64,
    pub label: &'static str,
}

static KG_PLATES: [Plate; 9] = [
    Plate { weight: 25.0, label: "25 kg 红" },
    Plate { weight: 20.0, label: "20 kg 蓝" },
    Plate { weight: 15.0, label: "15 kg 黄" },
    Plate { weight: 10.0, label: "10 kg 绿" },
    Plate { weight: 5.0, label: "5 kg 白" },
    Plate { weight: 2.5, label: "2.5 kg 黑" },
    Plate { weight: 1.25, label: "1.25 kg 银" },
    Plate { weight: 0.5, label: "0.5 kg 调整片" },
    Plate { weight: 0.25, label: "0.25 kg 微调片" },
];

static LB_PLATES: [Plate; 9] = [
    Plate { weight: 55.0, label: "55 lb 红" },
    Plate { weight: 45.0, label: "45 lb 蓝" },
    Plate { weight: 35.0, label: "35 lb 黄" },
    Plate { weight: 25.0, label: "25 lb 绿" },
    Plate { weight: 15.0, label: "15 lb 白" },
    Plate { weight: 10.0, label: "10 lb 黑" },
    Plate { weight: 5.0, label: "5 lb 银" },
    Plate { weight: 2.5, label: "2.5 lb 调整片" },
    Plate { weight: 1.25, label: "1.25 lb 微调片" },
];

static KG_BARS: [Bar; 3] = [
    Bar { weight: 20.0, label: "20 kg 力量举杆" },
    Bar { weight: 15.0, label: "15 kg 女子杆" },
    Bar { weight: 25.0, label: "25 kg 深蹲杆" },
];

static LB_BARS: [Bar; 2] = [
    Bar { weight: 45.0, label: "45 lb 力量举杆" },
    Bar { weight: 55.0, label: "55 lb 深蹲杆" },
];

/// 卡扣选项 (kg, 每侧)
pub const COLLAR_OPTIONS_KG: [f64; 3] = [0.0, 0.25, 2.5];

pub const KG_TO_LB: f64 = 2.20462;

/// 标准杠铃片 (从大到小)
pub fn standard_plates(unit: WeightUnit) -> &'static [Plate] {
    match unit {
        WeightUnit::Kg => &KG_PLATES,
        WeightUnit::Lb => &LB_PLATES,
    }
}

/// 标准杠铃片面额
pub fn standard_denominations(unit: WeightUnit) -> Vec<f64> {
    standard_plates(unit).iter().map(|p| p.weight).collect()
}

/// 卡扣选项 (按单位换算，每侧)
pub fn collar_options(unit: WeightUnit) -> Vec<f64> {
    match unit {
        WeightUnit::Kg => COLLAR_OPTIONS_KG.to_vec(),
        WeightUnit::Lb => COLLAR_OPTIONS_KG.iter().map(|kg| kg * KG_TO_LB).collect(),
    }
}

/// 可选杠铃杆
pub fn bar_options(unit: WeightUnit) -> &'static [Bar] {
    match unit {
        WeightUnit::Kg => &KG_BARS,
        WeightUnit::Lb => &LB_BARS,
    }
}

// ==========================================
// 输出结构
// ==========================================

/// 某一面额的片数 (每侧)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlateCount {
    pub weight: f64,
    pub count: u32,
}

/// 配片结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateLoad {
    pub target_weight: f64,
    pub bar_weight: f64,
    pub collar_weight_per_side: f64,
    /// 每侧需加载重量
    pub per_side_load: f64,
    /// 每侧片组合 (从大到小)
    pub per_side: Vec<PlateCount>,
    /// 杆 + 卡扣 + 两侧片 的还原总重
    pub resolved_total: f64,
}

impl PlateLoad {
    /// 每侧片数
    pub fn plates_per_side(&self) -> u32 {
        self.per_side.iter().map(|p| p.count).sum()
    }

    /// 每侧片重合计
    pub fn per_side_total(&self) -> f64 {
        self.per_side.iter().map(|p| p.weight * p.count as f64).sum()
    }
}

// ==========================================
// 核心算法
// ==========================================

/// 配片 (decomposePlate)
///
/// # 参数
/// - `target_weight`: 目标总重
/// - `bar_weight`: 杆重
/// - `collar_weight`: 每侧卡扣重量
/// - `denominations`: 可用面额 (顺序不限，非正值忽略)
/// - `tolerance`: 还原总重允许误差
///
/// # 返回
/// - `Ok(PlateLoad)`: 每侧片组合
/// - `Err(Infeasible)`: 杆+卡扣超重，或余量超出容差
pub fn decompose(
    target_weight: f64,
    bar_weight: f64,
    collar_weight: f64,
    denominations: &[f64],
    tolerance: f64,
) -> EngineResult<PlateLoad> {
    for (name, value) in [
        ("target_weight", target_weight),
        ("bar_weight", bar_weight),
        ("collar_weight", collar_weight),
        ("tolerance", tolerance),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidInput(format!("{} 必须为非负数: {}", name, value)));
        }
    }

    let working = target_weight - bar_weight - 2.0 * collar_weight;
    if working < -tolerance {
        return Err(EngineError::Infeasible {
            target_weight,
            residual: -working,
            reason: "杆与卡扣重量已超过目标重量".to_string(),
        });
    }

    let per_side_load = working.max(0.0) / 2.0;

    let mut plates: Vec<f64> = denominations
        .iter()
        .copied()
        .filter(|d| d.is_finite() && *d > 0.0)
        .collect();
    plates.sort_by(|a, b| b.total_cmp(a));
    plates.dedup();

    let mut remaining = per_side_load;
    let mut per_side = Vec::new();
    for plate in plates {
        let count = ((remaining + FLOOR_EPSILON) / plate).floor();
        if count < 1.0 {
            continue;
        }
        remaining -= count * plate;
        per_side.push(PlateCount {
            weight: plate,
            count: count as u32,
        });
    }

    let residual = (remaining * 2.0).max(0.0);
    if residual > tolerance {
        return Err(EngineError::Infeasible {
            target_weight,
            residual,
            reason: "现有面额无法在容差内精确配出".to_string(),
        });
    }

    let loaded: f64 = per_side.iter().map(|p| p.weight * p.count as f64).sum();
    Ok(PlateLoad {
        target_weight,
        bar_weight,
        collar_weight_per_side: collar_weight,
        per_side_load,
        per_side,
        resolved_total: bar_weight + 2.0 * collar_weight + 2.0 * loaded,
    })
}

// ==========================================
// PlateDecomposer - 按配置配片
// ==========================================
pub struct PlateDecomposer {
    config: PlateConfig,
    denominations: Vec<f64>,
}

impl PlateDecomposer {
    /// 使用配置单位的标准片
    pub fn new(config: PlateConfig) -> Self {
        let denominations = standard_denominations(config.unit);
        Self {
            config,
            denominations,
        }
    }

    /// 使用自定义面额
    pub fn with_denominations(config: PlateConfig, denominations: Vec<f64>) -> Self {
        Self {
            config,
            denominations,
        }
    }

    /// 指定杆与卡扣
    pub fn decompose(
        &self,
        target_weight: f64,
        bar_weight: f64,
        collar_weight: f64,
    ) -> EngineResult<PlateLoad> {
        let result = decompose(
            target_weight,
            bar_weight,
            collar_weight,
            &self.denominations,
            self.config.tolerance,
        );
        if let Err(e) = &result {
            tracing::debug!(target_weight, bar_weight, collar_weight, error = %e, "配片失败");
        }
        result
    }

    /// 使用配置的默认杆与卡扣
    pub fn decompose_default(&self, target_weight: f64) -> EngineResult<PlateLoad> {
        self.decompose(
            target_weight,
            self.config.bar_weight,
            self.config.collar_weight_per_side,
        )
    }

    pub fn unit(&self) -> WeightUnit {
        self.config.unit
    }
}

impl Default for PlateDecomposer {
    fn default() -> Self {
        Self::new(PlateConfig::default())
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn kg() -> Vec<f64> {
        standard_denominations(WeightUnit::Kg)
    }

    #[test]
    fn test_140_with_competition_collars() {
        let load = decompose(140.0, 20.0, 2.5, &kg(), 0.001).unwrap();
        assert_eq!(load.per_side_load, 57.5);
        assert_eq!(
            load.per_side,
            vec![
                PlateCount { weight: 25.0, count: 2 },
                PlateCount { weight: 5.0, count: 1 },
                PlateCount { weight: 2.5, count: 1 },
            ]
        );
        assert_eq!(load.plates_per_side(), 4);
        assert!((load.resolved_total - 140.0).abs() < 1e-9);
    }

    #[test]
    fn test_sub_micro_precision_is_infeasible() {
        let err = decompose(140.2, 20.0, 2.5, &kg(), 0.001).unwrap_err();
        match err {
            EngineError::Infeasible { target_weight, residual, .. } => {
                assert_eq!(target_weight, 140.2);
                assert!((residual - 0.2).abs() < 1e-6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bar_heavier_than_target() {
        let err = decompose(20.0, 20.0, 2.5, &kg(), 0.001).unwrap_err();
        assert!(matches!(err, EngineError::Infeasible { residual, .. } if (residual - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_empty_bar() {
        let load = decompose(25.0, 20.0, 2.5, &kg(), 0.001).unwrap();
        assert!(load.per_side.is_empty());
        assert_eq!(load.resolved_total, 25.0);
    }

    #[test]
    fn test_unsorted_denominations() {
        let load = decompose(60.0, 20.0, 0.0, &[5.0, 20.0, 5.0], 0.001).unwrap();
        assert_eq!(load.per_side, vec![PlateCount { weight: 20.0, count: 1 }]);
    }

    #[test]
    fn test_lb_set() {
        let decomposer = PlateDecomposer::new(PlateConfig {
            unit: WeightUnit::Lb,
            ..PlateConfig::default()
        });
        let load = decomposer.decompose(315.0, 45.0, 0.0).unwrap();
        assert_eq!(
            load.per_side,
            vec![
                PlateCount { weight: 55.0, count: 2 },
                PlateCount { weight: 25.0, count: 1 },
            ]
        );
    }

    #[test]
    fn test_collar_options_converted_to_lb() {
        let lb = collar_options(WeightUnit::Lb);
        assert_eq!(lb[0], 0.0);
        assert!((lb[2] - 5.51155).abs() < 1e-4);
        assert_eq!(collar_options(WeightUnit::Kg), vec![0.0, 0.25, 2.5]);
    }

    #[test]
    fn test_negative_input_rejected() {
        assert!(matches!(
            decompose(-1.0, 20.0, 0.0, &kg(), 0.001),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
