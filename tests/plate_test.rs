// ==========================================
// 配片集成测试
// ==========================================
// 测试目标: 标准片贪心结果即最少片数、精度不足时明确失败
// ==========================================

use powertrack_engine::config::PlateConfig;
use powertrack_engine::domain::WeightUnit;
use powertrack_engine::engine::plate::{decompose, standard_denominations};
use powertrack_engine::engine::{EngineError, PlateDecomposer};

/// 以 0.25 kg 为单位的动态规划最少片数
fn min_plates_quarters(amount: usize, denominations: &[usize]) -> Vec<u32> {
    let mut best = vec![u32::MAX; amount + 1];
    best[0] = 0;
    for a in 1..=amount {
        for &d in denominations {
            if d <= a && best[a - d] != u32::MAX {
                best[a] = best[a].min(best[a - d] + 1);
            }
        }
    }
    best
}

#[test]
fn test_greedy_matches_minimum_plate_count() {
    let kg = standard_denominations(WeightUnit::Kg);
    let quarters: Vec<usize> = kg.iter().map(|d| (d * 4.0).round() as usize).collect();
    let best = min_plates_quarters(400, &quarters);

    // 每侧 0 ~ 100 kg，步长 0.25
    for k in 0..=400usize {
        let target = 25.0 + 0.5 * k as f64;
        let load = decompose(target, 20.0, 2.5, &kg, 0.001).unwrap();
        assert_eq!(
            load.plates_per_side(),
            best[k],
            "目标 {} kg 的片数不是最少",
            target
        );
        assert!((load.resolved_total - target).abs() < 1e-9);
    }
}

#[test]
fn test_competition_load_140() {
    let decomposer = PlateDecomposer::default();
    let load = decomposer.decompose(140.0, 20.0, 2.5).unwrap();

    let plates: Vec<(f64, u32)> = load.per_side.iter().map(|p| (p.weight, p.count)).collect();
    assert_eq!(plates, vec![(25.0, 2), (5.0, 1), (2.5, 1)]);
    assert_eq!(load.per_side_total(), 57.5);
}

#[test]
fn test_precision_beyond_smallest_plate_is_infeasible() {
    let decomposer = PlateDecomposer::default();
    let err = decomposer.decompose(140.1, 20.0, 2.5).unwrap_err();
    assert!(matches!(err, EngineError::Infeasible { .. }));
}

#[test]
fn test_tolerance_absorbs_small_residual() {
    let decomposer = PlateDecomposer::new(PlateConfig {
        tolerance: 0.2,
        ..PlateConfig::default()
    });
    let load = decomposer.decompose(140.1, 20.0, 2.5).unwrap();
    assert!((load.resolved_total - 140.0).abs() < 1e-9);
}

#[test]
fn test_custom_denominations_report_residual() {
    let decomposer = PlateDecomposer::with_denominations(PlateConfig::default(), vec![20.0, 10.0]);
    match decomposer.decompose(75.0, 20.0, 0.0) {
        Err(EngineError::Infeasible { residual, .. }) => assert!((residual - 15.0).abs() < 1e-9),
        other => panic!("unexpected result: {:?}", other),
    }
}
