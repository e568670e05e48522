// ==========================================
// RackPlanner 集成测试
// ==========================================
// 测试目标: 同重量分批、跨台冲突、热身架调整后重算
// ==========================================


use powertrack_engine::domain::Discipline;
use powertrack_engine::engine::RackPlanner;
use test_helpers::MeetBuilder;

#[test]
fn test_same_platform_same_weight_single_cluster() {
    // R1 第 1 位、R2 第 4 位，同台同重量
    let meet = MeetBuilder::new()
        .lifter("P0", "A", 1)
        .racked("R1", "A", 2, "RACK")
        .lifter("P2", "A", 3)
        .lifter("P3", "A", 4)
        .racked("R2", "A", 5, "RACK")
        .opener("P0", 90.0)
        .opener("R1", 100.0)
        .opener("P2", 100.0)
        .opener("P3", 100.0)
        .opener("R2", 100.0)
        .build();

    let wave = RackPlanner::default().plan(&meet, "RACK");

    assert_eq!(wave.clusters.len(), 1);
    assert_eq!(wave.clusters[0].weight, 100.0);
    let outs: Vec<usize> = wave.clusters[0].members.iter().map(|m| m.attempts_out).collect();
    assert_eq!(outs, vec![1, 4]);
    assert_eq!(wave.order(), vec!["R1", "R2"]);
    assert!(wave.conflicts.is_empty(), "同台位按队列先后，不算冲突");
    assert_eq!(wave.weight_changes, 0);
}

#[test]
fn test_cross_platform_overlap_reports_conflict() {
    let meet = MeetBuilder::new()
        .lifter("P0", "A", 1)
        .racked("R1", "A", 2, "RACK")
        .lifter("Q0", "B", 1)
        .racked("R2", "B", 2, "RACK")
        .opener("P0", 90.0)
        .opener("R1", 100.0)
        .opener("Q0", 80.0)
        .opener("R2", 120.0)
        .build();

    let wave = RackPlanner::default().plan(&meet, "RACK");

    assert_eq!(wave.conflicts.len(), 1);
    let conflict = &wave.conflicts[0];
    assert_eq!((conflict.lifter_id_a.as_str(), conflict.lifter_id_b.as_str()), ("R1", "R2"));
    assert_eq!((conflict.attempts_out_a, conflict.attempts_out_b), (1, 1));
    let reason: serde_json::Value = serde_json::from_str(&conflict.reason).unwrap();
    assert_eq!(reason["type"], "OVERLAPPING_WINDOW");

    // 冲突不阻断计划
    assert_eq!(wave.order(), vec!["R1", "R2"]);
    assert_eq!(wave.weight_changes, 1);
}

#[test]
fn test_far_apart_cross_platform_no_conflict() {
    let mut builder = MeetBuilder::new().racked("R1", "A", 1, "RACK");
    for i in 0..6u32 {
        builder = builder.lifter(&format!("Q{}", i), "B", i + 1);
    }
    builder = builder.racked("R2", "B", 10, "RACK").opener("R1", 100.0);
    for i in 0..6u32 {
        builder = builder.opener(&format!("Q{}", i), 60.0 + i as f64);
    }
    let meet = builder.opener("R2", 100.0).build();

    let wave = RackPlanner::default().plan(&meet, "RACK");
    assert!(wave.conflicts.is_empty());
    assert_eq!(wave.clusters.len(), 1);
    assert_eq!(wave.order(), vec!["R1", "R2"]);
}

#[test]
fn test_no_declared_next_attempt_is_empty_wave() {
    let meet = MeetBuilder::new()
        .racked("R1", "A", 1, "RACK")
        .racked("R2", "A", 2, "RACK")
        .build();

    let wave = RackPlanner::default().plan(&meet, "RACK");
    assert!(wave.is_empty());
    assert!(wave.conflicts.is_empty());
    assert_eq!(wave.unscheduled, vec!["R1", "R2"]);
}

#[test]
fn test_rack_reassignment_recomputes_groups() {
    let mut meet = MeetBuilder::new()
        .racked("R1", "A", 1, "RACK1")
        .racked("R2", "A", 2, "RACK1")
        .declare("R1", Discipline::Squat, 1, 100.0)
        .declare("R2", Discipline::Squat, 1, 110.0)
        .build();

    let planner = RackPlanner::default();
    assert_eq!(planner.plan(&meet, "RACK1").order(), vec!["R1", "R2"]);

    meet.set_rack("R2", Some("RACK2".to_string())).unwrap();
    assert_eq!(planner.plan(&meet, "RACK1").order(), vec!["R1"]);
    assert_eq!(planner.plan(&meet, "RACK2").order(), vec!["R2"]);

    let groups = planner.rack_groups(&meet);
    let ids: Vec<&str> = groups.iter().map(|g| g.rack_id.as_str()).collect();
    assert_eq!(ids, vec!["RACK1", "RACK2"]);
    assert_eq!(planner.plan_all(&meet).len(), 2);
}
