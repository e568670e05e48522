// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: config_kv 覆写、非法值报错、快照导出
// ==========================================


use powertrack_engine::config::{
    config_keys, ConfigError, ConfigManager, EngineConfig, EngineConfigReader,
};
use powertrack_engine::domain::WeightUnit;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, insert_config, open_test_connection};

#[test]
fn test_empty_table_yields_defaults() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();

    let config = manager.load_engine_config().unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(manager.get_config_snapshot().unwrap(), "{}");
}

#[test]
fn test_overrides_applied_over_defaults() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    insert_config(&conn, config_keys::PACE_EWMA_ALPHA, "0.5").unwrap();
    insert_config(&conn, config_keys::RACK_CONFLICT_BUFFER, "4").unwrap();
    insert_config(&conn, config_keys::PLATE_UNIT, "LB").unwrap();
    insert_config(&conn, config_keys::PLATE_BAR_WEIGHT, " 45 ").unwrap();
    insert_config(&conn, config_keys::FEED_QUEUE_CAPACITY, "32").unwrap();

    let manager = ConfigManager::new(&db_path).unwrap();
    let config = manager.load_engine_config().unwrap();

    assert_eq!(config.pace.ewma_alpha, 0.5);
    assert_eq!(config.rack.conflict_buffer, 4);
    assert_eq!(config.plates.unit, WeightUnit::Lb);
    assert_eq!(config.plates.bar_weight, 45.0);
    assert_eq!(config.feed.queue_capacity, 32);
    // 未覆写的键保持默认
    assert_eq!(config.countdown.final_call_attempts, 3);
    assert_eq!(config.rack.urgent_attempts_out, 1);
}

#[test]
fn test_unparseable_value_is_error() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    insert_config(&conn, config_keys::ALERT_CRITICAL, "five").unwrap();

    let manager = ConfigManager::new(&db_path).unwrap();
    match manager.load_engine_config() {
        Err(ConfigError::InvalidValue { key, value, .. }) => {
            assert_eq!(key, config_keys::ALERT_CRITICAL);
            assert_eq!(value, "five");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_out_of_range_values_rejected() {
    let cases = [
        (config_keys::PACE_EWMA_ALPHA, "0"),
        (config_keys::PACE_EWMA_ALPHA, "1.5"),
        (config_keys::PACE_DEFAULT_SECONDS, "-10"),
        (config_keys::PLATE_TOLERANCE, "-0.1"),
        (config_keys::FEED_QUEUE_CAPACITY, "0"),
        (config_keys::PLATE_UNIT, "stone"),
    ];

    for (key, value) in cases {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        insert_config(&conn, key, value).unwrap();

        let manager = ConfigManager::new(&db_path).unwrap();
        let result = manager.load_engine_config();
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { key: ref k, .. }) if k == key),
            "{}={} 应被拒绝",
            key,
            value
        );
    }
}

#[test]
fn test_set_value_upserts_and_snapshot_lists_keys() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();

    manager.set_global_config_value(config_keys::RACK_CONFLICT_BUFFER, "3").unwrap();
    manager.set_global_config_value(config_keys::RACK_CONFLICT_BUFFER, "5").unwrap();
    manager.set_global_config_value(config_keys::PLATE_UNIT, "kg").unwrap();

    assert_eq!(
        manager.get_global_config_value(config_keys::RACK_CONFLICT_BUFFER).unwrap(),
        Some("5".to_string())
    );
    assert_eq!(manager.get_global_config_value("missing.key").unwrap(), None);

    let snapshot: serde_json::Value =
        serde_json::from_str(&manager.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot["rack.conflict_buffer"], "5");
    assert_eq!(snapshot["plates.unit"], "kg");
    assert_eq!(snapshot.as_object().unwrap().len(), 2);
}

#[test]
fn test_from_connection_creates_table() {
    let conn = Connection::open_in_memory().unwrap();
    let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap();
    manager.set_global_config_value(config_keys::PACE_MIN_SAMPLES, "5").unwrap();
    assert_eq!(manager.load_engine_config().unwrap().pace.min_samples, 5);
}

#[tokio::test]
async fn test_reader_trait_object() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    insert_config(&conn, config_keys::ETA_BUFFER_PERCENT, "35").unwrap();

    let reader: Arc<dyn EngineConfigReader> = Arc::new(ConfigManager::new(&db_path).unwrap());
    let config = reader.load_engine_config().await.unwrap();
    assert_eq!(config.countdown.eta_buffer_percent, 35.0);

    let snapshot = reader.get_config_snapshot().await.unwrap();
    assert!(snapshot.contains("countdown.eta_buffer_percent"));
}
