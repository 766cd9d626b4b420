//! Tests for configuration validation

use prometheus_sync_kit::config::{
    ObjectPoolConfig, SchedulerConfig, SemaphoreConfig, ThrottleConfig, ToolkitConfig,
};
use prometheus_sync_kit::SyncError;
use std::time::Duration;

const SAMPLE: &str = r#"{
    "semaphores": { "gpu": { "permits": 2 } },
    "schedulers": { "inference": { "max_concurrency": 4 } },
    "throttles": { "notifications": { "interval_ms": 250 } },
    "pools": { "buffers": { "max": 8, "initial": 2 } }
}"#;

#[test]
fn test_toolkit_config_parses_all_sections() {
    let cfg = ToolkitConfig::from_json_str(SAMPLE).unwrap();
    assert_eq!(cfg.semaphores["gpu"], SemaphoreConfig { permits: 2 });
    assert_eq!(cfg.schedulers["inference"].max_concurrency, 4);
    assert_eq!(
        cfg.throttles["notifications"].interval(),
        Duration::from_millis(250)
    );
    assert_eq!(
        cfg.pools["buffers"],
        ObjectPoolConfig {
            max: Some(8),
            initial: 2,
        }
    );
}

#[test]
fn test_missing_fields_take_defaults() {
    let cfg = ToolkitConfig::from_json_str(
        r#"{ "schedulers": { "s": {} }, "throttles": { "t": {} }, "pools": { "p": {} } }"#,
    )
    .unwrap();
    assert_eq!(cfg.schedulers["s"], SchedulerConfig::default());
    assert_eq!(cfg.throttles["t"], ThrottleConfig::default());
    assert_eq!(cfg.pools["p"].max, None);
    assert_eq!(cfg.pools["p"].initial, 0);
}

#[test]
fn test_empty_config_rejected() {
    let err = ToolkitConfig::from_json_str("{}").unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));
}

#[test]
fn test_zero_concurrency_rejected_with_name() {
    let raw = r#"{ "schedulers": { "stuck": { "max_concurrency": 0 } } }"#;
    let err = ToolkitConfig::from_json_str(raw).unwrap_err();
    match err {
        SyncError::InvalidConfig(msg) => assert!(msg.contains("stuck")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_pool_initial_above_max_rejected() {
    let cfg = ToolkitConfig {
        pools: [(
            "tight".to_string(),
            ObjectPoolConfig {
                max: Some(1),
                initial: 3,
            },
        )]
        .into_iter()
        .collect(),
        ..ToolkitConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_malformed_json_rejected() {
    let raw = r#"{ "semaphores": { "gpu": { "permits": -1 } } }"#;
    let err = ToolkitConfig::from_json_str(raw).unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));
}

#[test]
fn test_from_file_round_trip() {
    let path = std::env::temp_dir().join(format!("sync-kit-config-{}.json", std::process::id()));
    std::fs::write(&path, SAMPLE).unwrap();

    let cfg = ToolkitConfig::from_file(&path).unwrap();
    assert_eq!(cfg.semaphores.len(), 1);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_from_file_missing_reports_path() {
    let err = ToolkitConfig::from_file("/nonexistent/sync-kit.json").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/sync-kit.json"));
}
