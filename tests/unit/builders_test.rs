//! Tests for builder modules

use async_trait::async_trait;
use prometheus_sync_kit::builders::{build_object_pools, build_throttle_queues, build_toolkit};
use prometheus_sync_kit::config::ToolkitConfig;
use prometheus_sync_kit::{handler_fn, ItemHandler, SyncError, TokioSpawner};
use std::time::Duration;

struct Discard;

#[async_trait]
impl ItemHandler<String> for Discard {
    async fn handle(&self, _item: String) -> anyhow::Result<()> {
        Ok(())
    }
}

const CONFIG: &str = r#"{
    "semaphores": { "gpu": { "permits": 2 }, "disk": { "permits": 1 } },
    "schedulers": { "inference": { "max_concurrency": 3 } },
    "throttles": { "alerts": { "interval_ms": 20 } },
    "pools": { "buffers": { "max": 4, "initial": 1 } }
}"#;

#[tokio::test]
async fn test_build_toolkit_from_config() {
    let cfg = ToolkitConfig::from_json_str(CONFIG).unwrap();
    let toolkit = build_toolkit(&cfg, TokioSpawner::current().unwrap()).unwrap();

    assert_eq!(toolkit.semaphore("gpu").unwrap().available_permits(), 2);
    assert_eq!(toolkit.semaphore("disk").unwrap().available_permits(), 1);
    assert!(toolkit.semaphore("missing").is_none());

    let scheduler = toolkit.scheduler("inference").unwrap();
    assert_eq!(scheduler.max_concurrency(), 3);
    assert_eq!(scheduler.add(|| async { 5 }).await.unwrap(), 5);
}

#[tokio::test]
async fn test_build_throttle_queues_uses_factory() {
    let cfg = ToolkitConfig::from_json_str(CONFIG).unwrap();
    let queues = build_throttle_queues::<String, _, _, _>(
        &cfg,
        |_name, _cfg| Ok(handler_fn(|_msg: String| async { Ok(()) })),
        TokioSpawner::current().unwrap(),
    )
    .unwrap();

    assert_eq!(queues["alerts"].interval(), Duration::from_millis(20));
}

#[tokio::test]
async fn test_factory_error_propagates() {
    let cfg = ToolkitConfig::from_json_str(CONFIG).unwrap();
    let result = build_throttle_queues::<String, Discard, _, _>(
        &cfg,
        |name, _cfg| Err(SyncError::InvalidConfig(format!("no handler for `{name}`"))),
        TokioSpawner::current().unwrap(),
    );
    assert!(matches!(result, Err(SyncError::InvalidConfig(msg)) if msg.contains("alerts")));
}

#[test]
fn test_build_object_pools_applies_config() {
    let cfg = ToolkitConfig::from_json_str(CONFIG).unwrap();
    let pools = build_object_pools(&cfg, |_name, _cfg| Ok(|| vec![0_u8; 16])).unwrap();

    let buffers = &pools["buffers"];
    assert_eq!(buffers.max(), Some(4));
    assert_eq!(buffers.available(), 1);
}
