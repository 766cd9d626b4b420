//! Tests for error types

use prometheus_sync_kit::SyncError;
use std::time::Duration;

#[test]
fn test_invalid_config_error() {
    let err = SyncError::InvalidConfig("max_concurrency must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_concurrency must be greater than 0"
    );
}

#[test]
fn test_misuse_error() {
    let err = SyncError::Misuse("release_read without a held read lock".to_string());
    assert_eq!(format!("{}", err), "misuse: release_read without a held read lock");
}

#[test]
fn test_timed_out_error() {
    let err = SyncError::TimedOut(Duration::from_millis(250));
    assert_eq!(format!("{}", err), "timed out after 250ms");
}

#[test]
fn test_task_panicked_error() {
    let err = SyncError::TaskPanicked("index out of bounds".to_string());
    assert_eq!(format!("{}", err), "task panicked: index out of bounds");
}

#[test]
fn test_errors_convert_into_anyhow() {
    fn load() -> anyhow::Result<()> {
        Err(SyncError::Closed)?;
        Ok(())
    }
    let err = load().unwrap_err();
    assert_eq!(err.downcast_ref::<SyncError>(), Some(&SyncError::Closed));
}
