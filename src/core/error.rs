//! Error types for synchronization primitives.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by the primitives and their configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Construction parameters or configuration values are invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An operation was called in a state where it makes no sense,
    /// e.g. releasing a lock mode that is not held.
    #[error("misuse: {0}")]
    Misuse(String),
    /// A timed acquisition did not complete before its deadline.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    /// A scheduled task panicked while running.
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    /// The completion side of a waiter went away without delivering.
    #[error("wait handle closed")]
    Closed,
    /// No async runtime was available to drive background work.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Best-effort rendering of a panic payload.
pub(crate) fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_panic_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(describe_panic(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(describe_panic(boxed.as_ref()), "owned boom");

        let boxed: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(describe_panic(boxed.as_ref()), "non-string panic payload");
    }
}
