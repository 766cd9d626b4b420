//! Tests for utility functions

use prometheus_sync_kit::util::{init_tracing, init_tracing_with_default};

#[test]
fn test_tracing_init_is_idempotent() {
    init_tracing_with_default("debug");
    // a second install must not panic
    init_tracing();
    tracing::debug!("subscriber installed");
}
