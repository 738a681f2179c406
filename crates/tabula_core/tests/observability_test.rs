//! Tests for tracing initialization.

use tabula_core::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing("tabula=debug", false).expect("first install");
    init_tracing("tabula=debug", true).expect("second install is tolerated");
    tracing::info!(component = "test", "subscriber installed");
}
