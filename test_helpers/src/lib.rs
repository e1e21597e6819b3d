//! Shared helpers for tests across the workspace.

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Enables debug logging for tests that want to see what the coordinator is
/// doing. Safe to call multiple times; only the first call installs the
/// subscriber.
pub fn maybe_start_logging() {
    if std::env::var("TEST_LOG").is_ok() {
        INIT_LOGGING.call_once(|| {
            tracing_log::LogTracer::init().ok();
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .init();
        });
    }
}

/// Asserts that `err` renders (via `Display`) to a string containing `expected`.
#[track_caller]
pub fn assert_error_contains<E: std::fmt::Display>(err: &E, expected: &str) {
    let rendered = err.to_string();
    assert!(
        rendered.contains(expected),
        "expected error to contain {:?}, got {:?}",
        expected,
        rendered
    );
}
