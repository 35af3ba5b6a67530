//! Test harness helpers.

use std::path::PathBuf;

use meridian_events::{Dispatcher, DispatcherConfig, EventContent};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Set up test logging with the given filter.
///
/// Output goes through the test writer so it is captured per test. Safe to
/// call from every test; only the first call installs a subscriber.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging at `warn`, which surfaces handler failures.
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

/// A started dispatcher with the given config.
///
/// # Panics
///
/// Panics if the dispatcher cannot be started.
#[must_use]
pub fn running_dispatcher(config: DispatcherConfig) -> Dispatcher {
    let dispatcher = Dispatcher::new(config);
    dispatcher.start().expect("fresh dispatcher must start");
    dispatcher
}

/// Build event content from a JSON object literal.
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
#[must_use]
pub fn content(value: serde_json::Value) -> EventContent {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("event content must be a JSON object, got {other}"),
    }
}

/// Create a temporary directory for testing.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a file within a temporary directory.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_file_in_dir(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write file");
    path
}
