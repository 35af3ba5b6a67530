//! Configuration struct definitions.
//!
//! Every section implements [`Default`] matching the embedded
//! `defaults.toml`, so a partially specified file deserializes cleanly.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event dispatch settings.
    pub dispatch: DispatchSection,
    /// Logging level, format, destination, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// DispatchSection
// ---------------------------------------------------------------------------

/// Event dispatcher settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Per-delivery handler timeout in milliseconds. `None` waits
    /// indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_timeout_ms: Option<u64>,
    /// What to do when a handler subscribes twice to the same kind.
    pub duplicate_subscription: DuplicateSubscription,
}

/// Duplicate subscription policy as written in config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateSubscription {
    /// Return the existing subscription handle.
    #[default]
    Idempotent,
    /// Fail the second subscription.
    Reject,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Destination: `"stdout"`, `"stderr"`, or `"file"`.
    pub target: String,
    /// Log directory, required when `target = "file"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Per-crate tracing directives (e.g. `["meridian_events=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            directives: Vec::new(),
        }
    }
}
