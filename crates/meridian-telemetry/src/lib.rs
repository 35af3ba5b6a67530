//! Meridian Telemetry - Logging setup for the Meridian SDN controller.
//!
//! Wraps `tracing-subscriber` with a serializable [`LogConfig`]: level and
//! per-crate directives, output format, and an stdout, stderr, or
//! daily-rotated file target.
//!
//! # Example
//!
//! ```rust,no_run
//! use meridian_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), meridian_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("meridian_events=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("controller starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

#[cfg(feature = "config")]
mod config_bridge;
mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
