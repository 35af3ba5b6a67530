//! Layered configuration for the Meridian controller.
//!
//! # Usage
//!
//! ```rust,no_run
//! use meridian_config::Config;
//!
//! // defaults → system → user → explicit file → MERIDIAN_* env.
//! let resolved = Config::load(None).unwrap();
//! println!("log level: {}", resolved.config.logging.level);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`MERIDIAN_LOG_LEVEL`, `MERIDIAN_LOG_FORMAT`,
//!    `MERIDIAN_HANDLER_TIMEOUT_MS`, `MERIDIAN_DUPLICATE_SUBSCRIPTION`)
//! 2. **Explicit file** passed to [`Config::load`]
//! 3. **User** (`~/.meridian/config.toml`)
//! 4. **System** (`/etc/meridian/config.toml`)
//! 5. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! # Design
//!
//! This crate has no dependencies on other meridian crates. Conversion into
//! domain types happens in the consuming crates behind their `config`
//! features.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

use std::path::Path;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load a single file with no layering or environment overrides.
    ///
    /// # Errors
    ///
    /// See [`loader::load_file`].
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
