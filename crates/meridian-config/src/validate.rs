//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest accepted handler timeout (one hour).
const MAX_HANDLER_TIMEOUT_MS: u64 = 3_600_000;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_dispatch(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_dispatch(config: &Config) -> ConfigResult<()> {
    if let Some(ms) = config.dispatch.handler_timeout_ms {
        if ms == 0 {
            return Err(ConfigError::ValidationError {
                field: "dispatch.handler_timeout_ms".to_owned(),
                message: "timeout must be positive; omit the key to disable it".to_owned(),
            });
        }
        if ms > MAX_HANDLER_TIMEOUT_MS {
            return Err(ConfigError::ValidationError {
                field: "dispatch.handler_timeout_ms".to_owned(),
                message: format!(
                    "timeout {ms}ms exceeds the maximum of {MAX_HANDLER_TIMEOUT_MS}ms"
                ),
            });
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    let valid_targets = ["stdout", "stderr", "file"];
    if !valid_targets.contains(&logging.target.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.target".to_owned(),
            message: format!(
                "unsupported log target '{}'; expected one of: {}",
                logging.target,
                valid_targets.join(", ")
            ),
        });
    }

    if logging.target == "file" && logging.directory.as_deref().is_none_or(str::is_empty) {
        return Err(ConfigError::ValidationError {
            field: "logging.directory".to_owned(),
            message: "a directory is required when logging to a file".to_owned(),
        });
    }

    Ok(())
}
