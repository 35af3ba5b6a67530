//! Conversion from the unified config's `[logging]` section.

use std::path::PathBuf;

use meridian_config::LoggingSection;

use crate::error::{TelemetryError, TelemetryResult};
use crate::logging::{LogConfig, LogTarget};

impl TryFrom<&LoggingSection> for LogConfig {
    type Error = TelemetryError;

    fn try_from(section: &LoggingSection) -> TelemetryResult<Self> {
        let target = match section.target.as_str() {
            "stdout" => LogTarget::Stdout,
            "stderr" => LogTarget::Stderr,
            "file" => {
                let dir = section.directory.as_deref().ok_or_else(|| {
                    TelemetryError::ConfigError(
                        "logging.directory is required when logging to a file".to_string(),
                    )
                })?;
                LogTarget::File(PathBuf::from(dir))
            },
            other => {
                return Err(TelemetryError::ConfigError(format!(
                    "unknown log target '{other}'"
                )));
            },
        };

        let mut config = LogConfig::new(section.level.clone())
            .with_format(section.format.parse()?)
            .with_target(target);
        config.directives.clone_from(&section.directives);
        Ok(config)
    }
}
