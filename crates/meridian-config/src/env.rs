//! `MERIDIAN_*` environment overrides.
//!
//! Environment variables are the last layer: a set variable replaces
//! whatever the files configured.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// How a variable's string value becomes a TOML value.
#[derive(Clone, Copy)]
enum EnvValue {
    String,
    Integer,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    value: EnvValue,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "MERIDIAN_LOG_LEVEL",
        field_path: "logging.level",
        value: EnvValue::String,
    },
    EnvMapping {
        var_name: "MERIDIAN_LOG_FORMAT",
        field_path: "logging.format",
        value: EnvValue::String,
    },
    EnvMapping {
        var_name: "MERIDIAN_HANDLER_TIMEOUT_MS",
        field_path: "dispatch.handler_timeout_ms",
        value: EnvValue::Integer,
    },
    EnvMapping {
        var_name: "MERIDIAN_DUPLICATE_SUBSCRIPTION",
        field_path: "dispatch.duplicate_subscription",
        value: EnvValue::String,
    },
];

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply every mapped `MERIDIAN_*` variable present in `env_vars`.
///
/// Returns the number of overrides applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if an integer variable does not parse.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        let value = match mapping.value {
            EnvValue::String => toml::Value::String(raw.trim().to_owned()),
            EnvValue::Integer => {
                let parsed = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| ConfigError::EnvError {
                        var_name: mapping.var_name.to_owned(),
                        message: format!("expected a non-negative integer, got '{raw}': {e}"),
                    })?;
                toml::Value::Integer(i64::from(parsed))
            },
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var override"
        );
        set_field(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Set a dotted path, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(leaf) = parts.pop() else {
        return;
    };

    let mut current = root;
    for part in parts {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(part.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}
