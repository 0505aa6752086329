//! Environment configuration
//!
//! Settings come from process environment variables, optionally seeded from
//! an environment file. Call `load_environment()` once at startup, then
//! build a [`SessionConfig`] with [`SessionConfig::from_env`].
//!
//! ```no_run
//! use bluez_core::config::{load_environment, SessionConfig};
//!
//! load_environment();
//! let config = SessionConfig::from_env();
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::{BusType, SERVICE_NAME};

/// Environment files checked in order of priority
pub const ENV_FILE_PATHS: &[&str] = &["/etc/bluez-objects/environment", ".env"];

pub const ENV_FILE_VAR: &str = "BLUEZ_ENV_FILE";
pub const BUS_VAR: &str = "BLUEZ_BUS";
pub const SERVICE_VAR: &str = "BLUEZ_SERVICE";
pub const TIMEOUT_VAR: &str = "BLUEZ_CONNECT_TIMEOUT_MS";
pub const RETRIES_VAR: &str = "BLUEZ_CONNECT_RETRIES";
/// Adapter pattern used by the demo entry point
pub const ADAPTER_VAR: &str = "BLUEZ_ADAPTER";

/// Every `BLUEZ_*` variable this workspace reads
pub const KNOWN_VARS: &[&str] = &[
    ENV_FILE_VAR,
    BUS_VAR,
    SERVICE_VAR,
    TIMEOUT_VAR,
    RETRIES_VAR,
    ADAPTER_VAR,
];

/// Outcome of loading one environment file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedEnv {
    pub path: String,
    /// Keys set from the file
    pub loaded: Vec<String>,
    /// Keys left alone because the process already had them
    pub skipped: Vec<String>,
}

/// Load variables from the first environment file found.
///
/// `BLUEZ_ENV_FILE` wins over the default locations. Variables already set
/// in the process environment are never overridden.
pub fn load_environment() -> Option<LoadedEnv> {
    if let Ok(custom_path) = std::env::var(ENV_FILE_VAR) {
        if let Some(env) = try_load_env_file(&custom_path) {
            return Some(env);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(env) = try_load_env_file(path) {
            return Some(env);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<LoadedEnv> {
    let path_obj = Path::new(path);
    if !path_obj.exists() {
        return None;
    }

    let content = match fs::read_to_string(path_obj) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            return None;
        }
    };

    let mut env = LoadedEnv {
        path: path.to_string(),
        ..LoadedEnv::default()
    };

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = parse_env_line(line) else {
            warn!(path, line, "Skipping unparseable environment line");
            continue;
        };
        if key.starts_with("BLUEZ_") && !KNOWN_VARS.contains(&key.as_str()) {
            warn!(path, %key, "Unknown BLUEZ_* setting");
        }
        if std::env::var(&key).is_err() {
            std::env::set_var(&key, &value);
            env.loaded.push(key);
        } else {
            env.skipped.push(key);
        }
    }

    let bluez_keys: Vec<&str> = env
        .loaded
        .iter()
        .map(String::as_str)
        .filter(|k| k.starts_with("BLUEZ_"))
        .collect();
    info!(
        path,
        loaded = env.loaded.len(),
        skipped = ?env.skipped,
        bluez = ?bluez_keys,
        "Loaded environment file"
    );
    Some(env)
}

/// Parse `KEY=VALUE`, `KEY="VALUE"` or `KEY='VALUE'`.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get a configuration value with a default
pub fn get_config(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an optional configuration value; empty counts as unset.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an integer configuration value; unparseable counts as unset
pub fn get_config_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Settings for opening a [`crate::BusSession`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bus the Bluetooth daemon lives on
    pub bus_type: BusType,
    /// Well-known name handles are addressed to
    pub service: String,
    /// Per-attempt connect timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum connect attempts
    pub max_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bus_type: BusType::System,
            service: SERVICE_NAME.to_string(),
            timeout_ms: 30000,
            max_retries: 3,
        }
    }
}

impl SessionConfig {
    /// Read `BLUEZ_*` variables, falling back to defaults for unset or
    /// unparseable values
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bus_type = match get_config_opt(BUS_VAR) {
            Some(raw) => raw.parse::<BusType>().unwrap_or_else(|e| {
                warn!("Ignoring {}: {}", BUS_VAR, e);
                defaults.bus_type
            }),
            None => defaults.bus_type,
        };

        Self {
            bus_type,
            service: get_config(SERVICE_VAR, &defaults.service),
            timeout_ms: get_config_int(TIMEOUT_VAR, defaults.timeout_ms as i64).max(1) as u64,
            max_retries: u32::try_from(
                get_config_int(RETRIES_VAR, defaults.max_retries as i64).max(1),
            )
            .unwrap_or(u32::MAX),
        }
    }
}
