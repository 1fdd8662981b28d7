use crate::config::ServiceConfig;
use crate::error::{ConfigError, Result};
use tracing::debug;

pub const ENV_BIND_ADDR: &str = "TELEMETRY_BIND_ADDR";
pub const ENV_DATA_DIR: &str = "TELEMETRY_DATA_DIR";
pub const ENV_API_BASE: &str = "TELEMETRY_API_BASE";
pub const ENV_API_KEY: &str = "TELEMETRY_API_KEY";
pub const ENV_SESSION_ID: &str = "TELEMETRY_SESSION_ID";
pub const ENV_FORWARDING_ENABLED: &str = "TELEMETRY_FORWARDING_ENABLED";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut ServiceConfig) -> Result<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary key lookup. Empty values are ignored.
pub fn apply_overrides_from<F>(config: &mut ServiceConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key).filter(|v| !v.trim().is_empty()).map(|v| {
            debug!("Config override from {}", key);
            v
        })
    };

    if let Some(v) = get(ENV_BIND_ADDR) {
        config.server.bind_addr = v;
    }
    if let Some(v) = get(ENV_DATA_DIR) {
        config.server.data_dir = v.into();
    }
    if let Some(v) = get(ENV_API_BASE) {
        config.forwarding.base_url = v;
    }
    if let Some(v) = get(ENV_API_KEY) {
        config.forwarding.api_key = v;
    }
    if let Some(v) = get(ENV_SESSION_ID) {
        config.forwarding.default_session_id = v;
    }
    if let Some(v) = get(ENV_FORWARDING_ENABLED) {
        config.forwarding.enabled = parse_bool(&v).ok_or_else(|| {
            ConfigError::Invalid(format!("{} must be a boolean, got '{}'", ENV_FORWARDING_ENABLED, v))
        })?;
    }

    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
