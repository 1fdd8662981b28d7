use crate::config::{ServiceConfig, ServiceConfigFile};
use crate::env::apply_env_overrides;
use crate::error::{ConfigError, Result};
use std::path::Path;
use tracing::info;

pub async fn parse_config_from_file(path: impl AsRef<Path>) -> Result<ServiceConfig> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    parse_config_from_str(&contents, extension)
}

pub fn parse_config_from_str(content: &str, format: &str) -> Result<ServiceConfig> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => parse_yaml(content),
        "toml" => parse_toml(content),
        "json" => parse_json(content),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Resolve the effective configuration: file (or defaults), then environment
/// overrides, then validation.
pub async fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            parse_config_from_file(path).await?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

fn parse_yaml(content: &str) -> Result<ServiceConfig> {
    let config: ServiceConfig =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

fn parse_toml(content: &str) -> Result<ServiceConfig> {
    // Accept both a `[service]` wrapper table and a flat layout.
    let table: toml::Table =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let config = if table.contains_key("service") {
        toml::from_str::<ServiceConfigFile>(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?
            .service
    } else {
        toml::from_str::<ServiceConfig>(content).map_err(|e| ConfigError::Parse(e.to_string()))?
    };
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

fn parse_json(content: &str) -> Result<ServiceConfig> {
    let config: ServiceConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
