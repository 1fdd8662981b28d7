use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use telemetry_core::forwarder::http::DEFAULT_FORWARD_TIMEOUT;
use telemetry_core::storage::{AGGREGATE_LOG_FILE, RAW_LOG_FILE};
use telemetry_core::{HttpForwarderConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_SESSION_ID};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub raw_log_file: String,
    pub aggregate_log_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5050".to_string(),
            data_dir: PathBuf::from("data"),
            raw_log_file: RAW_LOG_FILE.to_string(),
            aggregate_log_file: AGGREGATE_LOG_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(with = "humantime_serde", default = "default_flush_interval")]
    pub flush_interval: Duration,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

fn default_flush_interval() -> Duration {
    DEFAULT_FLUSH_INTERVAL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_session_id")]
    pub default_session_id: String,
    #[serde(with = "humantime_serde", default = "default_forward_timeout")]
    pub timeout: Duration,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            api_key: default_api_key(),
            default_session_id: default_session_id(),
            timeout: DEFAULT_FORWARD_TIMEOUT,
        }
    }
}

fn default_base_url() -> String {
    HttpForwarderConfig::default().base_url
}

fn default_api_key() -> String {
    HttpForwarderConfig::default().api_key
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

fn default_forward_timeout() -> Duration {
    DEFAULT_FORWARD_TIMEOUT
}

impl ForwardingConfig {
    pub fn to_forwarder_config(&self) -> HttpForwarderConfig {
        HttpForwarderConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: self.timeout,
        }
    }
}

/// TOML layout with everything under a `[service]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigFile {
    pub service: ServiceConfig,
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    pub fn bind_socket_addr(&self) -> Result<SocketAddr, String> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| format!("Invalid bind address '{}': {}", self.server.bind_addr, e))
    }

    pub fn raw_log_path(&self) -> PathBuf {
        self.server.data_dir.join(&self.server.raw_log_file)
    }

    pub fn aggregate_log_path(&self) -> PathBuf {
        self.server.data_dir.join(&self.server.aggregate_log_file)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.bind_socket_addr()?;

        if self.server.data_dir.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }

        if self.server.raw_log_file.is_empty() || self.server.aggregate_log_file.is_empty() {
            return Err("Log file names cannot be empty".to_string());
        }

        if self.server.raw_log_file == self.server.aggregate_log_file {
            return Err("Raw and aggregate logs must be different files".to_string());
        }

        if self.aggregation.flush_interval.is_zero() {
            return Err("Flush interval must be > 0".to_string());
        }

        if self.forwarding.timeout.is_zero() {
            return Err("Forwarding timeout must be > 0".to_string());
        }

        if self.forwarding.enabled {
            if self.forwarding.base_url.is_empty() {
                return Err("Forwarding is enabled but base_url is empty".to_string());
            }
            if self.forwarding.api_key.is_empty() {
                return Err("Forwarding is enabled but api_key is empty".to_string());
            }
            if self.forwarding.default_session_id.is_empty() {
                return Err("Forwarding is enabled but default_session_id is empty".to_string());
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct ServiceConfigBuilder {
    bind_addr: Option<String>,
    data_dir: Option<PathBuf>,
    flush_interval: Option<Duration>,
    forwarding: Option<ForwardingConfig>,
}

impl ServiceConfigBuilder {
    pub fn bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = Some(bind_addr.into());
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = Some(flush_interval);
        self
    }

    pub fn forwarding(mut self, forwarding: ForwardingConfig) -> Self {
        self.forwarding = Some(forwarding);
        self
    }

    pub fn build(self) -> ServiceConfig {
        let mut config = ServiceConfig::default();

        if let Some(bind_addr) = self.bind_addr {
            config.server.bind_addr = bind_addr;
        }
        if let Some(data_dir) = self.data_dir {
            config.server.data_dir = data_dir;
        }
        if let Some(flush_interval) = self.flush_interval {
            config.aggregation.flush_interval = flush_interval;
        }
        if let Some(forwarding) = self.forwarding {
            config.forwarding = forwarding;
        }

        config
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:5050");
        assert_eq!(config.aggregation.flush_interval, Duration::from_millis(500));
        assert_eq!(config.forwarding.timeout, Duration::from_secs(3));
        assert!(!config.forwarding.enabled);
        assert_eq!(config.raw_log_path(), PathBuf::from("data/raw_data.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ServiceConfig::builder()
            .bind_addr("127.0.0.1:6000")
            .data_dir("/var/lib/telemetry")
            .flush_interval(Duration::from_secs(1))
            .build();

        assert_eq!(config.bind_socket_addr().unwrap().port(), 6000);
        assert_eq!(
            config.aggregate_log_path(),
            PathBuf::from("/var/lib/telemetry/processed_data.csv")
        );
        assert_eq!(config.aggregation.flush_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_validation() {
        let invalid = ServiceConfig::builder().bind_addr("not-an-address").build();
        assert!(invalid.validate().is_err());

        let invalid = ServiceConfig::builder().flush_interval(Duration::ZERO).build();
        assert!(invalid.validate().is_err());

        let invalid = ServiceConfig::builder()
            .forwarding(ForwardingConfig {
                enabled: true,
                api_key: String::new(),
                ..Default::default()
            })
            .build();
        assert!(invalid.validate().is_err());

        let valid = ServiceConfig::builder()
            .forwarding(ForwardingConfig {
                enabled: true,
                ..Default::default()
            })
            .build();
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_forwarder_config_conversion() {
        let forwarding = ForwardingConfig {
            base_url: "https://ingest.example.com".to_string(),
            timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let http = forwarding.to_forwarder_config();
        assert_eq!(http.base_url, "https://ingest.example.com");
        assert_eq!(http.timeout, Duration::from_secs(1));
        assert_eq!(http.api_key, "dev-api-key");
    }
}
