pub mod config;
pub mod env;
pub mod error;
pub mod parser;

pub use config::{AggregationConfig, ForwardingConfig, ServerConfig, ServiceConfig, ServiceConfigFile};
pub use env::apply_env_overrides;
pub use error::{ConfigError, Result};
pub use parser::{load_config, parse_config_from_file, parse_config_from_str};
