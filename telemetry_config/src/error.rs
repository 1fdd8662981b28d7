use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unsupported file format '{0}'. Use .yaml, .yml, .toml, or .json")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
