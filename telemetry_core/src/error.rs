use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A processed upload arrived without its aggregate value.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Shape mismatch: expected {expected} channels, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Forwarding failed: {0}")]
    Forwarding(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TelemetryError {
    /// Errors that must fail the ingestion request rather than be recovered locally.
    pub fn is_storage(&self) -> bool {
        matches!(self, TelemetryError::Storage(_) | TelemetryError::Csv(_))
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::Forwarding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
