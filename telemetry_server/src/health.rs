use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: u64,
    pub storage_backend: String,
    pub forwarding_enabled: bool,
}

impl HealthStatus {
    pub fn healthy(uptime_seconds: u64, storage_backend: &str, forwarding_enabled: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
            uptime_seconds,
            storage_backend: storage_backend.to_string(),
            forwarding_enabled,
        }
    }
}
