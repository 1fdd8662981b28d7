use crate::{
    error::{Result, TelemetryError},
    forwarder::{ForwardRecord, Forwarder},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct HttpForwarderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for HttpForwarderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: "dev-api-key".to_string(),
            timeout: DEFAULT_FORWARD_TIMEOUT,
        }
    }
}

/// Posts records to `{base_url}/v1/sessions/{session_id}/samples`.
pub struct HttpForwarder {
    client: reqwest::Client,
    config: HttpForwarderConfig,
}

impl HttpForwarder {
    pub fn new(config: HttpForwarderConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self, session_id: &str) -> String {
        format!(
            "{}/v1/sessions/{}/samples",
            self.config.base_url.trim_end_matches('/'),
            session_id
        )
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, record: &ForwardRecord) -> Result<()> {
        let url = self.endpoint(&record.session_id);
        debug!("Forwarding record to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TelemetryError::Forwarding(format!(
                "ingest service returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
