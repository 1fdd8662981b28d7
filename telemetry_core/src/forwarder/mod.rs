pub mod http;

use crate::{
    error::Result,
    sample::{ProcessedMetric, PublishedAggregate, RawSample},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use http::{HttpForwarder, HttpForwarderConfig};

/// Body relayed to the external ingest service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub session_id: String,
    pub device_timestamp_ms: i64,
    pub values: BTreeMap<String, f64>,
}

impl ForwardRecord {
    pub fn from_raw(sample: &RawSample, default_session_id: &str) -> Self {
        Self {
            session_id: session_or_default(sample.session_id.as_deref(), default_session_id),
            device_timestamp_ms: seconds_to_millis(sample.timestamp),
            values: sample
                .named_channels()
                .map(|(name, value)| (name, value as f64))
                .collect(),
        }
    }

    /// `closing` is the metric whose submission closed the window; its device
    /// timestamp and session id label the forwarded aggregate.
    pub fn from_aggregate(
        aggregate: &PublishedAggregate,
        closing: &ProcessedMetric,
        default_session_id: &str,
    ) -> Self {
        Self {
            session_id: session_or_default(closing.session_id.as_deref(), default_session_id),
            device_timestamp_ms: seconds_to_millis(closing.timestamp),
            values: BTreeMap::from([(
                "combined_average".to_string(),
                aggregate.combined_average,
            )]),
        }
    }
}

fn session_or_default(session_id: Option<&str>, default_session_id: &str) -> String {
    session_id
        .filter(|s| !s.is_empty())
        .unwrap_or(default_session_id)
        .to_string()
}

fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Best-effort relay of ingested samples to an external system.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, record: &ForwardRecord) -> Result<()>;

    fn name(&self) -> &str;
}

pub type DynForwarder = Arc<dyn Forwarder>;
