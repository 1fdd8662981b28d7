use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};

/// Number of channels a complete raw frame carries.
pub const CHANNEL_COUNT: usize = 8;

/// One frame of channel readings from the acquisition device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub raw_data: Vec<i64>,
    /// Capture time, seconds since epoch.
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RawSample {
    pub fn new(raw_data: Vec<i64>, timestamp: f64, session_id: Option<String>) -> Self {
        Self {
            raw_data,
            timestamp,
            session_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.raw_data.len() == CHANNEL_COUNT
    }

    pub fn check_shape(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(TelemetryError::ShapeMismatch {
                expected: CHANNEL_COUNT,
                actual: self.raw_data.len(),
            })
        }
    }

    /// Channel name/value pairs, `sensor_0` through `sensor_7`.
    pub fn named_channels(&self) -> impl Iterator<Item = (String, i64)> + '_ {
        self.raw_data
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("sensor_{}", i), *v))
    }
}

/// A single processed value headed for the windowed aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMetric {
    pub value: f64,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// The representative value of one closed window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishedAggregate {
    pub combined_average: f64,
    pub timestamp: f64,
    /// Values reduced into this aggregate. Not part of the wire or log format.
    #[serde(skip)]
    pub sample_count: u64,
}

impl PublishedAggregate {
    /// The value served before any window has closed.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Sum of the window that produced this aggregate.
    pub fn window_sum(&self) -> f64 {
        self.combined_average * self.sample_count as f64
    }
}

/// Inbound raw upload as it arrives from the transport layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUpload {
    #[serde(default)]
    pub raw_data: Vec<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Inbound processed upload as it arrives from the transport layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedUpload {
    #[serde(default)]
    pub combined_average: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ProcessedUpload {
    /// Produce a typed metric, rejecting uploads without a value.
    pub fn into_metric(self, received_at: f64) -> Result<ProcessedMetric> {
        let value = self.combined_average.ok_or_else(|| {
            TelemetryError::Validation("missing required field 'combined_average'".to_string())
        })?;

        if !value.is_finite() {
            return Err(TelemetryError::Validation(format!(
                "'combined_average' must be finite, got {}",
                value
            )));
        }

        Ok(ProcessedMetric {
            value,
            timestamp: self.timestamp.unwrap_or(received_at),
            session_id: self.session_id,
        })
    }
}
