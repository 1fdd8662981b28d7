use serde::{Deserialize, Serialize};
use telemetry_core::{PublishedAggregate, RawSample, CHANNEL_COUNT};

/// Descriptive statistics over the aggregate log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
}

impl HistorySummary {
    pub fn from_aggregates(history: &[PublishedAggregate]) -> Self {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Self::default();
        };

        let mut values: Vec<f64> = history.iter().map(|a| a.combined_average).collect();
        values.sort_by(f64::total_cmp);

        Self {
            count: values.len(),
            min: values[0],
            max: values[values.len() - 1],
            mean: mean(&values),
            p50: percentile(&values, 0.50),
            p95: percentile(&values, 0.95),
            p99: percentile(&values, 0.99),
            first_timestamp: first.timestamp,
            last_timestamp: last.timestamp,
        }
    }

    /// Seconds between the first and last logged aggregate.
    pub fn span_seconds(&self) -> f64 {
        (self.last_timestamp - self.first_timestamp).max(0.0)
    }
}

/// Per-channel statistics over the raw log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

impl ChannelSummary {
    pub fn from_raw(history: &[RawSample]) -> Vec<Self> {
        if history.is_empty() {
            return Vec::new();
        }

        (0..CHANNEL_COUNT)
            .map(|channel| {
                let readings: Vec<i64> = history
                    .iter()
                    .filter_map(|s| s.raw_data.get(channel).copied())
                    .collect();

                let sum: i64 = readings.iter().sum();
                Self {
                    channel: format!("sensor_{}", channel),
                    min: readings.iter().copied().min().unwrap_or(0),
                    max: readings.iter().copied().max().unwrap_or(0),
                    mean: if readings.is_empty() {
                        0.0
                    } else {
                        sum as f64 / readings.len() as f64
                    },
                }
            })
            .collect()
    }
}

fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let index = ((sorted.len() as f64) * percentile) as usize;
    let index = index.min(sorted.len() - 1);
    sorted[index]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
