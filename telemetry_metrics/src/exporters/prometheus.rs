use telemetry_core::{PublishedAggregate, StatsSnapshot};

pub struct PrometheusExporter;

impl PrometheusExporter {
    /// Renders in-memory state only, so a scrape never touches the durable logs.
    pub fn format(stats: &StatsSnapshot, latest: &PublishedAggregate) -> String {
        format!(
            r#"# HELP telemetry_raw_received_total Raw uploads received
# TYPE telemetry_raw_received_total counter
telemetry_raw_received_total {}

# HELP telemetry_raw_persisted_total Raw samples appended to the raw log
# TYPE telemetry_raw_persisted_total counter
telemetry_raw_persisted_total {}

# HELP telemetry_raw_shape_rejected_total Raw samples not persisted due to channel count
# TYPE telemetry_raw_shape_rejected_total counter
telemetry_raw_shape_rejected_total {}

# HELP telemetry_processed_received_total Processed uploads received
# TYPE telemetry_processed_received_total counter
telemetry_processed_received_total {}

# HELP telemetry_processed_rejected_total Processed uploads rejected by validation
# TYPE telemetry_processed_rejected_total counter
telemetry_processed_rejected_total {}

# HELP telemetry_aggregates_published_total Windows closed and published
# TYPE telemetry_aggregates_published_total counter
telemetry_aggregates_published_total {}

# HELP telemetry_forwards_attempted_total Records dispatched to the forwarder
# TYPE telemetry_forwards_attempted_total counter
telemetry_forwards_attempted_total {}

# HELP telemetry_forwards_failed_total Forwarding attempts that failed or timed out
# TYPE telemetry_forwards_failed_total counter
telemetry_forwards_failed_total {}

# HELP telemetry_storage_failures_total Durable log appends that failed
# TYPE telemetry_storage_failures_total counter
telemetry_storage_failures_total {}

# HELP telemetry_latest_combined_average Most recently published window average
# TYPE telemetry_latest_combined_average gauge
telemetry_latest_combined_average {}

# HELP telemetry_latest_window_samples Submissions in the most recently published window
# TYPE telemetry_latest_window_samples gauge
telemetry_latest_window_samples {}

# HELP telemetry_latest_aggregate_timestamp_seconds Flush time of the most recently published window
# TYPE telemetry_latest_aggregate_timestamp_seconds gauge
telemetry_latest_aggregate_timestamp_seconds {}
"#,
            stats.raw_received,
            stats.raw_persisted,
            stats.raw_shape_rejected,
            stats.processed_received,
            stats.processed_rejected,
            stats.aggregates_published,
            stats.forwards_attempted,
            stats.forwards_failed,
            stats.storage_failures,
            latest.combined_average,
            latest.sample_count,
            latest.timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_contains_counters() {
        let stats = StatsSnapshot {
            raw_received: 7,
            forwards_failed: 2,
            ..Default::default()
        };
        let latest = PublishedAggregate {
            combined_average: 12.5,
            timestamp: 1700000000.5,
            sample_count: 3,
        };

        let text = PrometheusExporter::format(&stats, &latest);
        assert!(text.contains("telemetry_raw_received_total 7\n"));
        assert!(text.contains("telemetry_forwards_failed_total 2\n"));
        assert!(text.contains("telemetry_latest_combined_average 12.5\n"));
        assert!(text.contains("telemetry_latest_window_samples 3\n"));
        assert!(text.contains("telemetry_latest_aggregate_timestamp_seconds 1700000000.5\n"));
    }
}
