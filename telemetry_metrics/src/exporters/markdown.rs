use crate::summary::{ChannelSummary, HistorySummary};
use anyhow::Result;
use std::path::Path;

pub struct MarkdownExporter;

impl MarkdownExporter {
    pub async fn export(
        summary: &HistorySummary,
        channels: &[ChannelSummary],
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let markdown = Self::format(summary, channels);
        tokio::fs::write(path, markdown).await?;
        Ok(())
    }

    pub fn format(summary: &HistorySummary, channels: &[ChannelSummary]) -> String {
        let mut report = format!(
            r#"# Telemetry History Report

## Aggregate Log

| Metric | Value |
|--------|-------|
| Aggregates | {} |
| First | {} |
| Last | {} |
| Span | {:.3}s |
| Min | {:.3} |
| Max | {:.3} |
| Mean | {:.3} |
| P50 | {:.3} |
| P95 | {:.3} |
| P99 | {:.3} |
"#,
            summary.count,
            format_timestamp(summary.first_timestamp),
            format_timestamp(summary.last_timestamp),
            summary.span_seconds(),
            summary.min,
            summary.max,
            summary.mean,
            summary.p50,
            summary.p95,
            summary.p99,
        );

        if !channels.is_empty() {
            report.push_str("\n## Raw Channels\n\n| Channel | Min | Max | Mean |\n|---------|-----|-----|------|\n");
            for channel in channels {
                report.push_str(&format!(
                    "| {} | {} | {} | {:.2} |\n",
                    channel.channel, channel.min, channel.max, channel.mean
                ));
            }
        }

        report
    }
}

fn format_timestamp(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "-".to_string();
    }
    let secs = seconds.floor();
    let nanos = ((seconds - secs) * 1_000_000_000.0) as u32;
    chrono::DateTime::from_timestamp(secs as i64, nanos)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| format!("{}", seconds))
}
