use crate::{ui, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};
use telemetry_core::{CsvSampleLog, PublishedAggregate, RawSample, SampleLog};
use telemetry_metrics::{ChannelSummary, HistorySummary, JsonExporter, MarkdownExporter};

#[derive(Tabled)]
struct AggregateRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Combined Average")]
    combined_average: String,
}

impl From<&PublishedAggregate> for AggregateRow {
    fn from(aggregate: &PublishedAggregate) -> Self {
        Self {
            time: format_timestamp(aggregate.timestamp),
            combined_average: format!("{:.3}", aggregate.combined_average),
        }
    }
}

#[derive(Tabled)]
struct RawRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Readings")]
    readings: String,
}

impl From<&RawSample> for RawRow {
    fn from(sample: &RawSample) -> Self {
        let readings: Vec<String> = sample.raw_data.iter().map(|v| v.to_string()).collect();
        Self {
            time: format_timestamp(sample.timestamp),
            readings: readings.join(" "),
        }
    }
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl MetricRow {
    fn new(metric: &'static str, value: String) -> Self {
        Self { metric, value }
    }
}

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Min")]
    min: i64,
    #[tabled(rename = "Max")]
    max: i64,
    #[tabled(rename = "Mean")]
    mean: String,
}

impl From<&ChannelSummary> for ChannelRow {
    fn from(summary: &ChannelSummary) -> Self {
        Self {
            channel: summary.channel.clone(),
            min: summary.min,
            max: summary.max,
            mean: format!("{:.2}", summary.mean),
        }
    }
}

pub async fn execute(
    data_dir: PathBuf,
    raw: bool,
    summary: bool,
    format: OutputFormat,
    limit: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    if !data_dir.is_dir() {
        anyhow::bail!("Data directory not found: {}", data_dir.display());
    }

    let log = CsvSampleLog::open_in(&data_dir).await?;
    let aggregates = log.read_all_aggregate().await?;
    let raw_samples = if raw {
        log.read_all_raw().await?
    } else {
        Vec::new()
    };

    let report = if summary {
        let history_summary = HistorySummary::from_aggregates(&aggregates);
        let channels = ChannelSummary::from_raw(&raw_samples);
        render_summary(&history_summary, &channels, raw, format)?
    } else if raw {
        render_records::<_, RawRow>(newest(&raw_samples, limit), format)?
    } else {
        render_records::<_, AggregateRow>(newest(&aggregates, limit), format)?
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, report).await?;
            ui::print_success(&format!("Report written to {}", path.display()));
        }
        None => println!("{}", report),
    }

    Ok(())
}

fn newest<T>(records: &[T], limit: Option<usize>) -> &[T] {
    match limit {
        Some(limit) if limit < records.len() => &records[records.len() - limit..],
        _ => records,
    }
}

fn render_records<T, R>(records: &[T], format: OutputFormat) -> Result<String>
where
    T: Serialize,
    R: Tabled + for<'a> From<&'a T>,
{
    if records.is_empty() && format != OutputFormat::Json {
        return Ok("No records logged yet".to_string());
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        OutputFormat::Table => {
            let mut table = Table::new(records.iter().map(R::from));
            table.with(Style::modern());
            table.to_string()
        }
        OutputFormat::Markdown => {
            let mut table = Table::new(records.iter().map(R::from));
            table.with(Style::markdown());
            table.to_string()
        }
    };
    Ok(rendered)
}

fn render_summary(
    summary: &HistorySummary,
    channels: &[ChannelSummary],
    raw: bool,
    format: OutputFormat,
) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json if raw => serde_json::to_string_pretty(&serde_json::json!({
            "aggregates": summary,
            "channels": channels,
        }))?,
        OutputFormat::Json => JsonExporter::to_string(summary)?,
        OutputFormat::Markdown => MarkdownExporter::format(summary, channels),
        OutputFormat::Table => {
            let rows = vec![
                MetricRow::new("Aggregates", summary.count.to_string()),
                MetricRow::new("First", format_timestamp(summary.first_timestamp)),
                MetricRow::new("Last", format_timestamp(summary.last_timestamp)),
                MetricRow::new("Span", format!("{:.3}s", summary.span_seconds())),
                MetricRow::new("Min", format!("{:.3}", summary.min)),
                MetricRow::new("Max", format!("{:.3}", summary.max)),
                MetricRow::new("Mean", format!("{:.3}", summary.mean)),
                MetricRow::new("P50", format!("{:.3}", summary.p50)),
                MetricRow::new("P95", format!("{:.3}", summary.p95)),
                MetricRow::new("P99", format!("{:.3}", summary.p99)),
            ];
            let mut table = Table::new(rows);
            table.with(Style::modern());
            let mut rendered = table.to_string();

            if !channels.is_empty() {
                let mut channel_table = Table::new(channels.iter().map(ChannelRow::from));
                channel_table.with(Style::modern());
                rendered.push_str("\n\n");
                rendered.push_str(&channel_table.to_string());
            }
            rendered
        }
    };
    Ok(rendered)
}

fn format_timestamp(timestamp: f64) -> String {
    if timestamp <= 0.0 {
        return "-".to_string();
    }
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    chrono::DateTime::from_timestamp(secs as i64, nanos)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| format!("{:.3}", timestamp))
}
