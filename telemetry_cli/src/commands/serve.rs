use crate::ui;
use anyhow::{Context, Result};
use std::path::PathBuf;
use telemetry_config::load_config;
use tracing::info;

pub async fn execute(
    config_file: Option<PathBuf>,
    bind: Option<String>,
    data_dir: Option<PathBuf>,
    flush_interval: Option<String>,
) -> Result<()> {
    let mut config = load_config(config_file.as_deref()).await?;

    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    if let Some(data_dir) = data_dir {
        config.server.data_dir = data_dir;
    }
    if let Some(interval) = flush_interval {
        config.aggregation.flush_interval = humantime::parse_duration(&interval)
            .with_context(|| format!("Invalid flush interval: {}", interval))?;
    }
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    ui::print_header("Telemetry Service");
    ui::print_field("Listen", &config.server.bind_addr);
    ui::print_field("Raw log", config.raw_log_path().display());
    ui::print_field("Aggregate log", config.aggregate_log_path().display());
    ui::print_field(
        "Flush interval",
        humantime::format_duration(config.aggregation.flush_interval),
    );
    if config.forwarding.enabled {
        ui::print_field("Forwarding", &config.forwarding.base_url);
    } else {
        ui::print_field("Forwarding", "disabled");
    }
    println!();

    info!("Configuration resolved, starting service");
    telemetry_server::serve(config).await
}
