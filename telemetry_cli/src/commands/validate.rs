use crate::ui;
use anyhow::Result;
use std::path::PathBuf;
use telemetry_config::parse_config_from_file;

pub async fn execute(config_file: PathBuf) -> Result<()> {
    ui::print_header("Validating Configuration");
    println!("File: {}\n", config_file.display());

    match parse_config_from_file(&config_file).await {
        Ok(config) => {
            ui::print_success("Configuration is valid!");
            println!();
            ui::print_field("Listen", &config.server.bind_addr);
            ui::print_field("Data directory", config.server.data_dir.display());
            ui::print_field(
                "Flush interval",
                humantime::format_duration(config.aggregation.flush_interval),
            );
            ui::print_field("Forwarding enabled", config.forwarding.enabled);

            if config.forwarding.enabled && config.forwarding.api_key.is_empty() {
                ui::print_warning("Forwarding is enabled without an API key");
            }

            Ok(())
        }
        Err(e) => {
            ui::print_error("Configuration is invalid!");
            println!("\nError: {}", e);
            Err(e.into())
        }
    }
}
