use std::path::PathBuf;
use tracing::Level;

/// Standalone server. Reads an optional config path from `TELEMETRY_CONFIG`;
/// the `telemetry` CLI offers the same via `telemetry serve`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let config_path = std::env::var("TELEMETRY_CONFIG").ok().map(PathBuf::from);
    let config = telemetry_config::load_config(config_path.as_deref()).await?;

    telemetry_server::serve(config).await
}
