mod commands;
mod ui;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "telemetry")]
#[command(about = "Sensor telemetry ingestion service and tooling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion service
    Serve {
        /// Path to config file (YAML, TOML, or JSON)
        #[arg(short, long, env = "TELEMETRY_CONFIG")]
        config: Option<PathBuf>,

        /// Override the listen address
        #[arg(short, long)]
        bind: Option<String>,

        /// Override the durable log directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Override the aggregation window (e.g. 500ms)
        #[arg(long)]
        flush_interval: Option<String>,
    },

    /// Stream simulated device frames to a running service
    Mock {
        /// Service base URL
        #[arg(short, long, default_value = "http://localhost:5050")]
        url: String,

        /// Number of frames to send (unbounded when omitted)
        #[arg(short = 'n', long)]
        frames: Option<u64>,

        /// Delay between frames
        #[arg(short, long, default_value = "20ms")]
        interval: String,

        /// Seed for reproducible readings
        #[arg(long)]
        seed: Option<u64>,

        /// Session id attached to every upload
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Inspect the durable logs
    History {
        /// Directory holding the logs
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Show the raw log instead of the aggregate log
        #[arg(long)]
        raw: bool,

        /// Print statistics instead of records
        #[arg(short, long)]
        summary: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Only show the newest N records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a config file
    Validate {
        /// Path to config file
        config_file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Markdown,
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "telemetry.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_max_level(log_level)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(log_level)
                .with_target(false)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match cli.command {
        Commands::Serve {
            config,
            bind,
            data_dir,
            flush_interval,
        } => {
            commands::serve::execute(config, bind, data_dir, flush_interval).await?;
        }

        Commands::Mock {
            url,
            frames,
            interval,
            seed,
            session_id,
        } => {
            commands::mock::execute(url, frames, interval, seed, session_id).await?;
        }

        Commands::History {
            data_dir,
            raw,
            summary,
            format,
            limit,
            output,
        } => {
            commands::history::execute(data_dir, raw, summary, format, limit, output).await?;
        }

        Commands::Validate { config_file } => {
            commands::validate::execute(config_file).await?;
        }
    }

    Ok(())
}
