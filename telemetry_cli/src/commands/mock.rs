use crate::ui;
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use telemetry_server::{DeviceSimulator, MockDevice};

pub async fn execute(
    url: String,
    frames: Option<u64>,
    interval: String,
    seed: Option<u64>,
    session_id: Option<String>,
) -> Result<()> {
    let interval = humantime::parse_duration(&interval)
        .with_context(|| format!("Invalid frame interval: {}", interval))?;

    ui::print_header("Mock Device");
    ui::print_field("Target", &url);
    match frames {
        Some(frames) => ui::print_field("Frames", frames),
        None => ui::print_field("Frames", "unbounded (Ctrl-C to stop)"),
    }
    ui::print_field("Interval", humantime::format_duration(interval));
    if let Some(seed) = seed {
        ui::print_field("Seed", format!("{} (reproducible)", seed));
    }
    println!();

    let mut device = MockDevice::new(&url, DeviceSimulator::new(seed, session_id))?;

    let pb = match frames {
        Some(frames) => {
            let pb = ProgressBar::new(frames);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({msg})")?
                    .progress_chars("=>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} frames ({msg})")?,
            );
            pb
        }
    };

    let mut failed = 0u64;
    let mut last_average = None;
    let report = device
        .run(frames, interval, |result| {
            match result {
                Ok(frame) => last_average = frame.processed.combined_average,
                Err(_) => failed += 1,
            }
            pb.set_message(format!("{} failed", failed));
            pb.inc(1);
        })
        .await;

    pb.finish_and_clear();

    println!("{}", "=== Mock Run Complete ===".bold().green());
    ui::print_field("Sent", report.sent);
    ui::print_field("Failed", report.failed);
    if let Some(average) = last_average {
        ui::print_field("Last combined average", average);
    }

    if report.sent == 0 && report.failed > 0 {
        ui::print_error("No frames reached the service");
        anyhow::bail!("All {} frame uploads failed", report.failed);
    }
    if report.failed > 0 {
        ui::print_warning(&format!(
            "{} of {} frames failed",
            report.failed,
            report.total()
        ));
    } else {
        ui::print_success("All frames delivered");
    }

    Ok(())
}
