//! hostpush - entry point
//!
//! Parses CLI arguments, loads every configuration file, and processes the
//! Configs strictly in order with a fixed pause between them. The first
//! fatal error ends the run with a non-zero exit.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hostpush::config::{Args, Config};
use hostpush::runner;

/// Pause between Configs (and after the last one), matching the original
/// tool's pacing
const CONFIG_PAUSE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("hostpush v{} starting", env!("CARGO_PKG_VERSION"));

    let configs = match Config::load_all(&args.configs).await {
        Ok(configs) => configs,
        Err(e) => {
            error!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    for (i, cfg) in configs.iter().enumerate() {
        info!(
            "processing config {}/{} ({} hosts, {} commands)",
            i + 1,
            configs.len(),
            cfg.hosts.len(),
            cfg.commands.len()
        );
        if let Err(e) = runner::run_config(cfg).await {
            error!("{e}");
            return std::process::ExitCode::FAILURE;
        }
        tokio::time::sleep(CONFIG_PAUSE).await;
    }

    info!("all configs processed");
    std::process::ExitCode::SUCCESS
}
