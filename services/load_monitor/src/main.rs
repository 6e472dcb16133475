//! Load monitor entry point

use anyhow::Result;
use clap::Parser;
use pulse_actors::HeartbeatDriver;
use pulse_config::load_config;
use pulse_load_monitor::{Monitor, Outputs};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "load_monitor")]
#[command(about = "Per-core CPU load monitor with watchdog supervision")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter (overrides RUST_LOG and the config file)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    // Initialize logging on stderr; stdout carries the monitor's own output
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Starting load monitor");
    info!("📋 Configuration: {:?}", config);

    let monitor = Monitor::start(&config, Outputs::stdout())?;
    let driver = HeartbeatDriver::spawn(
        Arc::clone(monitor.registry()),
        monitor.heartbeat_config().clone(),
    );

    let registry = Arc::clone(monitor.registry());
    let entry = monitor.entry();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                info!("📡 Received shutdown signal, stopping node {}", entry);
                if let Err(e) = registry.kill(entry) {
                    warn!("Kill not delivered to entry node: {}", e);
                }
            }
            Err(e) => error!("❌ Failed to install signal handlers: {}", e),
        }
    });

    let exits = tokio::task::spawn_blocking(move || monitor.join()).await?;
    driver.shutdown().await;

    let mut failed = 0;
    for exit in &exits {
        match &exit.status {
            Ok(()) => info!("✅ {} ({}) exited", exit.name, exit.address),
            Err(e) if exit.is_clean() => info!("⏹️ {} ({}) exited: {}", exit.name, exit.address, e),
            Err(e) => {
                failed += 1;
                error!("❌ {} ({}) failed: {}", exit.name, exit.address, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} node(s) failed", failed);
    }
    info!("✅ Load monitor stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}
