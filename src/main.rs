//! pinglog Binary Entry Point
//!
//! Runs the probe daemon, or renders the stored history once.
//! Core functionality is provided by the `pinglog` library crate.

use clap::{Parser, Subcommand};
use pinglog::config::{AppConfig, DEFAULT_CONFIG_PATH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// pinglog - Ping Latency Logger
#[derive(Parser, Debug)]
#[command(name = "pinglog", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Probe on a fixed cadence, record and render (default)
    #[default]
    Run,
    /// Render the full stored history once and exit
    Graph,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pinglog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG_PATH);
    let config = match AppConfig::load(DEFAULT_CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or_default() {
        Command::Run => {
            tracing::info!(
                "Probing {} every {}s, database: {}, graph: {}",
                config.probe.host,
                config.probe.interval_seconds,
                config.storage.path.display(),
                config.graph.output.display(),
            );
            tracing::info!("Press Ctrl+C to shutdown");

            let summary = pinglog::run_daemon(&config, shutdown_signal()).await?;
            tracing::info!(
                "Shutdown complete: {} ticks, {} persisted",
                summary.ticks,
                summary.persisted
            );
        }
        Command::Graph => {
            let summary = pinglog::render_history(&config).await?;
            tracing::info!(
                "Rendered {} samples into {}",
                summary.samples,
                summary.path.display()
            );
        }
    }

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
