//! Prometheus probe exporter for JSON documents.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use json_exporter::{AppState, ExporterConfig, ExporterMetrics, HttpServer, Prober, TargetFetcher};

/// Prometheus probe exporter for JSON documents.
#[derive(Parser, Debug)]
#[command(name = "json-exporter")]
#[command(about = "Expose values from remote JSON documents as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// The address to listen on for HTTP requests (overrides config).
    #[arg(long, alias = "listen")]
    listen_address: Option<String>,

    /// Log level (trace, debug, info, warn, error; overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen_address {
        config.server.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    json_exporter_common::init_tracing(&config.logging)?;

    info!("Starting JSON Exporter");

    let listen_addr = config.listen_addr()?;

    let fetcher = TargetFetcher::new(&config.probe)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
    let metrics = Arc::new(ExporterMetrics::new());
    let state = AppState::new(Prober::new(fetcher), metrics.clone());
    let http_server = HttpServer::new(state, listen_addr);

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate_signal() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!(in_flight = metrics.in_flight(), "Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate_signal() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
