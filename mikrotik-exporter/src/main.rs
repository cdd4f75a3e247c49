//! MikroTik RouterOS Prometheus exporter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use mikrotik_exporter::{AppState, CollectorRegistry, ExporterConfig, HttpServer};

/// Multi-target Prometheus exporter for MikroTik RouterOS devices.
#[derive(Parser, Debug)]
#[command(name = "mikrotik-exporter")]
#[command(about = "Probe MikroTik devices over the REST API and export Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, env = "CONFIG_FILE", default_value = "mikrotik.json5")]
    config: String,

    /// HTTP listen address, `host:port` or a bare host (overrides config).
    #[arg(long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// HTTP listen port, used with a bare host or to replace the configured port.
    #[arg(long, env = "LISTEN_PORT")]
    port: Option<u16>,

    /// Metric name prefix for device metrics (overrides config).
    #[arg(long, env = "METRICS_NAMESPACE")]
    namespace: Option<String>,

    /// Log level (overrides config): trace, debug, info, warn, error.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ExporterConfig::read_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    // Command line and environment take precedence over the file
    config.override_listen(args.listen.as_deref(), args.port);
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    mikrotik_exporter_common::init_tracing(&config.logging, env!("CARGO_CRATE_NAME"))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting MikroTik exporter");

    let listen_addr = config.listen_addr()?;
    let registry = Arc::new(CollectorRegistry::with_defaults(&config.namespace));

    info!(
        collectors = ?registry.list(),
        auths = config.auths.len(),
        modules = config.modules.len(),
        namespace = %config.namespace,
        "Collectors registered"
    );

    let state = AppState::new(Arc::new(config), registry)
        .context("Failed to build device HTTP client")?;
    let http_server = HttpServer::new(state, listen_addr);

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_signal().await;

    shutdown_tx.send(true)?;

    // In-flight probes get a bounded grace period
    if tokio::time::timeout(Duration::from_secs(5), http_task)
        .await
        .is_err()
    {
        info!("Shutdown grace period elapsed");
    }

    info!("Exporter stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    }
}
