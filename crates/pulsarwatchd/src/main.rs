//! pulsarwatchd, the in-cluster Pulsar health monitor.
//!
//! Assembles the health state, the metric registry, the monitor task and
//! the HTTP surface in one process.
//!
//! # Usage
//!
//! ```text
//! pulsarwatchd run --config /etc/pulsarwatch/pulsarwatch.toml
//! pulsarwatchd check-config --config /etc/pulsarwatch/pulsarwatch.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulsarwatch_api::{ApiState, build_router};
use pulsarwatch_core::Config;
use pulsarwatch_health::{FileClusterClient, HealthMonitor, LogAlertSink};
use pulsarwatch_metrics::MetricRegistry;
use pulsarwatch_state::HealthState;

const DEFAULT_LOG_FILTER: &str = "info,pulsarwatchd=debug,pulsarwatch=debug";

#[derive(Parser)]
#[command(name = "pulsarwatchd", about = "Pulsar cluster health monitor")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor and serve the HTTP endpoints.
    Run {
        /// Path to pulsarwatch.toml.
        #[arg(long)]
        config: PathBuf,

        /// Override `server.listen` from the config file.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Parse and validate a config file, then print it normalized.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run { config, listen } => run(&config, listen).await,
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    print!("{}", config.to_toml_string()?);
    info!(scope = %config.scope_label(), "config is valid");
    Ok(())
}

async fn run(config_path: &Path, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let scope = config.scope_label();
    info!(%scope, config = %config_path.display(), "pulsarwatchd starting");

    let health = HealthState::new();
    let metrics = Arc::new(MetricRegistry::new());

    // ── Monitor ────────────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let status_file = config.kubernetes.status_file.clone().unwrap_or_default();
    let client = Arc::new(FileClusterClient::new(
        status_file,
        config.kubernetes.replicas,
    ));
    let monitor = HealthMonitor::spawn(
        &config,
        client,
        Arc::new(LogAlertSink),
        health.clone(),
        metrics.clone(),
        shutdown_rx,
    );

    // ── API server ─────────────────────────────────────────────

    let router = build_router(ApiState {
        health,
        metrics,
        scope,
    });
    let addr = listen.unwrap_or(config.server.listen);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = monitor {
        if let Err(e) = handle.await {
            warn!(error = %e, "health monitor task failed");
        }
    }

    info!("pulsarwatchd stopped");
    Ok(())
}
