//! qscaled — the qscale daemon.
//!
//! Single binary that assembles the autoscaling controller:
//! - Backlog probe against the broker management API
//! - One worker supervisor per pool (filter, processor)
//! - Control loop ticking both pools on their own cadences
//! - Read-only stats API
//!
//! # Usage
//!
//! ```text
//! qscaled run --config qscale.toml --api-port 8600
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use qscale_controller::{Controller, PoolReconciler};
use qscale_core::{PoolKind, QscaleConfig};
use qscale_probe::{BacklogProbe, BacklogSource};
use qscale_supervisor::WorkerSupervisor;

#[derive(Parser)]
#[command(name = "qscaled", about = "qscale autoscaling daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller until interrupted.
    Run {
        /// Path to the configuration file.
        #[arg(long, default_value = "qscale.toml")]
        config: PathBuf,

        /// Port the stats API listens on.
        #[arg(long, default_value = "8600")]
        api_port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,qscale=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, api_port } => run(config, api_port).await,
    }
}

async fn run(config_path: PathBuf, api_port: u16) -> anyhow::Result<()> {
    let config = QscaleConfig::from_file(&config_path)?;
    info!(path = ?config_path, "configuration loaded");

    // ── Initialize subsystems ──────────────────────────────────

    let probe: Arc<dyn BacklogSource> = Arc::new(BacklogProbe::new(&config.broker)?);
    info!(endpoint = %config.broker.endpoint, "backlog probe initialized");

    let reconcilers = vec![
        PoolReconciler::new(
            PoolKind::Filter,
            config.pools.filter.clone(),
            probe.clone(),
            WorkerSupervisor::new(PoolKind::Filter, config.worker.clone()),
        ),
        PoolReconciler::new(
            PoolKind::Processor,
            config.pools.processor.clone(),
            probe.clone(),
            WorkerSupervisor::new(PoolKind::Processor, config.worker.clone()),
        ),
    ];

    let (controller, snapshot_rx) = Controller::new(reconcilers, &config.controller);
    info!("controller initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Stats API ──────────────────────────────────────────────

    let router = qscale_api::build_router(snapshot_rx);
    let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "stats API listening");

    // Graceful shutdown on Ctrl-C: stop the API server and signal the
    // control loop, which drains both pools before exiting.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let api_handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!(error = %e, "stats API server failed");
        }
    });

    // The control loop runs on the main task until shutdown.
    controller.run(shutdown_rx).await;

    let _ = api_handle.await;
    info!("qscaled stopped");
    Ok(())
}
