//! qscale-worker — worker process scaffold.
//!
//! The supervisor spawns one of these per roster entry, passing the pool
//! kind and a unique worker id. The process runs until it receives the
//! advisory stop signal (SIGTERM) or an interrupt, logging a periodic
//! heartbeat in between.
//!
//! The message-consuming body is deliberately absent: deployments point
//! `worker.command` in `qscale.toml` at their real queue consumer, which
//! only needs to honor the same contract — run until SIGTERM, then exit
//! at its own pace.

use std::time::Duration;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info};

use qscale_core::PoolKind;

#[derive(Parser)]
#[command(name = "qscale-worker", about = "qscale worker process scaffold")]
struct Cli {
    /// Pool this worker belongs to ("filter" or "processor").
    #[arg(long)]
    pool: String,

    /// Unique worker id assigned by the supervisor.
    #[arg(long)]
    worker_id: String,

    /// Heartbeat period in seconds.
    #[arg(long, default_value = "5")]
    heartbeat_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let pool = PoolKind::parse(&cli.pool)
        .ok_or_else(|| anyhow::anyhow!("unknown pool kind: {}", cli.pool))?;

    info!(pool = %pool, id = %cli.worker_id, "worker starting");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut heartbeat = tokio::time::interval(Duration::from_secs(cli.heartbeat_secs));

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!(id = %cli.worker_id, "stop signal received, shutting down");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!(id = %cli.worker_id, "interrupt received, shutting down");
                break;
            }
            _ = heartbeat.tick() => {
                debug!(pool = %pool, id = %cli.worker_id, "heartbeat");
            }
        }
    }

    Ok(())
}
