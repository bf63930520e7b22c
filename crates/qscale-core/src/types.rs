//! Domain types shared across the qscale crates.
//!
//! These are the publicly visible halves of the controller's state:
//! roster entries, worker lifecycle states, and the per-pool statistics
//! snapshots served by the stats API. All types serialize to JSON.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique identifier for a worker process.
pub type WorkerId = String;

/// Which of the two managed pools a worker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Workers that consume the text queue and censor matched words.
    Filter,
    /// Workers that consume the processing queue and record new entries.
    Processor,
}

impl PoolKind {
    /// Stable lowercase name, used in worker ids, CLI args, and API paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Filter => "filter",
            PoolKind::Processor => "processor",
        }
    }

    /// Parse an API path segment or CLI argument into a pool kind.
    pub fn parse(s: &str) -> Option<PoolKind> {
        match s {
            "filter" => Some(PoolKind::Filter),
            "processor" => Some(PoolKind::Processor),
            _ => None,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker lifecycle state as observed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Spawn has been issued; the process has not been observed yet.
    Starting,
    /// The process is alive and has not been asked to stop.
    Running,
    /// The stop signal has been sent; the worker exits at its own pace.
    StopSignaled,
    /// The process is no longer alive (exited or crashed).
    Dead,
}

/// Publicly visible roster entry for a running worker.
///
/// Contains no owning references — the process handle and stop signal
/// live in the supervisor's private table under the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: WorkerId,
    pub pool: PoolKind,
    /// Unix timestamp (seconds) when the worker was started.
    pub started_at: u64,
}

/// A roster entry joined with its observed lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub id: WorkerId,
    pub pool: PoolKind,
    pub state: WorkerState,
}

// ── Statistics snapshots ───────────────────────────────────────────

/// Control loop lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Running,
    Stopping,
    Stopped,
}

/// Per-pool statistics published after every reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub kind: PoolKind,
    /// Current roster size.
    pub workers: u32,
    /// Most recent backlog sample; `None` until the first successful probe.
    pub backlog: Option<u64>,
    /// Most recent arrival-rate estimate (jobs/second).
    pub lambda: f64,
    /// Most recent planned target; `None` until the first completed cycle.
    pub target: Option<u32>,
    pub min_workers: u32,
    pub max_workers: u32,
    /// Unix timestamp (seconds) of the last completed cycle.
    pub last_cycle_at: Option<u64>,
}

impl PoolStats {
    /// An empty snapshot for a pool that has not completed a cycle yet.
    pub fn empty(kind: PoolKind, min_workers: u32, max_workers: u32) -> Self {
        Self {
            kind,
            workers: 0,
            backlog: None,
            lambda: 0.0,
            target: None,
            min_workers,
            max_workers,
            last_cycle_at: None,
        }
    }
}

/// Snapshot of the whole controller, published over a watch channel.
///
/// The controller task is the single writer; API handlers only ever
/// clone the latest value out of the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub state: LoopState,
    pub pools: Vec<PoolStats>,
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current Unix epoch in nanoseconds, used for unique worker ids.
pub fn epoch_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}
