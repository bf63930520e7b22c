//! Worker supervisor — start/stop/reap/drain for one pool's processes.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use qscale_core::{
    PoolKind, RosterEntry, WorkerCommand, WorkerId, WorkerInfo, WorkerState, epoch_nanos,
    epoch_secs,
};

use crate::error::SupervisorResult;

/// Private half of a worker record: the owned process handle plus
/// stop-signal bookkeeping. Never leaves this crate.
struct WorkerHandle {
    child: Child,
    /// The advisory stop signal has been sent.
    signaled: bool,
    /// The process has been observed alive at least once by the reaper.
    observed: bool,
}

impl WorkerHandle {
    /// Send the advisory stop signal (SIGTERM). The worker is expected
    /// to observe it and exit at its own pace; liveness is only
    /// confirmed later by the reaper or by drain.
    fn signal_stop(&mut self, id: &str) {
        if self.signaled {
            return;
        }
        match self.child.id() {
            Some(pid) => {
                let rc = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
                if rc != 0 {
                    warn!(id, pid, "failed to deliver stop signal");
                }
            }
            None => debug!(id, "worker already exited before stop signal"),
        }
        self.signaled = true;
    }

    fn state(&self) -> WorkerState {
        match (self.signaled, self.observed) {
            (true, _) => WorkerState::StopSignaled,
            (false, false) => WorkerState::Starting,
            (false, true) => WorkerState::Running,
        }
    }
}

/// Owns and reconciles the worker processes of a single pool.
///
/// All mutating methods take `&mut self`: the controller task is the
/// only writer, which is what makes the lock-free two-tier state safe.
pub struct WorkerSupervisor {
    pool: PoolKind,
    command: WorkerCommand,
    /// Public roster, oldest worker first.
    roster: VecDeque<RosterEntry>,
    /// Private table: id → process handle.
    handles: HashMap<WorkerId, WorkerHandle>,
}

impl WorkerSupervisor {
    pub fn new(pool: PoolKind, command: WorkerCommand) -> Self {
        Self {
            pool,
            command,
            roster: VecDeque::new(),
            handles: HashMap::new(),
        }
    }

    pub fn pool(&self) -> PoolKind {
        self.pool
    }

    /// Number of workers currently on the roster.
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Public roster entries, oldest first.
    pub fn roster(&self) -> impl Iterator<Item = &RosterEntry> {
        self.roster.iter()
    }

    /// Roster joined with observed lifecycle states. Workers already
    /// signaled to stop (and thus off the roster) are included until
    /// the reaper confirms their exit.
    pub fn workers(&self) -> Vec<WorkerInfo> {
        let mut infos: Vec<WorkerInfo> = self
            .handles
            .iter()
            .map(|(id, handle)| WorkerInfo {
                id: id.clone(),
                pool: self.pool,
                state: handle.state(),
            })
            .collect();
        // A roster entry without a handle means the private record was
        // lost; surface it as dead so the reaper cleans it up.
        for entry in &self.roster {
            if !self.handles.contains_key(&entry.id) {
                infos.push(WorkerInfo {
                    id: entry.id.clone(),
                    pool: self.pool,
                    state: WorkerState::Dead,
                });
            }
        }
        infos
    }

    /// Spawn a new worker and register it in both tiers.
    ///
    /// The spawned command is the configured worker program with
    /// `--pool <kind> --worker-id <id>` appended.
    pub fn start(&mut self) -> SupervisorResult<WorkerId> {
        let id = format!("{}-{}", self.pool, epoch_nanos());
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg("--pool")
            .arg(self.pool.as_str())
            .arg("--worker-id")
            .arg(&id)
            .spawn()?;

        info!(pool = %self.pool, id = %id, pid = child.id(), "worker started");
        self.roster.push_back(RosterEntry {
            id: id.clone(),
            pool: self.pool,
            started_at: epoch_secs(),
        });
        self.handles.insert(
            id.clone(),
            WorkerHandle {
                child,
                signaled: false,
                observed: false,
            },
        );
        Ok(id)
    }

    /// Ask the longest-running worker to stop.
    ///
    /// Removes the oldest roster entry and signals its process; the
    /// private handle stays in place until the reaper confirms the exit.
    /// Returns `true` only when a worker was actually signaled: `false`
    /// on an empty roster, and `false` when the popped entry has no
    /// private handle (the stale entry is still removed).
    pub fn stop(&mut self) -> bool {
        let Some(entry) = self.roster.pop_front() else {
            return false;
        };
        match self.handles.get_mut(&entry.id) {
            Some(handle) => {
                handle.signal_stop(&entry.id);
                info!(pool = %self.pool, id = %entry.id, "worker signaled to stop");
                true
            }
            None => {
                warn!(
                    pool = %self.pool,
                    id = %entry.id,
                    "no private handle for roster entry, removing roster entry only"
                );
                false
            }
        }
    }

    /// Remove every worker whose process is no longer alive.
    ///
    /// Catches both workers that exited after being signaled and workers
    /// that crashed without ever being asked to stop.
    pub fn reap(&mut self) {
        let mut dead: Vec<WorkerId> = Vec::new();
        for (id, handle) in &mut self.handles {
            match handle.child.try_wait() {
                Ok(Some(status)) => {
                    if handle.signaled {
                        debug!(pool = %self.pool, id = %id, ?status, "worker exited after stop signal");
                    } else {
                        warn!(pool = %self.pool, id = %id, ?status, "worker exited unexpectedly");
                    }
                    dead.push(id.clone());
                }
                Ok(None) => handle.observed = true,
                Err(e) => {
                    warn!(pool = %self.pool, id = %id, error = %e, "cannot check worker liveness, discarding");
                    dead.push(id.clone());
                }
            }
        }
        for id in &dead {
            self.handles.remove(id);
        }
        let handles = &self.handles;
        self.roster.retain(|entry| handles.contains_key(&entry.id));
    }

    /// Signal every remaining worker, wait up to `timeout` for each to
    /// exit, and forcibly terminate stragglers. Both tiers are empty
    /// when this returns.
    pub async fn drain_all(&mut self, timeout: Duration) {
        for (id, handle) in &mut self.handles {
            handle.signal_stop(id);
        }
        for (id, mut handle) in self.handles.drain() {
            match tokio::time::timeout(timeout, handle.child.wait()).await {
                Ok(Ok(status)) => debug!(pool = %self.pool, id = %id, ?status, "worker drained"),
                Ok(Err(e)) => warn!(pool = %self.pool, id = %id, error = %e, "error joining worker"),
                Err(_) => {
                    warn!(pool = %self.pool, id = %id, "worker did not exit within grace period, killing");
                    if let Err(e) = handle.child.kill().await {
                        warn!(pool = %self.pool, id = %id, error = %e, "failed to kill worker");
                    }
                }
            }
        }
        self.roster.clear();
        info!(pool = %self.pool, "pool drained");
    }
}
