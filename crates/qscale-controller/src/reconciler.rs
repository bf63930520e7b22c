//! Per-pool reconciliation cycle.

use std::sync::Arc;

use tracing::{debug, info, warn};

use qscale_core::{PoolConfig, PoolKind, PoolStats, epoch_secs};
use qscale_planner::{PlanInputs, RateEstimator, plan};
use qscale_probe::BacklogSource;
use qscale_supervisor::WorkerSupervisor;

/// Reconciles one pool's roster against the planned worker count.
pub struct PoolReconciler {
    kind: PoolKind,
    config: PoolConfig,
    probe: Arc<dyn BacklogSource>,
    estimator: RateEstimator,
    supervisor: WorkerSupervisor,
    stats: PoolStats,
}

impl PoolReconciler {
    pub fn new(
        kind: PoolKind,
        config: PoolConfig,
        probe: Arc<dyn BacklogSource>,
        supervisor: WorkerSupervisor,
    ) -> Self {
        let stats = PoolStats::empty(kind, config.min_workers, config.max_workers);
        Self {
            kind,
            config,
            probe,
            estimator: RateEstimator::new(),
            supervisor,
            stats,
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Statistics after the most recent cycle.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn supervisor_mut(&mut self) -> &mut WorkerSupervisor {
        &mut self.supervisor
    }

    /// Re-read the roster size into the published statistics. Used after
    /// drain, which empties the roster outside a reconciliation cycle.
    pub fn refresh_worker_count(&mut self) {
        self.stats.workers = self.supervisor.roster_len() as u32;
    }

    /// Run one reconciliation cycle.
    ///
    /// A probe failure skips the whole cycle: no estimator update, no
    /// scaling, no reap — the next cycle retries from scratch. A worker
    /// spawn failure ends the scale-up early; the shortfall is made up
    /// on the next cycle because the roster stays below target.
    pub async fn run_cycle(&mut self) {
        let backlog = match self.probe.depth(&self.config.queue).await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(pool = %self.kind, error = %e, "backlog probe failed, skipping cycle");
                return;
            }
        };

        let current = self.supervisor.roster_len() as u32;

        // λ comes from the live estimator unless the pool is pinned to a
        // configured constant rate.
        let lambda = match self.config.fixed_arrival_rate {
            Some(rate) => rate,
            None => self
                .estimator
                .update(backlog, current, self.config.capacity),
        };

        let target = plan(&PlanInputs {
            backlog,
            lambda,
            current,
            min_workers: self.config.min_workers,
            max_workers: self.config.max_workers,
            capacity: self.config.capacity,
            target_response_time: self.config.target_response_time_secs,
            strategy: self.config.strategy,
        });

        debug!(
            pool = %self.kind,
            backlog,
            lambda,
            target,
            current,
            "cycle planned"
        );

        // Strictly one direction per cycle: starts xor stops.
        if target > current {
            self.scale_up(target - current);
        } else if target < current {
            self.scale_down(current - target);
        }

        // Always reap, scaling or not, to self-heal from crashes.
        self.supervisor.reap();

        self.stats = PoolStats {
            kind: self.kind,
            workers: self.supervisor.roster_len() as u32,
            backlog: Some(backlog),
            lambda,
            target: Some(target),
            min_workers: self.config.min_workers,
            max_workers: self.config.max_workers,
            last_cycle_at: Some(epoch_secs()),
        };
    }

    fn scale_up(&mut self, count: u32) {
        info!(pool = %self.kind, count, "scaling up");
        for _ in 0..count {
            // Each start is observable, so re-check the ceiling per
            // iteration rather than trusting the initial diff.
            if self.supervisor.roster_len() as u32 >= self.config.max_workers {
                debug!(pool = %self.kind, "max workers reached, stopping scale-up");
                break;
            }
            if let Err(e) = self.supervisor.start() {
                warn!(pool = %self.kind, error = %e, "worker spawn failed, ending scale-up for this cycle");
                break;
            }
        }
    }

    fn scale_down(&mut self, count: u32) {
        info!(pool = %self.kind, count, "scaling down");
        for _ in 0..count {
            if self.supervisor.roster_len() as u32 <= self.config.min_workers {
                debug!(pool = %self.kind, "min workers reached, stopping scale-down");
                break;
            }
            if !self.supervisor.stop() {
                break;
            }
        }
    }
}
