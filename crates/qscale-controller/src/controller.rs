//! Control loop — ticks both pools and owns the shutdown sequence.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::info;

use qscale_core::{ControllerConfig, ControllerSnapshot, LoopState};

use crate::reconciler::PoolReconciler;

/// Drives every pool's reconciler on its own cadence inside a single
/// polling loop.
///
/// States: `Running` → (shutdown signal) → `Stopping` (drain all pools)
/// → `Stopped`. Probe failures, planner no-ops, and spawn failures only
/// ever affect a single cycle; nothing short of the shutdown signal
/// terminates the loop.
pub struct Controller {
    reconcilers: Vec<PoolReconciler>,
    poll_interval: Duration,
    drain_timeout: Duration,
    state: LoopState,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
}

impl Controller {
    /// Build a controller and the receiving end of its snapshot channel.
    ///
    /// The controller task is the single writer; any number of readers
    /// (API handlers, CLI tooling) may hold the receiver.
    pub fn new(
        reconcilers: Vec<PoolReconciler>,
        config: &ControllerConfig,
    ) -> (Self, watch::Receiver<ControllerSnapshot>) {
        let initial = ControllerSnapshot {
            state: LoopState::Running,
            pools: reconcilers.iter().map(|r| r.stats().clone()).collect(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let controller = Self {
            reconcilers,
            poll_interval: config.poll_interval(),
            drain_timeout: config.drain_timeout(),
            state: LoopState::Running,
            snapshot_tx,
        };
        (controller, snapshot_rx)
    }

    /// Run until the shutdown signal fires, then drain every pool.
    ///
    /// Each pool runs a cycle whenever its own scaling interval has
    /// elapsed; one pool's cadence never blocks another's.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            pools = self.reconcilers.len(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "control loop started"
        );

        let mut last_cycle = vec![Instant::now(); self.reconcilers.len()];

        while self.state == LoopState::Running {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {
                    let now = Instant::now();
                    for (i, rec) in self.reconcilers.iter_mut().enumerate() {
                        if now.duration_since(last_cycle[i]) >= rec.config().scaling_interval() {
                            rec.run_cycle().await;
                            last_cycle[i] = now;
                        }
                    }
                    self.publish();
                }
                _ = shutdown.changed() => {
                    info!("shutdown signal received, draining pools");
                    self.state = LoopState::Stopping;
                }
            }
        }

        self.publish();
        for rec in &mut self.reconcilers {
            rec.supervisor_mut().drain_all(self.drain_timeout).await;
            rec.refresh_worker_count();
        }
        self.state = LoopState::Stopped;
        self.publish();
        info!("control loop stopped");
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(ControllerSnapshot {
            state: self.state,
            pools: self.reconcilers.iter().map(|r| r.stats().clone()).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use qscale_core::{PlanStrategy, PoolConfig, PoolKind, WorkerCommand};
    use qscale_probe::{BacklogSource, ProbeResult};
    use qscale_supervisor::WorkerSupervisor;

    /// Backlog source pinned to a constant depth.
    struct ConstantBacklog(u64);

    #[async_trait]
    impl BacklogSource for ConstantBacklog {
        async fn depth(&self, _queue: &str) -> ProbeResult<u64> {
            Ok(self.0)
        }
    }

    fn test_reconciler(backlog: u64) -> PoolReconciler {
        let config = PoolConfig {
            queue: "text_queue".to_string(),
            min_workers: 1,
            max_workers: 10,
            capacity: 5.0,
            target_response_time_secs: 1.0,
            fixed_arrival_rate: Some(3.0),
            scaling_interval_secs: 1,
            strategy: PlanStrategy::BacklogDrain,
        };
        let supervisor = WorkerSupervisor::new(
            PoolKind::Filter,
            WorkerCommand {
                program: "/bin/sh".to_string(),
                args: vec!["-c".to_string(), "sleep 30".to_string()],
            },
        );
        PoolReconciler::new(
            PoolKind::Filter,
            config,
            Arc::new(ConstantBacklog(backlog)),
            supervisor,
        )
    }

    #[tokio::test]
    async fn runs_cycles_then_drains_on_shutdown() {
        let config = ControllerConfig {
            poll_interval_ms: 100,
            drain_timeout_secs: 2,
        };
        // B=12, λ=3, C=5, Tr=1 → target 3.
        let (controller, mut snapshot_rx) =
            Controller::new(vec![test_reconciler(12)], &config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(controller.run(shutdown_rx));

        // Give the pool's 1s scaling interval time to fire.
        tokio::time::sleep(Duration::from_millis(1_400)).await;
        {
            let snapshot = snapshot_rx.borrow_and_update();
            assert_eq!(snapshot.state, LoopState::Running);
            assert_eq!(snapshot.pools[0].workers, 3);
            assert_eq!(snapshot.pools[0].target, Some(3));
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let snapshot = snapshot_rx.borrow_and_update();
        assert_eq!(snapshot.state, LoopState::Stopped);
        assert_eq!(snapshot.pools[0].workers, 0);
    }

    #[tokio::test]
    async fn shutdown_before_first_cycle_still_stops_cleanly() {
        let config = ControllerConfig {
            poll_interval_ms: 50,
            drain_timeout_secs: 1,
        };
        let (controller, mut snapshot_rx) =
            Controller::new(vec![test_reconciler(0)], &config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(controller.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let snapshot = snapshot_rx.borrow_and_update();
        assert_eq!(snapshot.state, LoopState::Stopped);
        assert!(snapshot.pools[0].last_cycle_at.is_none());
    }
}
