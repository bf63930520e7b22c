//! Arrival-rate estimation from successive backlog samples.

use std::time::{Duration, Instant};

use tracing::trace;

/// Samples closer together than this are ignored — the division by Δt
/// would amplify sampling noise into wild λ swings.
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Smooths backlog samples into an arrival-rate estimate.
///
/// The estimate for an interval is the net queue growth plus however
/// much the running workers were able to drain during it:
///
/// ```text
/// arrivals = max(0, (backlog - last_backlog) + running · C · Δt)
/// λ        = max(0, arrivals / Δt)
/// ```
///
/// Clamping to zero keeps drain noise from producing negative rates.
#[derive(Debug)]
pub struct RateEstimator {
    last_backlog: u64,
    last_sample: Instant,
    lambda: f64,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self {
            last_backlog: 0,
            last_sample: Instant::now(),
            lambda: 0.0,
        }
    }

    /// The most recent estimate, without taking a new sample.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Fold a new backlog sample into the estimate.
    ///
    /// `running` and `capacity` describe the pool's drain rate over the
    /// elapsed interval. Returns the updated λ.
    pub fn update(&mut self, backlog: u64, running: u32, capacity: f64) -> f64 {
        self.update_at(Instant::now(), backlog, running, capacity)
    }

    fn update_at(&mut self, now: Instant, backlog: u64, running: u32, capacity: f64) -> f64 {
        let delta = now.saturating_duration_since(self.last_sample);
        if delta < MIN_SAMPLE_INTERVAL {
            trace!(?delta, "sample interval too short, estimate unchanged");
            return self.lambda;
        }

        let dt = delta.as_secs_f64();
        let growth = backlog as f64 - self.last_backlog as f64;
        let drained = f64::from(running) * capacity * dt;
        let arrivals = (growth + drained).max(0.0);

        self.lambda = (arrivals / dt).max(0.0);
        self.last_backlog = backlog;
        self.last_sample = now;
        self.lambda
    }
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(estimator: &RateEstimator, secs: f64) -> Instant {
        estimator.last_sample + Duration::from_secs_f64(secs)
    }

    #[test]
    fn growth_only_when_no_workers() {
        let mut est = RateEstimator::new();
        // 100 messages arrived in 2s with nothing draining.
        let now = advance(&est, 2.0);
        let lambda = est.update_at(now, 100, 0, 10.0);
        assert!((lambda - 50.0).abs() < 1e-9);
    }

    #[test]
    fn drain_is_added_back_into_arrivals() {
        let mut est = RateEstimator::new();
        let now = advance(&est, 1.0);
        est.update_at(now, 100, 0, 10.0);

        // Backlog held steady at 100 while 5 workers drained 10/s each:
        // arrivals must have matched the drain rate.
        let now = advance(&est, 2.0);
        let lambda = est.update_at(now, 100, 5, 10.0);
        assert!((lambda - 50.0).abs() < 1e-9);
    }

    #[test]
    fn drain_noise_clamps_to_zero() {
        let mut est = RateEstimator::new();
        let now = advance(&est, 1.0);
        est.update_at(now, 100, 0, 10.0);

        // Backlog dropped faster than the pool could possibly drain.
        let now = advance(&est, 1.0);
        let lambda = est.update_at(now, 0, 1, 10.0);
        assert_eq!(lambda, 0.0);
    }

    #[test]
    fn short_interval_leaves_estimate_unchanged() {
        let mut est = RateEstimator::new();
        let now = advance(&est, 1.0);
        est.update_at(now, 50, 0, 10.0);
        let before = est.lambda();

        // 10ms later — below the minimum sample interval.
        let lambda = est.update_at(now + Duration::from_millis(10), 5_000, 0, 10.0);
        assert_eq!(lambda, before);
        // The stale sample must not have been recorded either.
        assert_eq!(est.last_backlog, 50);
    }
}
