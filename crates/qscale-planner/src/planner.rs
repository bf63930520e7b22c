//! Capacity planner — queueing-theoretic worker-count sizing.

use tracing::warn;

use qscale_core::PlanStrategy;

/// When the queue is empty and λ sits below this fraction of one
/// worker's capacity, the pool is considered idle and forced to its
/// floor.
const IDLE_LAMBDA_FRACTION: f64 = 0.1;

/// Inputs to one planning decision.
#[derive(Debug, Clone, Copy)]
pub struct PlanInputs {
    /// Current backlog B (messages).
    pub backlog: u64,
    /// Arrival-rate estimate λ (messages/second).
    pub lambda: f64,
    /// Current roster size, returned unchanged on misconfiguration.
    pub current: u32,
    pub min_workers: u32,
    pub max_workers: u32,
    /// Per-worker service capacity C (messages/second).
    pub capacity: f64,
    /// Target response time Tr (seconds).
    pub target_response_time: f64,
    pub strategy: PlanStrategy,
}

/// Compute the target worker count for a pool.
///
/// Pure function: same inputs, same answer, no I/O. The result is always
/// clamped into `[min_workers, max_workers]` except when the capacity is
/// misconfigured, in which case the current count is returned untouched
/// so the reconciler performs no scaling at all.
pub fn plan(inputs: &PlanInputs) -> u32 {
    let PlanInputs {
        backlog,
        lambda,
        current,
        min_workers,
        max_workers,
        capacity,
        target_response_time,
        strategy,
    } = *inputs;

    if capacity <= 0.0 {
        warn!(capacity, "worker capacity is not positive, cannot plan a target");
        return current;
    }

    // Idle pool: nothing queued and arrivals are a trickle. Force the
    // floor even where the formula would round above it.
    if backlog == 0 && lambda < IDLE_LAMBDA_FRACTION * capacity {
        return min_workers;
    }

    let numerator = lambda * target_response_time + backlog as f64;
    let denominator = match strategy {
        PlanStrategy::BacklogDrain => capacity,
        PlanStrategy::EffectiveCapacity => capacity * target_response_time,
    };

    let target = if denominator <= 0.0 {
        // Tr is validated positive at config load; this guards the
        // arithmetic anyway rather than dividing by zero.
        if numerator > 0.0 { max_workers } else { min_workers }
    } else {
        (numerator / denominator).ceil() as u32
    };

    target.clamp(min_workers, max_workers)
}
