//! qscale-controller — drives the two worker pools toward their targets.
//!
//! The [`PoolReconciler`] runs one pool's cycle: sample backlog, update
//! the arrival-rate estimate, plan a target, start or stop workers (never
//! both), then reap dead processes. The [`Controller`] ticks a short
//! polling loop, fires each pool's reconciler on its own cadence, and
//! owns the multi-phase shutdown sequence.
//!
//! # Control flow
//!
//! ```text
//! Controller (tick every poll_interval)
//!   ├── filter PoolReconciler    every filter.scaling_interval
//!   │     probe → estimator → planner → supervisor start/stop → reap
//!   └── processor PoolReconciler every processor.scaling_interval
//! ```
//!
//! Snapshots of pool statistics are published over a `watch` channel
//! after every cycle; the controller task is the single writer.

pub mod controller;
pub mod reconciler;

pub use controller::Controller;
pub use reconciler::PoolReconciler;
