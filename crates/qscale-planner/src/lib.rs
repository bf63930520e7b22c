//! qscale-planner — pure sizing logic for the autoscaling controller.
//!
//! Two pieces, both free of I/O:
//!
//! - [`RateEstimator`] smooths successive backlog samples into an
//!   arrival-rate estimate λ
//! - [`plan`] maps (backlog, λ, pool bounds, capacity parameters) to a
//!   target worker count
//!
//! Deployments that prefer a configured constant λ skip the estimator
//! entirely; the planner only sees a number.

pub mod estimator;
pub mod planner;

pub use estimator::RateEstimator;
pub use planner::{PlanInputs, plan};
