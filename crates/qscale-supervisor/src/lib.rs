//! qscale-supervisor — owns the worker processes of one pool.
//!
//! Two-tier state model:
//!
//! - A **public roster** of `{id, pool}` entries, plain data any other
//!   component may copy or serialize
//! - A **private table** of process handles and stop-signal bookkeeping,
//!   never exposed outside this crate
//!
//! Both are keyed by the same worker id and kept consistent by a
//! single-writer discipline: only the controller task calls the mutating
//! operations, so neither tier needs a lock. A crashed worker leaves the
//! tiers briefly out of sync until the next [`reap`] pass — bounded
//! staleness, corrected within one scaling interval.
//!
//! [`reap`]: supervisor::WorkerSupervisor::reap

pub mod error;
pub mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use supervisor::WorkerSupervisor;
