//! qscale-core — shared domain types and configuration.
//!
//! Everything the other qscale crates agree on lives here:
//!
//! - Pool identity ([`PoolKind`]) and worker roster types
//! - Per-pool capacity parameters ([`PoolConfig`])
//! - The `qscale.toml` configuration file ([`QscaleConfig`])
//! - Read-only statistics snapshots published by the controller
//!
//! All types are plain data — no process handles, no I/O. The private
//! half of the worker state (child processes, stop signals) never leaves
//! `qscale-supervisor`.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BrokerConfig, ControllerConfig, PlanStrategy, PoolConfig, PoolsConfig, QscaleConfig,
    WorkerCommand,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
