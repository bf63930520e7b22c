//! Supervisor error types.

use thiserror::Error;

/// Errors that can occur during worker lifecycle operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
