//! Probe error types.

use thiserror::Error;

/// Errors that can occur while sampling queue depth.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to management API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("management API returned status {0}")]
    Status(u16),

    #[error("malformed management API payload: {0}")]
    Malformed(String),
}

pub type ProbeResult<T> = Result<T, ProbeError>;
