//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating `qscale.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("pool `{pool}`: {reason}")]
    InvalidPool { pool: String, reason: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
