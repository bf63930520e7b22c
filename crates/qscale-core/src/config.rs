//! qscale.toml configuration parser.
//!
//! One file configures the broker probe endpoint, the control loop
//! cadence, the worker spawn command, and the capacity parameters of the
//! two managed pools. Values carry serde defaults so a minimal file only
//! needs the queue names.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Which sizing formula the capacity planner applies for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// `N = ceil((λ·Tr + B) / C)` — drain the backlog within Tr.
    BacklogDrain,
    /// `N = ceil((λ·Tr + B) / (C·Tr))` — size against effective capacity.
    #[default]
    EffectiveCapacity,
}

/// Top-level configuration loaded from `qscale.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QscaleConfig {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub worker: WorkerCommand,
    pub pools: PoolsConfig,
}

/// Broker management API endpoint used by the backlog probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Base URL of the management API, e.g. `http://localhost:15672`.
    pub endpoint: String,
    #[serde(default = "default_vhost")]
    pub vhost: String,
    #[serde(default = "default_broker_user")]
    pub username: String,
    #[serde(default = "default_broker_user")]
    pub password: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

impl BrokerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Control loop cadence and shutdown behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Tick period of the polling loop in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Grace period per worker during drain, in seconds.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

/// Command the supervisor spawns for each worker.
///
/// The supervisor appends `--pool <kind>` and `--worker-id <id>` to the
/// configured arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerCommand {
    #[serde(default = "default_worker_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self {
            program: default_worker_program(),
            args: Vec::new(),
        }
    }
}

/// The two managed pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsConfig {
    pub filter: PoolConfig,
    pub processor: PoolConfig,
}

/// Capacity parameters for one worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Queue whose backlog drives this pool.
    pub queue: String,
    #[serde(default = "default_min_workers")]
    pub min_workers: u32,
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    /// Per-worker service capacity C in jobs/second.
    pub capacity: f64,
    /// Target response time Tr in seconds.
    pub target_response_time_secs: f64,
    /// When set, bypasses live estimation and uses this λ (jobs/second).
    #[serde(default)]
    pub fixed_arrival_rate: Option<f64>,
    /// Minimum seconds between two reconciliation cycles for this pool.
    #[serde(default = "default_scaling_interval_secs")]
    pub scaling_interval_secs: u64,
    #[serde(default)]
    pub strategy: PlanStrategy,
}

impl PoolConfig {
    pub fn scaling_interval(&self) -> Duration {
        Duration::from_secs(self.scaling_interval_secs)
    }
}

impl QscaleConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: QscaleConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, pool) in [("filter", &self.pools.filter), ("processor", &self.pools.processor)]
        {
            if pool.min_workers > pool.max_workers {
                return Err(ConfigError::InvalidPool {
                    pool: name.to_string(),
                    reason: format!(
                        "min_workers ({}) exceeds max_workers ({})",
                        pool.min_workers, pool.max_workers
                    ),
                });
            }
            if pool.queue.is_empty() {
                return Err(ConfigError::InvalidPool {
                    pool: name.to_string(),
                    reason: "queue name is empty".to_string(),
                });
            }
            if pool.scaling_interval_secs == 0 {
                return Err(ConfigError::InvalidPool {
                    pool: name.to_string(),
                    reason: "scaling_interval_secs must be positive".to_string(),
                });
            }
            if pool.target_response_time_secs <= 0.0 {
                return Err(ConfigError::InvalidPool {
                    pool: name.to_string(),
                    reason: "target_response_time_secs must be positive".to_string(),
                });
            }
            // A non-positive capacity is tolerated at runtime (the planner
            // no-ops), but warn loudly: it silently disables scaling.
            if pool.capacity <= 0.0 {
                tracing::warn!(
                    pool = name,
                    capacity = pool.capacity,
                    "non-positive worker capacity disables scaling for this pool"
                );
            }
        }
        if self.controller.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "controller.poll_interval_ms".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.worker.program.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "worker.program".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_broker_user() -> String {
    "guest".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_drain_timeout_secs() -> u64 {
    5
}

fn default_worker_program() -> String {
    "qscale-worker".to_string()
}

fn default_min_workers() -> u32 {
    1
}

fn default_max_workers() -> u32 {
    10
}

fn default_scaling_interval_secs() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[broker]
endpoint = "http://localhost:15672"

[pools.filter]
queue = "text_queue"
capacity = 1159.75
target_response_time_secs = 1.0

[pools.processor]
queue = "add_insult_queue"
capacity = 1179.38
target_response_time_secs = 1.0
"#;

    #[test]
    fn parse_minimal_applies_defaults() {
        let config: QscaleConfig = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.broker.vhost, "/");
        assert_eq!(config.broker.username, "guest");
        assert_eq!(config.broker.timeout_ms, 2_000);
        assert_eq!(config.controller.poll_interval_ms, 1_000);
        assert_eq!(config.worker.program, "qscale-worker");
        assert_eq!(config.pools.filter.min_workers, 1);
        assert_eq!(config.pools.filter.max_workers, 10);
        assert_eq!(config.pools.filter.scaling_interval_secs, 2);
        assert_eq!(config.pools.filter.strategy, PlanStrategy::EffectiveCapacity);
        assert_eq!(config.pools.filter.fixed_arrival_rate, None);
    }

    #[test]
    fn parse_full_pool_block() {
        let toml_str = r#"
[broker]
endpoint = "http://broker:15672"
username = "ops"
password = "secret"
timeout_ms = 500

[controller]
poll_interval_ms = 250
drain_timeout_secs = 3

[worker]
program = "/usr/local/bin/consumer"
args = ["--durable"]

[pools.filter]
queue = "text_queue"
min_workers = 2
max_workers = 150
capacity = 1159.75
target_response_time_secs = 0.5
fixed_arrival_rate = 50000.0
scaling_interval_secs = 4
strategy = "backlog_drain"

[pools.processor]
queue = "add_insult_queue"
capacity = 1179.38
target_response_time_secs = 1.0
"#;
        let config: QscaleConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        let filter = &config.pools.filter;
        assert_eq!(filter.min_workers, 2);
        assert_eq!(filter.max_workers, 150);
        assert_eq!(filter.fixed_arrival_rate, Some(50_000.0));
        assert_eq!(filter.strategy, PlanStrategy::BacklogDrain);
        assert_eq!(config.worker.args, vec!["--durable".to_string()]);
        assert_eq!(config.controller.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn min_above_max_is_rejected() {
        let mut config: QscaleConfig = toml::from_str(MINIMAL).unwrap();
        config.pools.processor.min_workers = 20;
        config.pools.processor.max_workers = 5;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPool { pool, .. } if pool == "processor"));
    }

    #[test]
    fn zero_scaling_interval_is_rejected() {
        let mut config: QscaleConfig = toml::from_str(MINIMAL).unwrap();
        config.pools.filter.scaling_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = QscaleConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pools.filter.queue, "text_queue");
    }

    #[test]
    fn from_file_missing_path_errors() {
        let err = QscaleConfig::from_file(Path::new("/nonexistent/qscale.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }
}
