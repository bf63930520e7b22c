//! Backlog probe over the broker management HTTP API.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use qscale_core::BrokerConfig;

use crate::error::{ProbeError, ProbeResult};

/// Anything that can report the current backlog depth of a named queue.
///
/// The controller depends on this seam rather than on the HTTP client so
/// reconciliation cycles can be driven by scripted samples in tests.
#[async_trait]
pub trait BacklogSource: Send + Sync {
    /// Current number of not-yet-processed messages in `queue`.
    async fn depth(&self, queue: &str) -> ProbeResult<u64>;
}

/// Queries queue depth from a RabbitMQ-style management API.
pub struct BacklogProbe {
    client: reqwest::Client,
    endpoint: String,
    vhost: String,
    username: String,
    password: String,
}

impl BacklogProbe {
    /// Build a probe from broker configuration.
    ///
    /// The request timeout is baked into the client so no probe call can
    /// block the control loop indefinitely.
    pub fn new(config: &BrokerConfig) -> ProbeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            vhost: config.vhost.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn queue_url(&self, queue: &str) -> String {
        format!(
            "{}/api/queues/{}/{}",
            self.endpoint,
            encode_vhost(&self.vhost),
            queue
        )
    }
}

#[async_trait]
impl BacklogSource for BacklogProbe {
    async fn depth(&self, queue: &str) -> ProbeResult<u64> {
        let url = self.queue_url(queue);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await?;
        let depth = parse_queue_depth(&payload)?;
        debug!(queue, depth, "backlog sampled");
        Ok(depth)
    }
}

/// Extract the `messages` count from a management API queue payload.
pub fn parse_queue_depth(payload: &Value) -> ProbeResult<u64> {
    // The management API omits `messages` for queues that have never
    // seen a message; treat that as an empty backlog.
    match payload.get("messages") {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| ProbeError::Malformed(format!("non-integer `messages` field: {v}"))),
    }
}

/// Percent-encode a vhost for use as a URL path segment.
///
/// The default vhost is the single character `/`, which must appear as
/// `%2F` in the management API path.
fn encode_vhost(vhost: &str) -> String {
    vhost.replace('/', "%2F")
}
