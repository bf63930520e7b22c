//! qscale-probe — backlog depth queries against the broker management API.
//!
//! One synchronous-looking operation: "how many messages sit in queue Q
//! right now". Implemented as a single GET against the RabbitMQ-style
//! management endpoint `/api/queues/{vhost}/{queue}` with basic auth and
//! a bounded request timeout. Any transport error, non-2xx status, or
//! malformed payload is a [`ProbeError`]; retry policy belongs to the
//! caller, never to the probe itself.

pub mod error;
pub mod probe;

pub use error::{ProbeError, ProbeResult};
pub use probe::{BacklogProbe, BacklogSource};
