//! Router configuration.

use std::time::Duration;

/// Protocol timing and queue configuration for a [`Router`](crate::Router).
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Interval between liveness probe passes across all endpoints.
    /// Must be shorter than the peer's pong window.
    pub probe_period: Duration,
    /// Bound on a single probe control-frame write.
    pub probe_timeout: Duration,
    /// Per-send write deadline so one unresponsive peer cannot stall a
    /// broadcast pass; `None` disables the bound.
    pub write_deadline: Option<Duration>,
    /// Capacity of the dispatcher's inbound queue. Submitters wait when
    /// the queue is full.
    pub queue_capacity: usize,
    /// Maximum inbound message size in bytes accepted from a peer.
    pub max_message_size: Option<usize>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            // 90% of a 60s pong window
            probe_period: Duration::from_secs(54),
            probe_timeout: Duration::from_secs(10),
            write_deadline: Some(Duration::from_secs(10)),
            queue_capacity: 64,
            max_message_size: Some(8192),
        }
    }
}
