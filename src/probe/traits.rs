//! Core probe trait and error type.

use std::time::Duration;

use thiserror::Error;

/// Reasons a probe produced no latency.
///
/// These are observations, not faults: the scheduler records them as a
/// sample with an absent latency and carries on.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Host name could not be resolved.
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Socket setup or I/O error.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// The echo request failed.
    #[error("icmp error: {0}")]
    Icmp(#[from] surge_ping::SurgeError),

    /// No reply before the probe timeout.
    #[error("timeout elapsed")]
    Timeout,
}

/// A source of round-trip latency measurements.
///
/// Implementations own their timeout policy: `measure` must return within a
/// bounded time, with [`ProbeError::Timeout`] if no reply arrived.
#[async_trait::async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Host being probed, for logging.
    fn target(&self) -> &str;

    /// Perform one measurement and return the round-trip time.
    async fn measure(&self) -> Result<Duration, ProbeError>;
}
