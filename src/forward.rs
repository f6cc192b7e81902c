//! Forwarding of the latest sample to a monitoring collector.
//!
//! - [`Forwarder`]: sink for one sample with a present latency
//! - [`SenderForwarder`]: runs a `zabbix_sender`-compatible executable
//!
//! The scheduler dispatches each send on its own task and only logs the
//! outcome: no retry, no backpressure.

mod sender;

use thiserror::Error;

use crate::storage::Sample;

pub use sender::{SENDER_TIMEOUT, SenderForwarder};

/// Errors raised while forwarding a sample.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The sample carried no latency.
    #[error("sample has no latency value")]
    NoValue,

    /// The sender executable could not be started.
    #[error("failed to run sender '{sender}': {source}")]
    Spawn {
        sender: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error talking to the sender or writing its log.
    #[error("sender io error: {0}")]
    Io(#[from] std::io::Error),

    /// The sender ran but reported failure.
    #[error("sender exited with {0}")]
    Exit(std::process::ExitStatus),

    /// The sender did not finish in time and was killed.
    #[error("sender timed out")]
    Timeout,
}

/// A monitoring collector sink.
#[async_trait::async_trait]
pub trait Forwarder: Send + Sync + 'static {
    /// Transmit one sample. Only samples with a latency are forwarded.
    async fn send(&self, sample: &Sample) -> Result<(), ForwardError>;
}
