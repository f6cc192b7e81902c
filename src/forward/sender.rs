//! External sender process.
//!
//! Invokes `<sender> -z <address> -p <port> -s <target> -i -` and writes the
//! single trapper line `- <metric_key> <value>` to its stdin. The process's
//! stdout and stderr are captured to the configured log file, which is
//! truncated on every send.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ForwardConfig;
use crate::forward::{ForwardError, Forwarder};
use crate::storage::Sample;

/// Upper bound on one sender run.
pub const SENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Forwarder backed by an external sender executable.
#[derive(Debug, Clone)]
pub struct SenderForwarder {
    config: ForwardConfig,
    timeout: Duration,
}

impl SenderForwarder {
    /// Create a forwarder for the given destination.
    pub fn new(config: ForwardConfig) -> Self {
        Self {
            config,
            timeout: SENDER_TIMEOUT,
        }
    }

    /// Set the sender timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Destination configuration.
    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    /// Command-line arguments passed to the sender.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-z".to_string(),
            self.config.collector_address.clone(),
            "-p".to_string(),
            self.config.collector_port.to_string(),
            "-s".to_string(),
            self.config.target_id.clone(),
            "-i".to_string(),
            "-".to_string(),
        ]
    }

    /// Append a failure the sender could not report itself to the log file.
    async fn note_failure(&self, err: &ForwardError) {
        let line = format!("pinglog: {err}\n");
        let written = async {
            let mut log = tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.config.log_path)
                .await?;
            log.write_all(line.as_bytes()).await
        }
        .await;
        if let Err(e) = written {
            tracing::warn!(
                path = %self.config.log_path.display(),
                error = %e,
                "Failed to write sender log"
            );
        }
    }

    /// Trapper input line for one value.
    pub fn trap_line(&self, latency_ms: f64) -> String {
        format!("- {} {}\n", self.config.metric_key, latency_ms)
    }
}

#[async_trait::async_trait]
impl Forwarder for SenderForwarder {
    async fn send(&self, sample: &Sample) -> Result<(), ForwardError> {
        let latency_ms = sample.latency_ms.ok_or(ForwardError::NoValue)?;

        let log = tokio::fs::File::create(&self.config.log_path)
            .await?
            .into_std()
            .await;
        let log_err = log.try_clone()?;

        let child = Command::new(&self.config.sender)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true)
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(source) => {
                let err = ForwardError::Spawn {
                    sender: self.config.sender.clone(),
                    source,
                };
                self.note_failure(&err).await;
                return Err(err);
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(self.trap_line(latency_ms).as_bytes()).await {
                // The sender may exit without reading its input; its status decides
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                other => other?,
            }
            drop(stdin);
        }

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out sender");
                }
                self.note_failure(&ForwardError::Timeout).await;
                return Err(ForwardError::Timeout);
            }
        };

        if !status.success() {
            return Err(ForwardError::Exit(status));
        }

        tracing::debug!(
            collector = %self.config.collector_address,
            target = %self.config.target_id,
            latency_ms,
            "Sample forwarded"
        );
        Ok(())
    }
}
