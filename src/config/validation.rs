//! Configuration error types.

use thiserror::Error;

/// Configuration error types.
///
/// Fatal at startup only: the daemon refuses to start and exits with code 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Reject empty or whitespace-only string settings.
pub(crate) fn require_non_blank(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{key} must not be empty"
        )));
    }
    Ok(())
}
