//! Forwarding section of the configuration.
//!
//! The file-level [`ForwardSection`] keeps every key optional so a partially
//! filled section can be detected and rejected instead of silently turning
//! forwarding off.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, require_non_blank};

/// Default collector (trapper) port.
pub const DEFAULT_COLLECTOR_PORT: u16 = 10051;

/// Default metric key.
pub const DEFAULT_METRIC_KEY: &str = "ping";

/// Default sender executable.
pub const DEFAULT_SENDER: &str = "zabbix_sender";

/// Default file receiving the sender's stdout/stderr.
pub const DEFAULT_SENDER_LOG: &str = "zabbix.log";

/// `forward:` section as written in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardSection {
    /// Collector host name or address. Required when forwarding.
    pub collector_address: Option<String>,
    /// Collector port (default: 10051).
    pub collector_port: Option<u16>,
    /// Target (monitored host) identifier. Required when forwarding.
    pub target_id: Option<String>,
    /// Metric key (default: "ping").
    pub metric_key: Option<String>,
    /// Sender executable (default: "zabbix_sender").
    pub sender: Option<String>,
    /// Sender output log (default: "zabbix.log").
    pub log_path: Option<PathBuf>,
}

impl ForwardSection {
    /// Whether no key at all is set.
    pub fn is_empty(&self) -> bool {
        self.collector_address.is_none()
            && self.collector_port.is_none()
            && self.target_id.is_none()
            && self.metric_key.is_none()
            && self.sender.is_none()
            && self.log_path.is_none()
    }

    /// Resolve defaults and validate.
    ///
    /// Returns `Ok(None)` when the section is empty (forwarding disabled).
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` when some keys are set but
    /// `collector_address` or `target_id` is missing, or a value is invalid.
    pub fn resolve(&self) -> Result<Option<ForwardConfig>, ConfigError> {
        if self.is_empty() {
            return Ok(None);
        }

        let missing: Vec<&str> = [
            ("forward.collector_address", &self.collector_address),
            ("forward.target_id", &self.target_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "forwarding is partially configured, missing: {}",
                missing.join(", ")
            )));
        }

        let config = ForwardConfig {
            collector_address: self.collector_address.clone().unwrap_or_default(),
            collector_port: self.collector_port.unwrap_or(DEFAULT_COLLECTOR_PORT),
            target_id: self.target_id.clone().unwrap_or_default(),
            metric_key: self
                .metric_key
                .clone()
                .unwrap_or_else(|| DEFAULT_METRIC_KEY.to_string()),
            sender: self
                .sender
                .clone()
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            log_path: self
                .log_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDER_LOG)),
        };
        config.validate()?;
        Ok(Some(config))
    }
}

/// Validated forwarding destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardConfig {
    pub collector_address: String,
    pub collector_port: u16,
    pub target_id: String,
    pub metric_key: String,
    pub sender: String,
    pub log_path: PathBuf,
}

impl ForwardConfig {
    /// Create a destination with default port, key, sender and log path.
    pub fn new(collector_address: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            collector_address: collector_address.into(),
            collector_port: DEFAULT_COLLECTOR_PORT,
            target_id: target_id.into(),
            metric_key: DEFAULT_METRIC_KEY.to_string(),
            sender: DEFAULT_SENDER.to_string(),
            log_path: PathBuf::from(DEFAULT_SENDER_LOG),
        }
    }

    /// Set the collector port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.collector_port = port;
        self
    }

    /// Set the metric key.
    pub fn with_metric_key(mut self, key: impl Into<String>) -> Self {
        self.metric_key = key.into();
        self
    }

    /// Set the sender executable.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Set the sender output log.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Validate values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_blank("forward.collector_address", &self.collector_address)?;
        require_non_blank("forward.target_id", &self.target_id)?;
        require_non_blank("forward.metric_key", &self.metric_key)?;
        require_non_blank("forward.sender", &self.sender)?;

        if self.collector_port == 0 {
            return Err(ConfigError::ValidationError(
                "forward.collector_port must be non-zero".to_string(),
            ));
        }
        if self.metric_key.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "forward.metric_key must not contain whitespace: '{}'",
                self.metric_key
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_section_disables_forwarding() {
        let section = ForwardSection::default();
        assert!(section.is_empty());
        assert!(section.resolve().unwrap().is_none());
    }

    #[test]
    fn test_minimal_section_resolves_defaults() {
        let section = ForwardSection {
            collector_address: Some("zabbix.local".to_string()),
            target_id: Some("edge-router".to_string()),
            ..Default::default()
        };

        let config = section.resolve().unwrap().unwrap();
        assert_eq!(config, ForwardConfig::new("zabbix.local", "edge-router"));
        assert_eq!(config.collector_port, 10051);
        assert_eq!(config.metric_key, "ping");
        assert_eq!(config.sender, "zabbix_sender");
    }

    #[test]
    fn test_missing_target_is_error() {
        let section = ForwardSection {
            collector_address: Some("zabbix.local".to_string()),
            ..Default::default()
        };

        let err = section.resolve().unwrap_err();
        assert!(err.to_string().contains("forward.target_id"));
        assert!(!err.to_string().contains("forward.collector_address"));
    }

    #[test]
    fn test_only_optional_keys_is_error() {
        let section = ForwardSection {
            collector_port: Some(10052),
            ..Default::default()
        };

        let err = section.resolve().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("forward.collector_address"));
        assert!(msg.contains("forward.target_id"));
    }

    #[test]
    fn test_blank_address_counts_as_missing() {
        let section = ForwardSection {
            collector_address: Some("  ".to_string()),
            target_id: Some("edge-router".to_string()),
            ..Default::default()
        };
        assert!(section.resolve().is_err());
    }

    #[test]
    fn test_invalid_values() {
        let zero_port = ForwardConfig::new("zabbix.local", "edge").with_port(0);
        assert!(zero_port.validate().is_err());

        let spaced_key = ForwardConfig::new("zabbix.local", "edge").with_metric_key("icmp ping");
        assert!(spaced_key.validate().is_err());
    }
}
