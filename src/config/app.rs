//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::DEFAULT_TIMEOUT;
use crate::window::DEFAULT_WINDOW_DAYS;

use super::forward::{ForwardConfig, ForwardSection};
use super::validation::{ConfigError, require_non_blank};

// =============================================================================
// Constants
// =============================================================================

/// Configuration file read by both commands, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "pinglog.yaml";

/// Default probe interval in seconds.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 10;

/// Minimum probe interval in seconds.
pub const MIN_INTERVAL_SECONDS: u64 = 1;

/// Default probe target (a public DNS resolver).
pub const DEFAULT_HOST: &str = "8.8.8.8";

/// Default database file.
pub const DEFAULT_DB_PATH: &str = "ping.db";

/// Default graph artifact.
pub const DEFAULT_GRAPH_OUTPUT: &str = "graph/ping.html";

/// Largest accepted rolling window, in days (about a century).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Default aggregation bucket width (5 minutes).
pub const DEFAULT_BUCKET: Duration = Duration::from_secs(300);

fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_graph_output() -> PathBuf {
    PathBuf::from(DEFAULT_GRAPH_OUTPUT)
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_bucket() -> Duration {
    DEFAULT_BUCKET
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// Probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Seconds between ticks; ticks land on multiples of this (default: 10).
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Target host name or address (default: "8.8.8.8").
    #[serde(default = "default_host")]
    pub host: String,

    /// Probe timeout (default: 3s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            host: DEFAULT_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    /// Tick interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file (default: "ping.db").
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Graph Configuration
// =============================================================================

/// Graph rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Output HTML file (default: "graph/ping.html").
    #[serde(default = "default_graph_output")]
    pub output: PathBuf,

    /// Days kept in the rolling window (default: 2).
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Aggregation bucket width (default: 5m).
    #[serde(default = "default_bucket", with = "humantime_serde")]
    pub bucket: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            output: default_graph_output(),
            window_days: DEFAULT_WINDOW_DAYS,
            bucket: DEFAULT_BUCKET,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Configuration file layout, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    probe: ProbeConfig,
    forward: Option<ForwardSection>,
    storage: StorageConfig,
    graph: GraphConfig,
}

/// Validated application configuration.
///
/// Every default is resolved here, before the scheduler is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Probe settings.
    pub probe: ProbeConfig,

    /// Forwarding destination; `None` disables forwarding.
    pub forward: Option<ForwardConfig>,

    /// Storage settings.
    pub storage: StorageConfig,

    /// Graph settings.
    pub graph: GraphConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        let file: ConfigFile = if blank {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let config = Self {
            probe: file.probe,
            forward: file.forward.unwrap_or_default().resolve()?,
            storage: file.storage,
            graph: file.graph,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.interval_seconds < MIN_INTERVAL_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "probe.interval_seconds must be at least {MIN_INTERVAL_SECONDS}"
            )));
        }
        require_non_blank("probe.host", &self.probe.host)?;
        if self.probe.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "probe.timeout must be positive".to_string(),
            ));
        }

        if self.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.path must not be empty".to_string(),
            ));
        }

        if self.graph.output.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "graph.output must not be empty".to_string(),
            ));
        }
        if self.graph.window_days == 0 || self.graph.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::ValidationError(format!(
                "graph.window_days must be between 1 and {MAX_WINDOW_DAYS}"
            )));
        }
        if self.graph.bucket < Duration::from_secs(1) {
            return Err(ConfigError::ValidationError(
                "graph.bucket must be at least 1s".to_string(),
            ));
        }

        if let Some(forward) = &self.forward {
            forward.validate()?;
        }

        Ok(())
    }
}
