//! Configuration module for pinglog.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Probe settings (interval, host, timeout)
//! - Forwarding destination (collector address, port, target, metric key)
//! - Storage and graph settings (database path, output, window, bucket)

mod app;
mod forward;
mod validation;

pub use app::{AppConfig, GraphConfig, ProbeConfig, StorageConfig};
pub use forward::{ForwardConfig, ForwardSection};
pub use validation::ConfigError;

// Re-export constants
pub use app::{
    DEFAULT_BUCKET, DEFAULT_CONFIG_PATH, DEFAULT_DB_PATH, DEFAULT_GRAPH_OUTPUT, DEFAULT_HOST,
    DEFAULT_INTERVAL_SECONDS, MAX_WINDOW_DAYS, MIN_INTERVAL_SECONDS,
};
pub use forward::{DEFAULT_COLLECTOR_PORT, DEFAULT_METRIC_KEY, DEFAULT_SENDER, DEFAULT_SENDER_LOG};
