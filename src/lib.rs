//! pinglog - Ping Latency Logger
//!
//! This crate provides the core functionality for the pinglog daemon. It can
//! be used as a library, or run as a standalone binary with the `pinglog`
//! executable.
//!
//! # Architecture
//!
//! - **Probe**: ICMP round-trip measurement with a bounded timeout
//! - **Scheduler**: wall-clock aligned ticks that never drift
//! - **Storage**: append-only SQLite history, one row per tick
//! - **Window**: bounded in-memory view of the last few days
//! - **Render**: bucketed min/max/mean graph as a static HTML file
//! - **Forward**: optional hand-off of each value to a monitoring collector
//!
//! # Example
//!
//! ```rust,no_run
//! use pinglog::{AppConfig, run_daemon};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("pinglog.yaml")?;
//!     let summary = run_daemon(&config, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     println!("{} ticks recorded", summary.ticks);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod daemon;
pub mod forward;
pub mod probe;
pub mod render;
pub mod scheduler;
pub mod storage;
pub mod window;

pub use config::{AppConfig, ConfigError, ForwardConfig};
pub use daemon::{DaemonError, build_scheduler, render_history, run_daemon};
pub use forward::{ForwardError, Forwarder, SenderForwarder};
pub use probe::{IcmpProbe, Probe, ProbeError};
pub use render::{GraphRenderer, RenderError, RenderSummary, aggregate};
pub use scheduler::{Clock, ManualClock, RunSummary, Scheduler, SystemClock, TickReport};
pub use storage::{PingStore, Sample, StorageError};
pub use window::RollingWindow;
