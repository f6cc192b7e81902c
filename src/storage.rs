//! Storage Layer
//!
//! Durable SQLite history of ping samples:
//! - **Writer**: the daemon owns one read-write connection for its lifetime
//! - **Reader**: the standalone renderer opens the same file read-only
//!
//! # Components
//!
//! - [`PingStore`]: append-only log with range queries
//! - [`Sample`]: one `(timestamp, optional latency)` observation
//! - [`StorageError`]: storage failures

pub mod db;
mod error;
mod schema;
mod store;
mod types;

pub use error::StorageError;
pub use schema::init_schema;
pub use store::PingStore;
pub use types::Sample;
