//! Database backend layer.
//!
//! Currently SQLite only. The store owns exactly one connection: a writer
//! for the daemon, or a read-only handle for the standalone renderer.
//!
//! # Example
//!
//! ```ignore
//! let mut conn = sqlite::connect_writer(Path::new("ping.db")).await?;
//! let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&mut conn).await?;
//! ```

pub mod sqlite;
