//! SQLite backend implementation using sqlx.
//!
//! Opens single long-lived connections with WAL journaling, so the
//! standalone renderer can read while the daemon writes.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous,
};

use crate::storage::StorageError;

/// How long a statement waits on a lock held by another process.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection options for the single writer.
///
/// - WAL journal mode so readers never block the writer
/// - Normal synchronous mode: a committed transaction survives a process kill
/// - Create database if not exists
pub fn writer_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(DEFAULT_BUSY_TIMEOUT)
        .create_if_missing(true)
}

/// Connection options for a reader that must never write.
pub fn reader_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .busy_timeout(DEFAULT_BUSY_TIMEOUT)
        .read_only(true)
}

/// Open the writer connection.
pub async fn connect_writer(path: &Path) -> Result<SqliteConnection, StorageError> {
    Ok(writer_options(path).connect().await?)
}

/// Open a read-only connection.
pub async fn connect_reader(path: &Path) -> Result<SqliteConnection, StorageError> {
    Ok(reader_options(path).connect().await?)
}

/// Open a private in-memory database.
pub async fn connect_memory() -> Result<SqliteConnection, StorageError> {
    Ok(SqliteConnectOptions::from_str("sqlite::memory:")?
        .connect()
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    #[tokio::test]
    async fn test_sqlite_memory_connect() {
        let mut conn = connect_memory().await.unwrap();

        let row: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.0, 1);

        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_writer_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = connect_writer(&dir.path().join("wal.db")).await.unwrap();

        let row: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.0, "wal");
    }

    #[tokio::test]
    async fn test_sqlite_reader_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        assert!(connect_reader(&path).await.is_err());
        assert!(!path.exists());
    }
}
