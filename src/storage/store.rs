//! Append-only ping history.
//!
//! [`PingStore`] wraps the one connection the process holds. The daemon
//! opens it read-write and is the only writer; the standalone renderer opens
//! the same file read-only. Rows are never updated or deleted.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;

use crate::storage::StorageError;
use crate::storage::db::sqlite;
use crate::storage::schema::init_schema;
use crate::storage::types::{Sample, decode_timestamp, encode_timestamp};

/// Durable, time-ordered log of samples.
pub struct PingStore {
    conn: SqliteConnection,
    read_only: bool,
}

impl std::fmt::Debug for PingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingStore")
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl PingStore {
    /// Open (or create) the store for writing and initialize the schema.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Internal(format!(
                    "Failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut conn = sqlite::connect_writer(db_path).await?;
        init_schema(&mut conn).await?;
        tracing::debug!(path = %db_path.display(), "Store opened for writing");

        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Open an existing store without write access.
    pub async fn open_read_only(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        let conn = sqlite::connect_reader(db_path).await?;
        tracing::debug!(path = %db_path.display(), "Store opened read-only");

        Ok(Self {
            conn,
            read_only: true,
        })
    }

    /// Open a private in-memory store.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let mut conn = sqlite::connect_memory().await?;
        init_schema(&mut conn).await?;

        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Whether this handle refuses writes.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Append one sample in its own transaction.
    ///
    /// Returns the row id. Once this returns `Ok` the row survives a process
    /// kill; on `Err` nothing was written.
    pub async fn append(&mut self, sample: &Sample) -> Result<i64, StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }

        let mut tx = self.conn.begin().await?;
        let id = sqlx::query("INSERT INTO ping (latency, created_at) VALUES (?, ?)")
            .bind(sample.latency_ms)
            .bind(encode_timestamp(sample.ts))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        tx.commit().await?;

        Ok(id)
    }

    /// All samples strictly newer than `since`, oldest first.
    ///
    /// Comparison and ordering go through `strftime`, so space-separated and
    /// RFC 3339 rows sort together by time rather than by text.
    pub async fn query_range(&mut self, since: DateTime<Utc>) -> Result<Vec<Sample>, StorageError> {
        let rows: Vec<(Option<f64>, String)> = sqlx::query_as(
            "SELECT latency, created_at FROM ping \
             WHERE strftime('%Y-%m-%dT%H:%M:%f', created_at) > strftime('%Y-%m-%dT%H:%M:%f', ?) \
             ORDER BY strftime('%Y-%m-%dT%H:%M:%f', created_at), id",
        )
        .bind(encode_timestamp(since))
        .fetch_all(&mut self.conn)
        .await?;

        rows_to_samples(rows)
    }

    /// The full history, oldest first.
    pub async fn query_all(&mut self) -> Result<Vec<Sample>, StorageError> {
        let rows: Vec<(Option<f64>, String)> =
            sqlx::query_as(
                "SELECT latency, created_at FROM ping \
                 ORDER BY strftime('%Y-%m-%dT%H:%M:%f', created_at), id",
            )
                .fetch_all(&mut self.conn)
                .await?;

        rows_to_samples(rows)
    }

    /// Number of stored samples.
    pub async fn count(&mut self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ping")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<(), StorageError> {
        self.conn.close().await?;
        Ok(())
    }
}

fn rows_to_samples(rows: Vec<(Option<f64>, String)>) -> Result<Vec<Sample>, StorageError> {
    rows.into_iter()
        .map(|(latency, created_at)| Ok(Sample::new(decode_timestamp(&created_at)?, latency)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_query_all() {
        let mut store = PingStore::open_in_memory().await.unwrap();

        let first = store.append(&Sample::success(at(10), 12.5)).await.unwrap();
        let second = store.append(&Sample::failure(at(20))).await.unwrap();
        assert!(second > first);

        let all = store.query_all().await.unwrap();
        assert_eq!(
            all,
            vec![Sample::success(at(10), 12.5), Sample::failure(at(20))]
        );
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_stored_as_null() {
        let mut store = PingStore::open_in_memory().await.unwrap();
        store.append(&Sample::failure(at(10))).await.unwrap();

        let (latency,): (Option<f64>,) = sqlx::query_as("SELECT latency FROM ping")
            .fetch_one(&mut store.conn)
            .await
            .unwrap();
        assert_eq!(latency, None);
    }

    #[tokio::test]
    async fn test_query_range_is_exclusive_and_ordered() {
        let mut store = PingStore::open_in_memory().await.unwrap();

        // Out-of-order insert must still come back in time order
        for secs in [30, 10, 20, 40] {
            store
                .append(&Sample::success(at(secs), secs as f64))
                .await
                .unwrap();
        }

        let recent = store.query_range(at(20)).await.unwrap();
        let times: Vec<_> = recent.iter().map(|s| s.ts).collect();
        assert_eq!(times, vec![at(30), at(40)]);

        let everything = store.query_range(at(0) - Duration::days(1)).await.unwrap();
        assert_eq!(everything.len(), 4);
        assert!(everything.windows(2).all(|w| w[0].ts <= w[1].ts));
    }

    #[tokio::test]
    async fn test_query_empty_store() {
        let mut store = PingStore::open_in_memory().await.unwrap();
        assert!(store.query_all().await.unwrap().is_empty());
        assert!(store.query_range(at(0)).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ping.db");

        let mut store = PingStore::open(&path).await.unwrap();
        store.append(&Sample::success(at(10), 1.0)).await.unwrap();
        store.close().await.unwrap();

        let mut store = PingStore::open(&path).await.unwrap();
        store.append(&Sample::success(at(20), 2.0)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_only_store_rejects_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ping.db");

        let mut writer = PingStore::open(&path).await.unwrap();
        writer.append(&Sample::success(at(10), 5.0)).await.unwrap();

        // Reader sees committed rows while the writer is still open
        let mut reader = PingStore::open_read_only(&path).await.unwrap();
        assert!(reader.is_read_only());
        assert_eq!(reader.query_all().await.unwrap().len(), 1);

        let err = reader.append(&Sample::success(at(20), 6.0)).await.unwrap_err();
        assert!(matches!(err, StorageError::ReadOnly));

        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_space_separated_timestamps() {
        let mut store = PingStore::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO ping (latency, created_at) VALUES (3.5, '2023-11-14 22:13:30')")
            .execute(&mut store.conn)
            .await
            .unwrap();

        let all = store.query_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ts, at(10));
        assert_eq!(all[0].latency_ms, Some(3.5));
    }

    #[tokio::test]
    async fn test_query_range_mixes_space_separated_rows() {
        let mut store = PingStore::open_in_memory().await.unwrap();
        for raw in [
            "2024-01-01 12:00:00",
            "2024-01-01T03:00:00.000Z",
            "2024-01-01T09:00:00.000Z",
            "2024-01-01 04:00:00.250000",
        ] {
            sqlx::query("INSERT INTO ping (latency, created_at) VALUES (1.0, ?)")
                .bind(raw)
                .execute(&mut store.conn)
                .await
                .unwrap();
        }

        let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap();
        let recent = store.query_range(cutoff).await.unwrap();
        let hours: Vec<_> = recent.iter().map(|s| s.ts.format("%H:%M").to_string()).collect();
        assert_eq!(hours, vec!["09:00", "12:00"]);

        let all = store.query_all().await.unwrap();
        assert!(all.windows(2).all(|w| w[0].ts <= w[1].ts));
        assert_eq!(all.len(), 4);
    }
}
