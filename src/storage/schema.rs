//! Database schema definitions.

use sqlx::sqlite::SqliteConnection;

use crate::storage::StorageError;

/// SQL statement for creating the `ping` table.
///
/// `latency` is NULL for failed probes. `created_at` holds fixed-width
/// RFC 3339 UTC text, so text order is time order.
pub const PING_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS ping (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    latency    REAL,
    created_at TEXT NOT NULL
);
"#;

/// Index backing the range query used to seed the rolling window.
pub const PING_CREATED_AT_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS idx_ping_created_at ON ping (created_at);";

/// Initialize the database schema.
///
/// Creates the table and index if they don't exist.
pub async fn init_schema(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    sqlx::query(PING_TABLE_DDL).execute(&mut *conn).await?;
    sqlx::query(PING_CREATED_AT_INDEX_DDL)
        .execute(&mut *conn)
        .await?;

    tracing::info!("Database schema initialized");
    Ok(())
}
