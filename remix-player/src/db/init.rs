//! Database initialization
//!
//! Opens the SQLite pool in read-write-create mode and ensures the
//! storage schema exists before any other query runs.

use std::path::Path;
use std::time::Duration;

use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::error::Result;

/// Connect to the SQLite database, creating the file if missing
pub async fn connect(database_path: &Path) -> Result<Pool<Sqlite>> {
    let db_url = format!("sqlite:{}?mode=rwc", database_path.display());
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(60)))
        .connect(&db_url)
        .await?;

    info!("Connected to database: {:?}", database_path);
    Ok(pool)
}

/// Create the storage table if it does not exist
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage (
            namespace TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn memory_pool() -> Pool<Sqlite> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
