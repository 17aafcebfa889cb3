//! Database access for ktn-search
//!
//! The search service never writes; the pool is opened read-only while the
//! sync process keeps writing through WAL.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// Connect to the order database with SQLite `mode=ro`
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nRun `ktn-sync init-db` first to create it.",
            db_path.display()
        );
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database in read-only mode")?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktn_common::db::init_database;

    #[tokio::test]
    async fn test_missing_database_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = connect_readonly(&dir.path().join("missing.db"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Database not found"));
    }

    #[tokio::test]
    async fn test_readonly_connection_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ktn.db");
        init_database(&path).await.unwrap().close().await;

        let pool = connect_readonly(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let write = sqlx::query("CREATE TABLE _test_write (id INTEGER)")
            .execute(&pool)
            .await;
        assert!(write.is_err());
    }
}
