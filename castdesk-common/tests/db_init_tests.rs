//! Tests for database initialization
//!
//! - Automatic database creation with the profiles schema
//! - Reopening an existing database keeps its rows
//! - Connection pragmas (WAL, busy timeout)

use castdesk_common::db::{init_database, ProfileStore, SqliteProfileStore, BUSY_TIMEOUT_MS};
use castdesk_common::ProfileRecord;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("castdesk.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_profiles_table_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("castdesk.db")).await.unwrap();

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'profiles'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_database_reopen_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("castdesk.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        let store = SqliteProfileStore::new(pool.clone());
        store
            .insert(&ProfileRecord::new("u1", "acting"))
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let store = SqliteProfileStore::new(pool);
    let record = store.fetch("u1").await.unwrap();
    assert!(record.is_some(), "Row should survive reopening the database");
}

#[tokio::test]
async fn test_connections_use_wal_and_busy_timeout() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("castdesk.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode, "wal");

    let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(timeout, BUSY_TIMEOUT_MS as i64);
}
