//! Integration tests for store opening and schema bootstrap

use genes_common::db::{ensure_schema, init_database, open_store, table_exists, OpenMode};
use genes_common::Error;
use tempfile::TempDir;

#[tokio::test]
async fn test_read_write_mode_requires_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("genes.db");

    let result = open_store(&db_path, OpenMode::ReadWrite).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(!db_path.exists(), "read-write mode must not create the store");
}

#[tokio::test]
async fn test_create_mode_creates_file_and_tables() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("data").join("genes.db");

    let pool = init_database(&db_path, OpenMode::Create).await.unwrap();

    assert!(db_path.exists());
    assert!(table_exists(&pool, "cultivar").await.unwrap());
    assert!(table_exists(&pool, "cultivar_history").await.unwrap());
    assert!(!table_exists(&pool, "nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_schema_bootstrap_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("genes.db");
    let pool = init_database(&db_path, OpenMode::Create).await.unwrap();

    sqlx::query("INSERT INTO cultivar (id, cultivar) VALUES (1, 'Kumasaka')")
        .execute(&pool)
        .await
        .unwrap();

    ensure_schema(&pool).await.unwrap();
    ensure_schema(&pool).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cultivar")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "bootstrap must not touch existing rows");
}

#[tokio::test]
async fn test_reopen_existing_store_in_read_write_mode() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("genes.db");

    let pool = init_database(&db_path, OpenMode::Create).await.unwrap();
    sqlx::query("INSERT INTO cultivar (id, cultivar) VALUES (7, 'Asakura')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let reopened = open_store(&db_path, OpenMode::ReadWrite).await.unwrap();
    let name: String = sqlx::query_scalar("SELECT cultivar FROM cultivar WHERE id = 7")
        .fetch_one(&reopened)
        .await
        .unwrap();
    assert_eq!(name, "Asakura");
}
