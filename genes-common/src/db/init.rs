//! Store connection and schema bootstrap
//!
//! The register web application owns `genes.db`. Tools open it alongside the
//! running server, so every connection is configured for shared access:
//! foreign keys on, WAL journaling, and a bounded busy timeout so lock waits
//! surface as errors the caller can retry instead of hanging.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// How to open the store file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// File must already exist (production: the web application created it)
    ReadWrite,
    /// Create the file and parent directory when missing (tests, first run)
    Create,
}

/// Open a connection pool on the store at `db_path`
pub async fn open_store(db_path: &Path, mode: OpenMode) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    match mode {
        OpenMode::ReadWrite if newly_created => {
            return Err(Error::NotFound(format!(
                "Database file does not exist: {}",
                db_path.display()
            )));
        }
        OpenMode::Create => {
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        OpenMode::ReadWrite => {}
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(mode == OpenMode::Create)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Open the store and make sure the register tables exist
pub async fn init_database(db_path: &Path, mode: OpenMode) -> Result<SqlitePool> {
    let pool = open_store(db_path, mode).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Idempotent schema bootstrap (safe to call against a live store)
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    create_cultivar_table(pool).await?;
    create_cultivar_history_table(pool).await?;
    Ok(())
}

pub async fn create_cultivar_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cultivar (
            id INTEGER PRIMARY KEY,
            cultivar VARCHAR(200) NOT NULL,
            epithet VARCHAR(300) DEFAULT '',
            category VARCHAR(20) DEFAULT '',
            color_form VARCHAR(200) DEFAULT '',
            tagline TEXT DEFAULT '',
            description TEXT DEFAULT '',
            notes TEXT DEFAULT '',
            image_url VARCHAR(500) DEFAULT '',
            photo_url VARCHAR(500) DEFAULT '',
            validated BOOLEAN DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_cultivar_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cultivar_history (
            id INTEGER PRIMARY KEY,
            cultivar_id INTEGER NOT NULL REFERENCES cultivar(id),
            field_name VARCHAR(50) NOT NULL,
            old_value TEXT,
            new_value TEXT,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// True when `table` exists in the store
pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}
