//! Database Test Utilities
//!
//! Temporary register stores seeded with cultivar rows

use anyhow::Result;
use genes_common::db::{init_database, OpenMode};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary store; the directory lives as long as this value
pub struct TestStore {
    pub dir: TempDir,
    pub path: PathBuf,
    pub pool: SqlitePool,
}

impl TestStore {
    pub fn warning_log(&self) -> PathBuf {
        self.dir.path().join("rewrite_warnings.log")
    }
}

/// Create an empty register store in a temporary directory
pub async fn create_test_db() -> Result<TestStore> {
    let dir = TempDir::new()?;
    let path = dir.path().join("genes.db");
    let pool = init_database(&path, OpenMode::Create).await?;
    Ok(TestStore { dir, path, pool })
}

/// Insert pending cultivars (empty tagline, existing description and notes)
pub async fn seed_cultivars(pool: &SqlitePool, rows: &[(i64, &str)]) -> Result<()> {
    for (id, name) in rows {
        sqlx::query(
            r#"
            INSERT INTO cultivar (id, cultivar, epithet, category, color_form, description, notes)
            VALUES (?, ?, ?, 'J', 'Pink / Semi-double', 'Med; semi-dbl; pink.', 'Old register text.')
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(format!("Camellia japonica '{}'", name))
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Ids whose tagline is still empty, ascending
pub async fn pending_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT id FROM cultivar WHERE tagline IS NULL OR tagline = '' ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn tagline_of(pool: &SqlitePool, id: i64) -> Result<Option<String>> {
    let tagline = sqlx::query_scalar("SELECT tagline FROM cultivar WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(tagline)
}

pub async fn history_count(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM cultivar_history")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
