//! Cultivar row queries
//!
//! Write helpers take a `SqliteConnection` so callers can run them inside one
//! transaction (`&mut *tx`).

use crate::models::{CultivarId, TargetField};
use genes_common::db::Cultivar;
use genes_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;

/// Selection bounds for pending rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingQuery {
    /// Only rows with `id >= start_id`
    pub start_id: Option<CultivarId>,
    /// At most this many rows
    pub limit: Option<usize>,
}

/// Rows whose tagline is still empty, ascending by id
pub async fn select_pending(pool: &SqlitePool, query: PendingQuery) -> Result<Vec<Cultivar>> {
    let mut sql = String::from(
        r#"
        SELECT id, cultivar, epithet, category, color_form, tagline,
               description, notes, image_url, photo_url
        FROM cultivar
        WHERE (tagline IS NULL OR tagline = '')
        "#,
    );

    if query.start_id.is_some() {
        sql.push_str(" AND id >= ?");
    }
    sql.push_str(" ORDER BY id");
    if query.limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut q = sqlx::query_as::<_, Cultivar>(&sql);
    if let Some(start_id) = query.start_id {
        q = q.bind(start_id);
    }
    if let Some(limit) = query.limit {
        q = q.bind(limit as i64);
    }

    let rows = q.fetch_all(pool).await?;
    Ok(rows)
}

/// Count of rows still pending
pub async fn count_pending(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cultivar WHERE (tagline IS NULL OR tagline = '')",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Current values of the target columns for one row
pub async fn load_target_fields(
    conn: &mut SqliteConnection,
    id: CultivarId,
) -> Result<Option<BTreeMap<TargetField, String>>> {
    let row = sqlx::query("SELECT tagline, description, notes FROM cultivar WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| {
        TargetField::ALL
            .into_iter()
            .map(|field| {
                let value: Option<String> = row.get(field.column());
                (field, value.unwrap_or_default())
            })
            .collect()
    }))
}

/// Write the given target columns for one row; returns rows affected
pub async fn update_target_fields(
    conn: &mut SqliteConnection,
    id: CultivarId,
    values: &[(TargetField, &str)],
) -> Result<u64> {
    if values.is_empty() {
        return Ok(0);
    }

    // Column names come from `TargetField`, never from input
    let assignments: Vec<String> = values
        .iter()
        .map(|(field, _)| format!("{} = ?", field.column()))
        .collect();
    let sql = format!("UPDATE cultivar SET {} WHERE id = ?", assignments.join(", "));

    let mut q = sqlx::query(&sql);
    for (_, text) in values {
        q = q.bind(*text);
    }
    let result = q.bind(id).execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

/// Append one audit row
pub async fn insert_history(
    conn: &mut SqliteConnection,
    id: CultivarId,
    field: TargetField,
    old_value: &str,
    new_value: &str,
    timestamp: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cultivar_history (cultivar_id, field_name, old_value, new_value, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(field.column())
    .bind(old_value)
    .bind(new_value)
    .bind(timestamp)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
