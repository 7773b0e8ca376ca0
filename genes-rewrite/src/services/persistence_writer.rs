//! Batch-atomic persistence of generated fields
//!
//! One transaction per batch. A row becomes complete (and leaves the pending
//! selection) when its tagline is committed non-empty. Every changed column
//! also gets a `cultivar_history` row inside the same transaction.

use crate::db::cultivars;
use crate::error::{RewriteError, RewriteResult};
use crate::models::{CultivarId, GeneratedBlock, TargetField};
use crate::utils::retry_on_lock;
use sqlx::SqlitePool;
use std::time::Duration;

/// Generated values accepted for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub cultivar_id: CultivarId,
    /// Non-empty values only, in grammar order
    pub fields: Vec<(TargetField, String)>,
}

impl PendingWrite {
    /// Empty generated fields are dropped so existing text is kept
    pub fn from_block(cultivar_id: CultivarId, block: &GeneratedBlock) -> Self {
        Self {
            cultivar_id,
            fields: block
                .non_empty_fields()
                .map(|(field, text)| (field, text.to_string()))
                .collect(),
        }
    }
}

/// What one committed batch changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Records with at least one column written
    pub records_updated: usize,
    pub fields_written: usize,
    pub history_rows: usize,
    /// Ids absent from the store at commit time
    pub missing: Vec<CultivarId>,
}

pub struct PersistenceWriter {
    db: SqlitePool,
    max_lock_wait: Duration,
}

impl PersistenceWriter {
    pub fn new(db: SqlitePool, max_lock_wait: Duration) -> Self {
        Self { db, max_lock_wait }
    }

    /// Commit every write of a batch, or none of them
    pub async fn commit_batch(&self, writes: &[PendingWrite]) -> RewriteResult<CommitSummary> {
        if writes.iter().all(|w| w.fields.is_empty()) {
            return Ok(CommitSummary::default());
        }

        let summary = retry_on_lock("batch commit", self.max_lock_wait, || {
            self.write_batch(writes)
        })
        .await
        .map_err(RewriteError::store)?;

        tracing::debug!(
            records = summary.records_updated,
            fields = summary.fields_written,
            history = summary.history_rows,
            "Committed batch"
        );

        Ok(summary)
    }

    async fn write_batch(&self, writes: &[PendingWrite]) -> genes_common::Result<CommitSummary> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let mut summary = CommitSummary::default();
        let mut tx = self.db.begin().await?;

        for write in writes.iter().filter(|w| !w.fields.is_empty()) {
            let Some(current) = cultivars::load_target_fields(&mut *tx, write.cultivar_id).await?
            else {
                tracing::warn!(
                    cultivar_id = write.cultivar_id,
                    "Record disappeared before commit, skipping"
                );
                summary.missing.push(write.cultivar_id);
                continue;
            };

            let values: Vec<(TargetField, &str)> = write
                .fields
                .iter()
                .map(|(field, text)| (*field, text.as_str()))
                .collect();

            cultivars::update_target_fields(&mut *tx, write.cultivar_id, &values).await?;

            for (field, new_value) in &values {
                let old_value = current.get(field).map(String::as_str).unwrap_or("");
                if old_value != *new_value {
                    cultivars::insert_history(
                        &mut *tx,
                        write.cultivar_id,
                        *field,
                        old_value,
                        new_value,
                        &timestamp,
                    )
                    .await?;
                    summary.history_rows += 1;
                }
            }

            summary.records_updated += 1;
            summary.fields_written += values.len();
        }

        tx.commit().await?;
        Ok(summary)
    }
}
