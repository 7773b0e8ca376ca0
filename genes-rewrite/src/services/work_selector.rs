//! Work selection
//!
//! Pending means "tagline empty", not "not seen this run": re-running after a
//! crash or a partial run returns exactly the records still incomplete.

use crate::db::cultivars::{self, PendingQuery};
use crate::error::{RewriteError, RewriteResult};
use crate::models::{CultivarId, WorkItem};
use sqlx::SqlitePool;

/// Selects pending work items from the store
pub struct WorkSelector {
    db: SqlitePool,
}

impl WorkSelector {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Pending items in ascending id order
    ///
    /// `start_id` and `limit` bound the selection; `limit == Some(0)` is
    /// treated as unbounded to match the `--limit 0` CLI convention.
    pub async fn select(
        &self,
        start_id: Option<CultivarId>,
        limit: Option<usize>,
    ) -> RewriteResult<Vec<WorkItem>> {
        let query = PendingQuery {
            start_id,
            limit: limit.filter(|l| *l > 0),
        };

        let rows = cultivars::select_pending(&self.db, query)
            .await
            .map_err(RewriteError::store)?;

        tracing::debug!(
            start_id = ?query.start_id,
            limit = ?query.limit,
            selected = rows.len(),
            "Selected pending cultivars"
        );

        Ok(rows.into_iter().map(WorkItem::from).collect())
    }
}
