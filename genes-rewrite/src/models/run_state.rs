//! Per-invocation run state
//!
//! Scoped to one process run and never persisted: resumability comes from
//! the records themselves (an empty tagline means pending), not from here.

use super::work_item::CultivarId;
use crate::services::WarningSink;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// Counters reported in the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Work items returned by selection
    pub selected: usize,
    /// Batches attempted
    pub batches: usize,
    /// Batches skipped after retries were exhausted
    pub batches_failed: usize,
    /// Records persisted (dry run: records that would have been sent)
    pub processed: usize,
    /// Persisted records with at least one warning
    pub warned: usize,
    /// Records with no matching block
    pub unmatched: usize,
    /// Marker lines rejected by the parser
    pub parse_failures: usize,
    /// Containment matches flagged as ambiguous
    pub ambiguous_matches: usize,
    /// Individual column values written
    pub fields_written: usize,
}

/// Explicit run context handed to each pipeline stage
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub stats: RunStats,
    /// Highest identity whose batch finished (committed or skipped)
    pub resume_cursor: Option<CultivarId>,
    pub warnings: WarningSink,
}

impl RunContext {
    pub fn new(warnings: WarningSink) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            stats: RunStats::default(),
            resume_cursor: None,
            warnings,
        }
    }

    /// Advance the cursor past a finished batch
    pub fn advance_cursor(&mut self, id: CultivarId) {
        self.resume_cursor = Some(self.resume_cursor.map_or(id, |c| c.max(id)));
    }

    pub fn summary(&self, dry_run: bool, stopped_early: bool) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            dry_run,
            stats: self.stats.clone(),
            warning_log: self.warnings.path().map(|p| p.to_path_buf()),
            warnings_logged: self.warnings.len(),
            next_start_id: if stopped_early {
                self.resume_cursor.map(|c| c + 1)
            } else {
                None
            },
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub stats: RunStats,
    pub warning_log: Option<PathBuf>,
    pub warnings_logged: usize,
    /// `--start-id` hint when the run did not reach the end of the selection
    pub next_start_id: Option<CultivarId>,
}

impl RunSummary {
    /// Human-readable summary lines printed at the end of a run
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.dry_run {
            lines.push(format!(
                "Dry run complete. Would process: {} records in {} batches",
                self.stats.processed, self.stats.batches
            ));
            return lines;
        }

        lines.push(format!(
            "Done. Processed: {}, Warnings: {}",
            self.stats.processed, self.stats.warned
        ));

        if self.stats.unmatched > 0 {
            lines.push(format!(
                "Unmatched records: {} (still pending, re-run to retry)",
                self.stats.unmatched
            ));
        }

        if self.stats.batches_failed > 0 {
            lines.push(format!(
                "Failed batches: {} (records still pending, re-run to retry)",
                self.stats.batches_failed
            ));
        }

        if self.warnings_logged > 0 {
            if let Some(path) = &self.warning_log {
                lines.push(format!("See {} for details.", path.display()));
            }
        }

        if let Some(next) = self.next_start_id {
            lines.push(format!("Resume with --start-id {}", next));
        }

        lines
    }
}
