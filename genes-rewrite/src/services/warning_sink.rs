//! Append-only operator warning log
//!
//! Each entry is one `(record identity, warning text)` pair. Entries are
//! mirrored to tracing and kept in memory for the run summary; the pipeline
//! never reads the log file back.

use crate::models::CultivarId;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One logged warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningEntry {
    pub cultivar_id: CultivarId,
    pub name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl WarningEntry {
    /// Line written to the warning log
    pub fn to_log_line(&self) -> String {
        format!(
            "{} id={} [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.cultivar_id,
            self.name,
            self.message
        )
    }
}

/// Warning sink owned by the run context
#[derive(Debug, Default)]
pub struct WarningSink {
    path: Option<PathBuf>,
    /// Opened on first warning so clean runs leave no file behind
    file: Option<File>,
    entries: Vec<WarningEntry>,
}

impl WarningSink {
    /// Sink appending to `path` (created on first warning)
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            file: None,
            entries: Vec::new(),
        }
    }

    /// Sink that only keeps entries in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[WarningEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a warning for one cultivar
    ///
    /// A failing log file never stops the run; the failure is logged and the
    /// entry is still kept in memory.
    pub fn record(&mut self, cultivar_id: CultivarId, name: &str, message: impl Into<String>) {
        let entry = WarningEntry {
            cultivar_id,
            name: name.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        };

        tracing::warn!(
            cultivar_id,
            cultivar = %entry.name,
            "{}",
            entry.message
        );

        if let Err(e) = self.append(&entry) {
            tracing::error!(
                path = ?self.path,
                error = %e,
                "Failed to append to warning log"
            );
        }

        self.entries.push(entry);
    }

    fn append(&mut self, entry: &WarningEntry) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if self.file.is_none() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", entry.to_log_line())?;
            file.flush()?;
        }

        Ok(())
    }
}
