//! Work items and batches
//!
//! A `WorkItem` is a pending `cultivar` row: its tagline is still empty.
//! Writing a non-empty tagline is what completes it, so selection never needs
//! any bookkeeping beyond the row itself.

use genes_common::db::Cultivar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable record identity (`cultivar.id`)
pub type CultivarId = i64;

/// Prose fields regenerated by the pipeline, in response-grammar order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetField {
    /// Short-form: one punchy sentence
    Tagline,
    /// Medium-form: one flowing sentence of key facts
    Description,
    /// Long-form: 3-6 sentence narrative
    Notes,
}

impl TargetField {
    pub const ALL: [TargetField; 3] = [
        TargetField::Tagline,
        TargetField::Description,
        TargetField::Notes,
    ];

    /// Label introducing the field in a response block
    pub fn label(self) -> &'static str {
        match self {
            TargetField::Tagline => "TAGLINE",
            TargetField::Description => "DESCRIPTION",
            TargetField::Notes => "NOTES",
        }
    }

    /// Column in the `cultivar` table
    pub fn column(self) -> &'static str {
        match self {
            TargetField::Tagline => "tagline",
            TargetField::Description => "description",
            TargetField::Notes => "notes",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A cultivar awaiting regenerated prose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: CultivarId,
    /// Display name (`cultivar` column)
    pub name: String,
    pub epithet: String,
    pub category: String,
    pub color_form: String,
    /// Existing text, used as source material for the rewrite
    pub description: String,
    pub notes: String,
}

impl WorkItem {
    pub fn new(id: CultivarId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            epithet: String::new(),
            category: String::new(),
            color_form: String::new(),
            description: String::new(),
            notes: String::new(),
        }
    }
}

impl From<Cultivar> for WorkItem {
    fn from(row: Cultivar) -> Self {
        Self {
            id: row.id,
            name: row.cultivar,
            epithet: row.epithet.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            color_form: row.color_form.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
        }
    }
}

/// Ordered group of work items sent in one API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position among the run's batches
    pub number: usize,
    /// Total number of batches in the run
    pub total: usize,
    pub items: Vec<WorkItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }

    /// Highest identity in the batch (items are in ascending id order)
    pub fn last_id(&self) -> Option<CultivarId> {
        self.items.last().map(|i| i.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for field in TargetField::ALL {
            assert_eq!(TargetField::from_label(field.label()), Some(field));
        }
        assert_eq!(TargetField::from_label("tagline"), None);
        assert_eq!(TargetField::from_label("IMAGE URL"), None);
    }

    #[test]
    fn test_from_row_defaults_null_columns() {
        let row = Cultivar {
            id: 12,
            cultivar: "Kumasaka".to_string(),
            epithet: None,
            category: Some("J".to_string()),
            ..Default::default()
        };

        let item = WorkItem::from(row);
        assert_eq!(item.id, 12);
        assert_eq!(item.name, "Kumasaka");
        assert_eq!(item.epithet, "");
        assert_eq!(item.category, "J");
    }
}
