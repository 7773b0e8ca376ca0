//! Style heuristics for generated prose
//!
//! Warnings only. Nothing here can stop a record from being written.

use crate::models::{GeneratedBlock, TargetField, ValidationOutcome, WorkItem};

/// Default keywords a notes field must not open with
pub const DEFAULT_CATEGORY_KEYWORDS: [&str; 4] = ["japonica", "sasanqua", "reticulata", "camellia"];

/// Characters counted as sentence terminators in a tagline
const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Window of notes text inspected for a forbidden opening
const OPENING_WINDOW: usize = 60;

/// Leading word tokens inspected for the cultivar's own name
const OPENING_TOKENS: usize = 3;

#[derive(Debug, Clone)]
pub struct Validator {
    category_keywords: Vec<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }
}

impl Validator {
    pub fn new(category_keywords: Vec<String>) -> Self {
        Self {
            category_keywords: category_keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn validate(
        &self,
        item: &WorkItem,
        block: &GeneratedBlock,
        ambiguous: bool,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        let tagline = block.field(TargetField::Tagline);
        let description = block.field(TargetField::Description);
        let notes = block.field(TargetField::Notes);

        if tagline.chars().filter(|c| TERMINATORS.contains(c)).count() > 2 {
            outcome.warn("Tagline may contain multiple sentences");
        }

        if description.matches(';').count() > 2 {
            outcome.warn("Description uses semicolons as delimiters");
        }

        if !notes.is_empty() {
            self.check_notes_opening(item, notes, &mut outcome);
        }

        for field in TargetField::ALL {
            if block.field(field).is_empty() {
                outcome.warn(format!("Empty {}", field));
            }
        }

        if ambiguous {
            outcome.warn(format!(
                "Ambiguous containment match for block '{}'",
                block.name
            ));
        }

        outcome
    }

    fn check_notes_opening(&self, item: &WorkItem, notes: &str, outcome: &mut ValidationOutcome) {
        let opening: String = notes.chars().take(OPENING_WINDOW).collect::<String>().to_lowercase();
        let tokens: Vec<&str> = opening
            .split_whitespace()
            .take(OPENING_TOKENS)
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .collect();

        let first_name_word = item
            .name
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .unwrap_or_default();

        if !first_name_word.is_empty() && tokens.iter().any(|t| *t == first_name_word) {
            outcome.warn("Notes opens with cultivar name");
        }

        let stripped = opening.trim_start_matches(|c: char| !c.is_alphanumeric());
        if let Some(keyword) = self
            .category_keywords
            .iter()
            .find(|k| stripped.starts_with(k.as_str()))
        {
            outcome.warn(format!("Notes opens with species name '{}'", keyword));
        }
    }
}
