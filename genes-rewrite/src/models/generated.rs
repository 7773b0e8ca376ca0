//! Ephemeral per-batch results: parsed blocks, match decisions, validation
//!
//! None of these outlive the batch iteration that produced them.

use super::work_item::{CultivarId, TargetField};
use std::collections::BTreeMap;
use std::fmt;

/// Parsed result for one record in a generator response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBlock {
    /// Name echoed on the block's marker line
    pub name: String,
    /// Every target field is present; missing labels parse as empty text
    pub fields: BTreeMap<TargetField, String>,
}

impl GeneratedBlock {
    /// Block with every target field empty
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: TargetField::ALL
                .into_iter()
                .map(|f| (f, String::new()))
                .collect(),
        }
    }

    pub fn with_field(mut self, field: TargetField, text: impl Into<String>) -> Self {
        self.fields.insert(field, text.into());
        self
    }

    pub fn field(&self, field: TargetField) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or("")
    }

    /// Fields carrying non-empty text, in grammar order
    pub fn non_empty_fields(&self) -> impl Iterator<Item = (TargetField, &str)> {
        self.fields
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(field, text)| (*field, text.as_str()))
    }
}

/// Why a marker line could not open a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailureReason {
    /// `===CULTIVAR: ===` with nothing between the delimiters
    EmptyName,
    /// The name itself contains the `===` delimiter
    DelimiterInName,
}

impl fmt::Display for ParseFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailureReason::EmptyName => f.write_str("marker has an empty name"),
            ParseFailureReason::DelimiterInName => {
                f.write_str("marker name contains the block delimiter")
            }
        }
    }
}

/// A marker line that was recognised but rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// 1-based line number in the raw response
    pub line: usize,
    /// The offending marker line, trimmed
    pub marker: String,
    pub reason: ParseFailureReason,
}

/// One unit of parser output, in response order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSegment {
    Block(GeneratedBlock),
    Failure(ParseFailure),
}

/// Strategy that bound a work item to a block, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    /// One name is a case-insensitive substring of the other
    Containment,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Exact => f.write_str("exact"),
            MatchStrategy::CaseInsensitive => f.write_str("case-insensitive"),
            MatchStrategy::Containment => f.write_str("containment"),
        }
    }
}

/// A work item bound to the block generated for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDecision {
    pub item_id: CultivarId,
    pub block: GeneratedBlock,
    pub strategy: MatchStrategy,
    /// Containment match where another unmatched item also fit this block
    pub ambiguous: bool,
}

/// Non-blocking validation result for one matched record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
