//! Data models for the rewrite pipeline

pub mod generated;
pub mod run_state;
pub mod work_item;

pub use generated::{
    GeneratedBlock, MatchDecision, MatchStrategy, ParseFailure, ParseFailureReason, ParsedSegment,
    ValidationOutcome,
};
pub use run_state::{RunContext, RunStats, RunSummary};
pub use work_item::{Batch, CultivarId, TargetField, WorkItem};
