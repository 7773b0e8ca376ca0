//! Pipeline stages
//!
//! WorkSelector → Batcher → PromptBuilder → ContentClient → ResponseParser →
//! RecordMatcher → Validator → PersistenceWriter, driven by `pipeline`.
//! Only the content client (network) and the persistence writer (store)
//! have side effects.

pub mod batcher;
pub mod content_client;
pub mod persistence_writer;
pub mod pipeline;
pub mod prompt_builder;
pub mod record_matcher;
pub mod response_parser;
pub mod validator;
pub mod warning_sink;
pub mod work_selector;

pub use batcher::{partition, DEFAULT_BATCH_SIZE};
pub use content_client::{
    AnthropicApi, ApiOutcome, ContentApi, ContentClient, FetchOutcome, GenerationRequest,
    RetryDecision, RetryPolicy,
};
pub use persistence_writer::{CommitSummary, PendingWrite, PersistenceWriter};
pub use pipeline::{PipelineConfig, RewritePipeline};
pub use prompt_builder::{delimiter_safe_name, Prompt, PromptBuilder, PromptConfig};
pub use record_matcher::{match_blocks, MatchReport, UnmatchedRecord};
pub use response_parser::{parse_blocks, split_segments};
pub use validator::Validator;
pub use warning_sink::{WarningEntry, WarningSink};
pub use work_selector::WorkSelector;
