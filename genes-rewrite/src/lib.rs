//! genes-rewrite library
//!
//! Resumable, batched regeneration of cultivar prose fields (tagline,
//! description, notes) through a generative text API.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{RewriteError, RewriteResult};
pub use models::{RunContext, RunStats, RunSummary};
pub use services::{PipelineConfig, RewritePipeline};

/// Build identification logged at startup
pub fn build_info() -> String {
    format!(
        "v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    )
}
