//! Error types for genes-rewrite
//!
//! Only run-ending conditions are errors. Transient API failures, unmatched
//! records, parse failures and validation warnings are contained inside the
//! batch iteration and reported as values (see `services::content_client`,
//! `services::record_matcher`, `services::validator`).

use thiserror::Error;

/// Fatal pipeline error
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Backing store cannot be reached, queried or written
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Generative API refused the request (auth failure, malformed request)
    #[error("Fatal API error: {0}")]
    FatalApi(String),

    /// No API credential outside dry-run mode
    #[error("Missing API credential: {0}")]
    MissingCredential(String),

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (warning log)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// genes-common error
    #[error("Common error: {0}")]
    Common(#[from] genes_common::Error),
}

impl RewriteError {
    /// Map a store-side failure onto the fatal store condition
    pub fn store(err: impl std::fmt::Display) -> Self {
        RewriteError::StoreUnavailable(err.to_string())
    }
}

impl From<sqlx::Error> for RewriteError {
    fn from(err: sqlx::Error) -> Self {
        RewriteError::StoreUnavailable(err.to_string())
    }
}

/// Result type for pipeline operations
pub type RewriteResult<T> = Result<T, RewriteError>;
