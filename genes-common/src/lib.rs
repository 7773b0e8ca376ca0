//! # Genes Common Library
//!
//! Shared code for the cultivar register tooling:
//! - Error types
//! - TOML bootstrap configuration and store path resolution
//! - Store connection and schema bootstrap
//! - Cultivar row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
