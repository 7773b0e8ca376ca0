//! Test Helper Utilities
//!
//! Shared utilities for testing genes-rewrite

#![allow(dead_code, unused_imports)]

pub mod db_utils;
pub mod stub_api;

pub use db_utils::{
    create_test_db, history_count, pending_ids, seed_cultivars, tagline_of, TestStore,
};
pub use stub_api::{clean_block, render_response, ScriptedApi};
