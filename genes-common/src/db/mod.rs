//! Store access shared by register tools

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
