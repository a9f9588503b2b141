//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod clean;
pub mod config;
pub mod index;
pub mod status;

// Re-export argument types for use in mod.rs
pub use clean::CleanArgs;
pub use config::ConfigArgs;
pub use index::IndexArgs;
pub use status::StatusArgs;
