//! Core domain logic (front-end agnostic)
//!
//! This module contains everything the CLI drives, independent of how
//! results are presented.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Domain data structures
//! - **xdg**: XDG directory handling
//! - **ingest**: Enumeration, classification and batching pipeline
//! - **sink**: Index sinks (on-disk stores, in-memory)
//! - **services**: Unified service container

pub mod config;
pub mod error;
pub mod ingest;
pub mod services;
pub mod sink;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Result, SgrepError};
pub use services::Services;
