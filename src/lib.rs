//! sgrep - ingestion pipeline for natural-language code search
//!
//! Decides which files of a repository are worth indexing, reads them
//! safely and hands them to an index sink in prioritised batches,
//! skipping whatever has not changed since the last run.
//!
//! # Architecture
//!
//! - **core**: Domain logic
//!   - config, error, types, xdg
//!   - ingest (ignore rules, enumeration, classification, scaling,
//!     change detection, batching)
//!   - sink (store contract, on-disk and in-memory stores)
//!   - services (unified service container)
//!
//! - **cli**: Command-line front end (depends on core)
//!
//! # Key Features
//!
//! - Layered ignore rules with gitignore semantics
//! - Git fast path with filesystem-walk fallback
//! - Binary, generated, minified and vendored file rejection
//! - Size-class driven batching and limits
//! - Fingerprint-based incremental re-indexing

// Core domain logic
pub mod core;

// Command-line front end
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{Result, SgrepError};
pub use core::services::Services;
pub use core::types::*;
