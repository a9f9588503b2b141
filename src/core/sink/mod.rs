//! Index sinks: where accepted files end up.
//!
//! The pipeline only needs a narrow contract from a sink: the stored
//! fingerprints, per-file upload and removal, and a summary. [`FileStore`] keeps
//! named stores on disk; [`MemorySink`] keeps everything in memory for
//! dry runs and tests.

pub mod memory;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::Result;

pub use memory::MemorySink;
pub use store::{validate_store_name, FileStore};

/// A previously indexed file as reported by the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkFile {
    pub path: String,
    pub fingerprint: String,
}

/// One file handed to the sink
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub fingerprint: &'a str,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Sink summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkInfo {
    pub name: String,
    pub file_count: usize,
    pub total_size: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Contract between the pipeline and the store that holds indexed files
pub trait IndexSink: Send {
    /// Paths and fingerprints of everything stored so far
    fn list_files(&self) -> Result<Vec<SinkFile>>;

    /// Store one file, replacing any earlier version of the same path
    fn upload_file(&mut self, request: &UploadRequest<'_>) -> Result<()>;

    /// Forget a path that is no longer part of the indexed set
    fn remove_file(&mut self, path: &str) -> Result<()>;

    fn get_info(&self) -> Result<SinkInfo>;

    /// Make completed uploads durable
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
