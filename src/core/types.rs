//! Core data types shared across the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::ingest::reader::read_content;

/// A path relative to the indexing root, considered for indexing
/// before any filtering decision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidatePath(PathBuf);

impl CandidatePath {
    /// Wrap a root-relative path
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        Self(relative.into())
    }

    /// The root-relative path
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Absolute location under `root`
    pub fn absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// Whether the path can be keyed exactly
    pub fn is_utf8(&self) -> bool {
        self.0.to_str().is_some()
    }

    /// Stable key used by sinks and fingerprint lookups.
    ///
    /// Components are joined with `/` on every platform; case is kept
    /// exactly as the filesystem reports it. Distinct paths only map to
    /// distinct keys when [`is_utf8`](Self::is_utf8) holds.
    pub fn key(&self) -> String {
        self.0
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// File name component
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }

    /// Number of directories above the file (0 for files at the root)
    pub fn depth(&self) -> usize {
        self.0
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
            .saturating_sub(1)
    }
}

impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A file that survived ignore rules and content classification.
///
/// Immutable for the rest of the run. The text is not held here; it is
/// read again with [`read_content`](Self::read_content) when the file is
/// uploaded, so a run keeps at most one file's content in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Root-relative path, `/`-separated
    pub path: String,

    /// Absolute path on disk
    pub absolute_path: PathBuf,

    /// Fingerprint of the raw bytes on disk
    pub fingerprint: String,

    /// Size on disk in bytes
    pub size: u64,

    /// Last modification time reported by the filesystem
    pub last_modified: DateTime<Utc>,

    /// Number of lines the indexed text holds
    pub line_count: usize,

    /// Language detected from the extension
    pub language: Option<String>,

    /// Whether the indexed text stops at the retained-line cap
    pub truncated: bool,

    /// Line cap for streamed files; `None` means the whole file is read
    pub retained_lines: Option<usize>,
}

impl FileRecord {
    /// Read the text to index
    pub fn read_content(&self) -> io::Result<String> {
        read_content(&self.absolute_path, self.retained_lines)
    }
}

/// Cooperative cancellation shared between the caller and the pipeline.
///
/// Checked between directories during enumeration and between files
/// during classification and upload.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
