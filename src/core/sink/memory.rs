//! In-memory sink for dry runs and tests.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::core::error::{Result, SgrepError};
use crate::core::sink::{IndexSink, SinkFile, SinkInfo, UploadRequest};

/// A stored file
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub content: String,
    pub fingerprint: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    files: BTreeMap<String, MemoryEntry>,
    failing: HashSet<String>,
    uploads: usize,
    flushes: usize,
    last_updated: Option<DateTime<Utc>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            failing: HashSet::new(),
            uploads: 0,
            flushes: 0,
            last_updated: None,
        }
    }

    /// Seed with fingerprints only, e.g. those of a durable store
    pub fn with_fingerprints(mut self, files: Vec<SinkFile>) -> Self {
        for file in files {
            self.files.insert(
                file.path,
                MemoryEntry {
                    content: String::new(),
                    fingerprint: file.fingerprint,
                    size: 0,
                    last_modified: DateTime::<Utc>::from(std::time::UNIX_EPOCH),
                },
            );
        }
        self
    }

    /// Make every upload of `path` fail
    pub fn fail_on(mut self, path: impl Into<String>) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub fn get(&self, path: &str) -> Option<&MemoryEntry> {
        self.files.get(path)
    }

    /// Stored paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// Successful uploads so far, including overwrites
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl IndexSink for MemorySink {
    fn list_files(&self) -> Result<Vec<SinkFile>> {
        Ok(self
            .files
            .iter()
            .map(|(path, entry)| SinkFile {
                path: path.clone(),
                fingerprint: entry.fingerprint.clone(),
            })
            .collect())
    }

    fn upload_file(&mut self, request: &UploadRequest<'_>) -> Result<()> {
        if self.failing.contains(request.path) {
            return Err(SgrepError::UploadFailed(format!(
                "Injected failure for {}",
                request.path
            )));
        }

        self.files.insert(
            request.path.to_string(),
            MemoryEntry {
                content: request.content.to_string(),
                fingerprint: request.fingerprint.to_string(),
                size: request.size,
                last_modified: request.last_modified,
            },
        );
        self.uploads += 1;
        self.last_updated = Some(Utc::now());
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Result<()> {
        if self.files.remove(path).is_some() {
            self.last_updated = Some(Utc::now());
        }
        Ok(())
    }

    fn get_info(&self) -> Result<SinkInfo> {
        Ok(SinkInfo {
            name: self.name.clone(),
            file_count: self.files.len(),
            total_size: self.files.values().map(|e| e.size).sum(),
            last_updated: self.last_updated,
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
