//! Content fingerprints and change detection.
//!
//! Content is the source of truth: a file whose modification time moved
//! but whose bytes did not is unchanged.

use std::collections::HashMap;
use std::io::{self, Read};

use sha2::{Digest, Sha256};

use crate::core::sink::SinkFile;

/// Bytes of the SHA-256 digest kept in a fingerprint
const FINGERPRINT_BYTES: usize = 16;

/// Short deterministic digest of `content`, as lowercase hex
pub fn fingerprint(content: &[u8]) -> String {
    encode(&Sha256::digest(content))
}

fn encode(digest: &[u8]) -> String {
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Reader adapter that fingerprints every byte read through it.
///
/// Wrapping the raw file (below any buffering or decoding) makes the
/// fingerprint cover the exact bytes on disk.
pub struct FingerprintReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R: Read> FingerprintReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Fingerprint of the bytes read so far
    pub fn finish(self) -> String {
        encode(&self.hasher.finalize())
    }
}

impl<R: Read> Read for FingerprintReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.hasher.update(&buf[..read]);
        Ok(read)
    }
}

/// Decides which files need uploading, against the sink's prior state
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    existing: HashMap<String, String>,
    force: bool,
}

impl ChangeDetector {
    /// `existing` maps root-relative paths to stored fingerprints
    pub fn new(existing: HashMap<String, String>, force: bool) -> Self {
        Self { existing, force }
    }

    pub fn from_sink_files(files: Vec<SinkFile>, force: bool) -> Self {
        let existing = files
            .into_iter()
            .map(|file| (file.path, file.fingerprint))
            .collect();
        Self::new(existing, force)
    }

    /// True unless a stored fingerprint for exactly this path matches
    /// exactly and re-indexing is not forced
    pub fn needs_indexing(&self, path: &str, fingerprint: &str) -> bool {
        if self.force {
            return true;
        }
        self.existing.get(path).map(String::as_str) != Some(fingerprint)
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Number of paths known to the sink
    pub fn known_files(&self) -> usize {
        self.existing.len()
    }
}
