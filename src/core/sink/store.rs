//! On-disk named stores.
//!
//! Layout of one store:
//!
//! ```text
//! <store_dir>/<name>/
//!     manifest.json         path -> fingerprint, size, times
//!     blobs/<fingerprint>   file content, shared by identical files
//! ```
//!
//! Blobs are written as files are uploaded. The manifest is only
//! rewritten on [`flush`](IndexSink::flush). Both go through a temporary
//! file and a rename, so an interrupted run leaves the previous manifest
//! (plus the entries of every flushed batch) and only whole blobs behind.
//! Blobs no longer referenced by the manifest are deleted once the
//! manifest that dropped them is on disk.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SgrepError};
use crate::core::sink::{IndexSink, SinkFile, SinkInfo, UploadRequest};

/// Manifest format version
pub const MANIFEST_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const BLOBS_DIR: &str = "blobs";
const MAX_STORE_NAME_LEN: usize = 64;

/// Check that a store name is 1-64 ASCII letters, digits, `-` or `_`
pub fn validate_store_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SgrepError::InvalidStoreName(
            "Store name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_STORE_NAME_LEN {
        return Err(SgrepError::InvalidStoreName(format!(
            "Store name '{name}' is too long ({} chars). Maximum length is {MAX_STORE_NAME_LEN} characters.",
            name.len()
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SgrepError::InvalidStoreName(format!(
            "Store name '{name}' contains invalid characters. \
             Use only letters, numbers, hyphens and underscores."
        )));
    }

    Ok(())
}

/// One indexed file in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub fingerprint: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    name: String,
    updated_at: Option<DateTime<Utc>>,
    files: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    fn empty(name: &str) -> Self {
        Self {
            version: MANIFEST_VERSION,
            name: name.to_string(),
            updated_at: None,
            files: BTreeMap::new(),
        }
    }
}

/// Durable store rooted at `<store_dir>/<name>`
pub struct FileStore {
    name: String,
    dir: PathBuf,
    manifest: Manifest,
    dirty: bool,
    /// Fingerprints whose blobs may have lost their last reference
    orphans: HashSet<String>,
}

impl FileStore {
    /// Open a store, creating it if needed
    pub fn open(store_dir: &Path, name: &str) -> Result<Self> {
        validate_store_name(name)?;
        let dir = store_dir.join(name);

        fs::create_dir_all(dir.join(BLOBS_DIR)).map_err(|e| {
            SgrepError::StoreUnavailable(format!("Cannot create store at {}: {e}", dir.display()))
        })?;

        Self::load(name, dir)
    }

    /// Open a store that must already exist
    pub fn open_existing(store_dir: &Path, name: &str) -> Result<Self> {
        validate_store_name(name)?;
        let dir = store_dir.join(name);

        if !dir.is_dir() {
            return Err(SgrepError::StoreNotFound(format!(
                "Store '{name}' does not exist. Index a repository into it first."
            )));
        }

        Self::load(name, dir)
    }

    /// Delete a store and everything it holds
    pub fn remove(store_dir: &Path, name: &str) -> Result<()> {
        validate_store_name(name)?;
        let dir = store_dir.join(name);

        if !dir.is_dir() {
            return Err(SgrepError::StoreNotFound(format!(
                "Store '{name}' does not exist."
            )));
        }

        fs::remove_dir_all(&dir)?;
        tracing::info!("Removed store '{}' at {:?}", name, dir);
        Ok(())
    }

    /// Check if a store exists
    pub fn exists(store_dir: &Path, name: &str) -> bool {
        validate_store_name(name).is_ok() && store_dir.join(name).is_dir()
    }

    /// Names of all stores under `store_dir`, sorted
    pub fn list_stores(store_dir: &Path) -> Result<Vec<String>> {
        if !store_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(store_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_store_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(name: &str, dir: PathBuf) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);

        let manifest = if manifest_path.exists() {
            let contents = fs::read_to_string(&manifest_path).map_err(|e| {
                SgrepError::StoreUnavailable(format!("Cannot read {}: {e}", manifest_path.display()))
            })?;
            let manifest: Manifest = serde_json::from_str(&contents).map_err(|e| {
                SgrepError::StoreUnavailable(format!(
                    "Corrupt manifest {}: {e}",
                    manifest_path.display()
                ))
            })?;
            if manifest.version > MANIFEST_VERSION {
                return Err(SgrepError::StoreUnavailable(format!(
                    "Store '{name}' uses manifest version {} (supported: {MANIFEST_VERSION})",
                    manifest.version
                )));
            }
            manifest
        } else {
            Manifest::empty(name)
        };

        tracing::debug!(
            "Opened store '{}' at {:?} ({} files)",
            name,
            dir,
            manifest.files.len()
        );

        Ok(Self {
            name: name.to_string(),
            dir,
            manifest,
            dirty: false,
            orphans: HashSet::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest entry for a path, if indexed
    pub fn entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.manifest.files.get(path)
    }

    /// Stored content of an indexed path
    pub fn read_content(&self, path: &str) -> Result<String> {
        let entry = self.entry(path).ok_or_else(|| {
            SgrepError::InvalidPath(format!("'{path}' is not in store '{}'", self.name))
        })?;
        Ok(fs::read_to_string(self.blob_path(&entry.fingerprint))?)
    }

    /// Number of content blobs on disk
    pub fn blob_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(self.dir.join(BLOBS_DIR))? {
            if entry?.file_type()?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn blob_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(BLOBS_DIR).join(fingerprint)
    }

    /// Delete orphaned blobs that no manifest entry references any more
    fn collect_garbage(&mut self) {
        if self.orphans.is_empty() {
            return;
        }

        let referenced: HashSet<&str> = self
            .manifest
            .files
            .values()
            .map(|entry| entry.fingerprint.as_str())
            .collect();

        let mut removed = 0;
        for fingerprint in self.orphans.drain() {
            if referenced.contains(fingerprint.as_str()) {
                continue;
            }
            let blob = self.dir.join(BLOBS_DIR).join(&fingerprint);
            match fs::remove_file(&blob) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Cannot remove blob {:?}: {}", blob, e),
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {} unreferenced blobs from '{}'", removed, self.name);
        }
    }
}

/// Replace `path` with `contents` through a sibling temporary file
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temp = path.as_os_str().to_os_string();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents)?;
    fs::rename(&temp, path)
}

impl IndexSink for FileStore {
    fn list_files(&self) -> Result<Vec<SinkFile>> {
        Ok(self
            .manifest
            .files
            .iter()
            .map(|(path, entry)| SinkFile {
                path: path.clone(),
                fingerprint: entry.fingerprint.clone(),
            })
            .collect())
    }

    fn upload_file(&mut self, request: &UploadRequest<'_>) -> Result<()> {
        // Fingerprints are hex, never a path
        if request.fingerprint.is_empty()
            || !request.fingerprint.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(SgrepError::UploadFailed(format!(
                "Invalid fingerprint for {}",
                request.path
            )));
        }

        // Blobs only ever appear whole, so an existing one is complete
        let blob = self.blob_path(request.fingerprint);
        if !blob.exists() {
            write_atomic(&blob, request.content.as_bytes()).map_err(|e| {
                SgrepError::UploadFailed(format!("Cannot write blob for {}: {e}", request.path))
            })?;
        }

        let previous = self.manifest.files.insert(
            request.path.to_string(),
            ManifestEntry {
                fingerprint: request.fingerprint.to_string(),
                size: request.size,
                last_modified: request.last_modified,
                indexed_at: Utc::now(),
            },
        );
        if let Some(previous) = previous {
            if previous.fingerprint != request.fingerprint {
                self.orphans.insert(previous.fingerprint);
            }
        }
        self.dirty = true;

        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Result<()> {
        if let Some(entry) = self.manifest.files.remove(path) {
            tracing::debug!("Dropping {} from store '{}'", path, self.name);
            self.orphans.insert(entry.fingerprint);
            self.dirty = true;
        }
        Ok(())
    }

    fn get_info(&self) -> Result<SinkInfo> {
        Ok(SinkInfo {
            name: self.name.clone(),
            file_count: self.manifest.files.len(),
            total_size: self.manifest.files.values().map(|e| e.size).sum(),
            last_updated: self.manifest.updated_at,
        })
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        self.manifest.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(&self.manifest)?;

        let manifest_path = self.dir.join(MANIFEST_FILE);
        write_atomic(&manifest_path, json.as_bytes()).map_err(|e| {
            SgrepError::UploadFailed(format!(
                "Cannot persist manifest {}: {e}",
                manifest_path.display()
            ))
        })?;

        self.dirty = false;
        self.collect_garbage();
        Ok(())
    }
}
