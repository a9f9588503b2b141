//! Candidate enumeration.
//!
//! Prefers the version-control listing when the root is inside a working
//! tree and falls back to a manual walk otherwise. Whatever the source,
//! every path is re-checked against the [`IgnoreEngine`] before it is
//! handed out, since the tool-specific ignore file is unknown to git.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::core::error::{Result, SgrepError};
use crate::core::ingest::ignore::{IgnoreEngine, IgnoreMatch};
use crate::core::ingest::vcs::VersionControl;
use crate::core::types::{CancelFlag, CandidatePath};

/// Where the candidate list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumerationSource {
    /// Version-control listing
    Vcs,
    /// Manual directory walk
    Walk,
}

/// Produces candidate paths for one root
pub struct FileEnumerator<'a> {
    ignore: &'a IgnoreEngine,
    vcs: &'a dyn VersionControl,
    cancel: Option<CancelFlag>,
}

impl<'a> FileEnumerator<'a> {
    pub fn new(ignore: &'a IgnoreEngine, vcs: &'a dyn VersionControl) -> Self {
        Self {
            ignore,
            vcs,
            cancel: None,
        }
    }

    /// Stop yielding candidates once `cancel` is set
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Start a fresh enumeration of `root`.
    ///
    /// Fails only when the root itself is missing, not a directory or
    /// not readable. Everything below the root degrades silently.
    pub fn enumerate(&self, root: &Path) -> Result<Candidates<'a>> {
        check_root(root)?;

        let (inner, source) = match self.vcs_listing(root) {
            Some(listing) => (listing, EnumerationSource::Vcs),
            None => {
                let walk: Box<dyn Iterator<Item = CandidatePath> + 'a> =
                    Box::new(walk(root, root, self.ignore));
                (walk, EnumerationSource::Walk)
            }
        };

        tracing::debug!("Enumerating {:?} via {:?}", root, source);

        Ok(Candidates {
            inner,
            ignore: self.ignore,
            cancel: self.cancel.clone(),
            seen: HashSet::new(),
            source,
        })
    }

    fn vcs_listing(&self, root: &Path) -> Option<Box<dyn Iterator<Item = CandidatePath> + 'a>> {
        if !self.vcs.is_working_tree(root) {
            return None;
        }

        let files = match self.vcs.list_files(root) {
            Ok(files) => files,
            Err(e) => {
                tracing::debug!(
                    "{} listing failed, falling back to walk: {}",
                    self.vcs.name(),
                    e
                );
                return None;
            }
        };

        // Entries git ignores but the tool ignore file re-includes
        let ignored = self.vcs.list_ignored(root).unwrap_or_else(|e| {
            tracing::debug!("{} ignored listing failed: {}", self.vcs.name(), e);
            Vec::new()
        });

        let ignore = self.ignore;
        let root = root.to_path_buf();
        let rescued = ignored
            .into_iter()
            .flat_map(move |entry| rescue(&root, ignore, entry));

        let listing: Box<dyn Iterator<Item = CandidatePath> + 'a> =
            Box::new(files.into_iter().map(CandidatePath::new).chain(rescued));
        Some(listing)
    }
}

/// Lazy, finite sequence of unique, non-ignored candidates
pub struct Candidates<'a> {
    inner: Box<dyn Iterator<Item = CandidatePath> + 'a>,
    ignore: &'a IgnoreEngine,
    cancel: Option<CancelFlag>,
    seen: HashSet<CandidatePath>,
    source: EnumerationSource,
}

impl Candidates<'_> {
    pub fn source(&self) -> EnumerationSource {
        self.source
    }
}

impl Iterator for Candidates<'_> {
    type Item = CandidatePath;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                return None;
            }

            let candidate = self.inner.next()?;

            if self.ignore.is_ignored(candidate.as_path(), false) {
                tracing::debug!("Ignored: {}", candidate);
                continue;
            }

            if self.seen.insert(candidate.clone()) {
                return Some(candidate);
            }
        }
    }
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root)
        .map_err(|e| SgrepError::InvalidPath(format!("{}: {e}", root.display())))?;

    if !metadata.is_dir() {
        return Err(SgrepError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    fs::read_dir(root)
        .map_err(|e| SgrepError::InvalidPath(format!("{} is not readable: {e}", root.display())))?;

    Ok(())
}

/// Walk `start` (at or below `root`), yielding non-directory entries
/// relative to `root`.
///
/// Hidden entries and ignored directories are pruned before descent.
/// Unreadable directories are skipped.
fn walk<'a>(
    root: &Path,
    start: &Path,
    ignore: &'a IgnoreEngine,
) -> impl Iterator<Item = CandidatePath> + 'a {
    let prune_root = root.to_path_buf();
    let relative_root = root.to_path_buf();

    WalkDir::new(start)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| keep_entry(entry, &prune_root, ignore))
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) => entry
                .path()
                .strip_prefix(&relative_root)
                .ok()
                .map(|relative| CandidatePath::new(relative.to_path_buf())),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
}

fn keep_entry(entry: &DirEntry, root: &Path, ignore: &IgnoreEngine) -> bool {
    // Never filter the walk's starting point
    if entry.depth() == 0 {
        return true;
    }

    if entry.file_name().to_string_lossy().starts_with('.') {
        return false;
    }

    let Ok(relative) = entry.path().strip_prefix(root) else {
        return false;
    };

    let is_dir = entry.file_type().is_dir();
    if ignore.is_ignored(relative, is_dir) {
        if is_dir {
            tracing::debug!("Pruning ignored directory: {:?}", relative);
        }
        return false;
    }

    true
}

/// Turn one git-ignored entry into the candidates the engine re-includes
fn rescue<'a>(
    root: &Path,
    ignore: &'a IgnoreEngine,
    entry: PathBuf,
) -> Box<dyn Iterator<Item = CandidatePath> + 'a> {
    let raw = entry.to_string_lossy();

    if let Some(dir) = raw.strip_suffix('/') {
        let dir = PathBuf::from(dir);
        // Nothing inside an ignored directory can be re-included
        if ignore.matched(&dir, true) == IgnoreMatch::Ignored {
            return Box::new(std::iter::empty());
        }
        let start = root.join(&dir);
        return Box::new(walk(root, &start, ignore).filter(move |candidate| {
            ignore.matched(candidate.as_path(), false) == IgnoreMatch::Whitelisted
        }));
    }

    if ignore.matched(&entry, false) == IgnoreMatch::Whitelisted {
        tracing::debug!("Re-included over git ignore: {:?}", entry);
        return Box::new(std::iter::once(CandidatePath::new(entry)));
    }

    Box::new(std::iter::empty())
}
