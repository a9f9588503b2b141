//! Version-control listing used as the enumeration fast path.
//!
//! The working-tree check and listings shell out to the `git` binary. Any failure
//! (git missing, not a working tree, non-zero exit) is reported to the
//! caller, which falls back to a manual walk.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::error::{Result, SgrepError};

/// Capability to list files from version-control metadata
pub trait VersionControl: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Side-effect-free check that `root` lies inside a working tree
    fn is_working_tree(&self, root: &Path) -> bool;

    /// Tracked plus untracked-but-not-ignored files, relative to `root`
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Entries the tool ignores, relative to `root`.
    ///
    /// Fully ignored directories are reported once with a trailing `/`.
    fn list_ignored(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Git via the command-line client
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, root: &Path, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .map_err(|e| SgrepError::IndexingFailed(format!("Failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SgrepError::IndexingFailed(format!(
                "git {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

impl VersionControl for GitCli {
    fn name(&self) -> &'static str {
        "git"
    }

    fn is_working_tree(&self, root: &Path) -> bool {
        match self.run(root, &["rev-parse", "--is-inside-work-tree"]) {
            Ok(stdout) => String::from_utf8_lossy(&stdout).trim() == "true",
            Err(e) => {
                tracing::debug!("Not a git working tree {:?}: {}", root, e);
                false
            }
        }
    }

    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let stdout = self.run(
            root,
            &["ls-files", "-z", "--cached", "--others", "--exclude-standard"],
        )?;
        Ok(split_nul(&stdout))
    }

    fn list_ignored(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let stdout = self.run(
            root,
            &[
                "ls-files",
                "-z",
                "--others",
                "--ignored",
                "--exclude-standard",
                "--directory",
            ],
        )?;
        Ok(split_nul(&stdout))
    }
}

/// Always declines; forces the manual walk
#[derive(Debug, Clone, Default)]
pub struct NoVcs;

impl VersionControl for NoVcs {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_working_tree(&self, _root: &Path) -> bool {
        false
    }

    fn list_files(&self, _root: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn list_ignored(&self, _root: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// Split `-z` output into sorted, unique paths
fn split_nul(stdout: &[u8]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = stdout
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .map(entry_path)
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

/// Git reports raw bytes; keep them so non-UTF-8 names stay distinct
#[cfg(unix)]
fn entry_path(entry: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(entry))
}

#[cfg(not(unix))]
fn entry_path(entry: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(entry).into_owned())
}
