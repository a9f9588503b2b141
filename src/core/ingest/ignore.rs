//! Layered ignore rules compiled into one predicate.
//!
//! Rules are applied in this order, later rules taking precedence:
//!
//! 1. Built-in exclusions ([`DEFAULT_IGNORE_PATTERNS`])
//! 2. `.gitignore` at the root
//! 3. The tool-specific ignore file at the root
//! 4. Caller-supplied patterns
//!
//! Matching follows gitignore semantics (anchoring, `**`, trailing-slash
//! directory patterns, `!` re-inclusion, last match wins). A path inside
//! an ignored directory is ignored unless it is re-included itself.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{Result, SgrepError};

/// The tool's own metadata directory, always excluded
pub const METADATA_DIR: &str = ".sgrep";

/// Built-in exclusions applied before any repository rule
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Version control
    ".git/",
    ".hg/",
    ".svn/",
    // Tool metadata
    ".sgrep/",
    // Dependencies
    "node_modules/",
    "bower_components/",
    ".venv/",
    "venv/",
    ".bundle/",
    // Build outputs and caches
    "target/",
    "dist/",
    "build/",
    "out/",
    ".next/",
    ".nuxt/",
    ".gradle/",
    "__pycache__/",
    ".pytest_cache/",
    ".mypy_cache/",
    ".cache/",
    "coverage/",
    // Lock files
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    "Gemfile.lock",
    "go.sum",
    // Minified bundles and source maps
    "*.min.js",
    "*.min.css",
    "*.map",
    // Images
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.bmp",
    "*.ico",
    "*.webp",
    "*.tiff",
    "*.psd",
    // Audio and video
    "*.mp3",
    "*.wav",
    "*.flac",
    "*.ogg",
    "*.mp4",
    "*.mov",
    "*.avi",
    "*.mkv",
    "*.webm",
    // Documents and archives
    "*.pdf",
    "*.doc",
    "*.docx",
    "*.xls",
    "*.xlsx",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.tgz",
    "*.bz2",
    "*.xz",
    "*.7z",
    "*.rar",
    "*.jar",
    // Compiled artifacts
    "*.exe",
    "*.dll",
    "*.so",
    "*.dylib",
    "*.o",
    "*.a",
    "*.class",
    "*.pyc",
    "*.wasm",
    "*.bin",
    // Fonts
    "*.ttf",
    "*.otf",
    "*.woff",
    "*.woff2",
    "*.eot",
    // Databases
    "*.db",
    "*.sqlite",
];

/// Outcome of matching one path against the compiled rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreMatch {
    /// The last matching rule excludes the path
    Ignored,
    /// The last matching rule is a `!` re-inclusion
    Whitelisted,
    /// No rule matches
    None,
}

/// Compiled, immutable ignore predicate for one indexing root
pub struct IgnoreEngine {
    root: PathBuf,
    matcher: Gitignore,
}

impl IgnoreEngine {
    /// Compile the rule set for `root`.
    ///
    /// Missing or unreadable ignore files are skipped, as are individual
    /// lines in them that fail to compile. Invalid `extra_patterns` are a
    /// configuration error.
    pub fn build(root: &Path, ignore_file: &str, extra_patterns: &[String]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_IGNORE_PATTERNS {
            builder.add_line(None, pattern).map_err(|e| {
                SgrepError::ConfigError(format!("Invalid built-in pattern '{pattern}': {e}"))
            })?;
        }

        let mut loaded = 0;
        for name in [".gitignore", ignore_file] {
            loaded += add_ignore_file(&mut builder, &root.join(name));
        }

        for pattern in extra_patterns {
            builder.add_line(None, pattern).map_err(|e| {
                SgrepError::ConfigError(format!("Invalid ignore pattern '{pattern}': {e}"))
            })?;
        }

        let matcher = builder
            .build()
            .map_err(|e| SgrepError::ConfigError(format!("Failed to compile ignore rules: {e}")))?;

        tracing::debug!(
            "Ignore rules for {:?}: {} built-in, {} from ignore files, {} extra",
            root,
            DEFAULT_IGNORE_PATTERNS.len(),
            loaded,
            extra_patterns.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    /// Root the rules are anchored to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Match a root-relative path, walking up through its parents
    pub fn matched(&self, relative: &Path, is_dir: bool) -> IgnoreMatch {
        if relative.as_os_str().is_empty() || relative.has_root() {
            return IgnoreMatch::None;
        }

        match self.matcher.matched_path_or_any_parents(relative, is_dir) {
            Match::Ignore(_) => IgnoreMatch::Ignored,
            Match::Whitelist(_) => IgnoreMatch::Whitelisted,
            Match::None => IgnoreMatch::None,
        }
    }

    /// The predicate: true when the path must not be indexed
    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        self.matched(relative, is_dir) == IgnoreMatch::Ignored
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.matcher.len()
    }
}

/// Append the non-empty, non-comment lines of an ignore file.
///
/// Returns how many lines were added; an unreadable file adds nothing.
fn add_ignore_file(builder: &mut GitignoreBuilder, path: &Path) -> usize {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            if path.exists() {
                tracing::debug!("Skipping unreadable ignore file {:?}: {}", path, e);
            }
            return 0;
        }
    };

    let mut added = 0;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match builder.add_line(Some(path.to_path_buf()), line) {
            Ok(_) => added += 1,
            Err(e) => tracing::debug!("Skipping ignore line {:?} in {:?}: {}", line, path, e),
        }
    }
    added
}
