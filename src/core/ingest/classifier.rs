//! Content classification.
//!
//! Decides whether a candidate becomes a [`FileRecord`]. Stat-based
//! checks run first (regular file, empty, size limit), then the file is
//! sampled and handed to a chain of [`ContentHeuristic`]s. The first
//! heuristic that rejects wins.
//!
//! The binary check is reliable; the generated, minified and vendor
//! heuristics are approximate filters and may misjudge unusual files.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use glob::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::IndexingConfig;
use crate::core::ingest::change::fingerprint;
use crate::core::ingest::language::detect_language;
use crate::core::ingest::reader::{is_binary, read_bounded, read_sample};
use crate::core::types::{CandidatePath, FileRecord};

/// Header markers left by code generators
static GENERATED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(do not edit|@generated|auto-?generated|generated by|code generated)")
        .unwrap()
});

/// File names produced by common code generators
const GENERATED_NAME_GLOBS: &[&str] = &[
    "*.pb.go",
    "*.pb.cc",
    "*.pb.h",
    "*_pb2.py",
    "*_pb2_grpc.py",
    "*.g.dart",
    "*.freezed.dart",
    "*.generated.*",
    "*_generated.go",
    "*.designer.cs",
];

/// Samples shorter than this are never judged minified
const MIN_MINIFIED_SAMPLE: usize = 1024;

/// How eagerly the approximate heuristics reject files
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAggressiveness {
    /// Only the clearest generated/minified/vendored files are rejected
    Permissive,
    Standard,
    /// Borderline files are rejected too
    Aggressive,
}

impl FilterAggressiveness {
    /// (minimum average line length, maximum whitespace ratio)
    fn minified_thresholds(self) -> (f64, f64) {
        match self {
            FilterAggressiveness::Permissive => (500.0, 0.05),
            FilterAggressiveness::Standard => (300.0, 0.10),
            FilterAggressiveness::Aggressive => (200.0, 0.15),
        }
    }

    /// Leading lines searched for generator markers
    fn generated_header_lines(self) -> usize {
        match self {
            FilterAggressiveness::Permissive => 5,
            FilterAggressiveness::Standard => 10,
            FilterAggressiveness::Aggressive => 20,
        }
    }

    fn vendor_dirs(self) -> Vec<&'static str> {
        let mut dirs = vec![
            "vendor",
            "vendors",
            "node_modules",
            "third_party",
            "third-party",
            "bower_components",
        ];
        if self >= FilterAggressiveness::Standard {
            dirs.extend(["external", "deps", "Pods", "Carthage"]);
        }
        if self >= FilterAggressiveness::Aggressive {
            dirs.extend(["_vendor", "vendored", "jspm_packages", "site-packages"]);
        }
        dirs
    }
}

impl fmt::Display for FilterAggressiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterAggressiveness::Permissive => "permissive",
            FilterAggressiveness::Standard => "standard",
            FilterAggressiveness::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

/// Why a candidate did not become a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectReason {
    NotRegularFile,
    Empty,
    TooLarge { size: u64, limit: u64 },
    Binary,
    Generated,
    Minified,
    Vendored,
    /// Path cannot be keyed exactly in a store
    NonUtf8Path,
    /// I/O failure while inspecting the file
    Unreadable,
}

impl RejectReason {
    /// Unexpected failures, as opposed to deliberate filtering
    pub fn is_error(&self) -> bool {
        matches!(self, RejectReason::Unreadable)
    }

    /// Stable short name used as a histogram key
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::NotRegularFile => "not_regular_file",
            RejectReason::Empty => "empty",
            RejectReason::TooLarge { .. } => "too_large",
            RejectReason::Binary => "binary",
            RejectReason::Generated => "generated",
            RejectReason::Minified => "minified",
            RejectReason::Vendored => "vendored",
            RejectReason::NonUtf8Path => "non_utf8_path",
            RejectReason::Unreadable => "unreadable",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooLarge { size, limit } => {
                write!(f, "too large ({size} bytes, limit {limit})")
            }
            other => f.write_str(&other.label().replace('_', " ")),
        }
    }
}

/// Result of one heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

/// One pluggable content check
pub trait ContentHeuristic: Send + Sync {
    fn name(&self) -> &'static str;

    /// Judge a candidate from its path and leading bytes
    fn classify(&self, path: &CandidatePath, sample: &[u8]) -> Verdict;
}

/// Rejects binary content
#[derive(Debug, Clone, Default)]
pub struct BinaryHeuristic;

impl ContentHeuristic for BinaryHeuristic {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn classify(&self, _path: &CandidatePath, sample: &[u8]) -> Verdict {
        if is_binary(sample) {
            Verdict::Reject(RejectReason::Binary)
        } else {
            Verdict::Accept
        }
    }
}

/// Rejects files carrying generator markers or generator file names
#[derive(Debug, Clone)]
pub struct GeneratedHeuristic {
    header_lines: usize,
    name_patterns: Vec<Pattern>,
}

impl GeneratedHeuristic {
    pub fn new(aggressiveness: FilterAggressiveness) -> Self {
        let name_patterns = if aggressiveness >= FilterAggressiveness::Standard {
            GENERATED_NAME_GLOBS
                .iter()
                .filter_map(|glob| Pattern::new(glob).ok())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            header_lines: aggressiveness.generated_header_lines(),
            name_patterns,
        }
    }
}

impl ContentHeuristic for GeneratedHeuristic {
    fn name(&self) -> &'static str {
        "generated"
    }

    fn classify(&self, path: &CandidatePath, sample: &[u8]) -> Verdict {
        if let Some(name) = path.file_name() {
            if self.name_patterns.iter().any(|p| p.matches(name)) {
                return Verdict::Reject(RejectReason::Generated);
            }
        }

        let text = String::from_utf8_lossy(sample);
        if text
            .lines()
            .take(self.header_lines)
            .any(|line| GENERATED_MARKER.is_match(line))
        {
            return Verdict::Reject(RejectReason::Generated);
        }

        Verdict::Accept
    }
}

/// Rejects files with very long lines and almost no whitespace
#[derive(Debug, Clone)]
pub struct MinifiedHeuristic {
    min_average_line: f64,
    max_whitespace_ratio: f64,
}

impl MinifiedHeuristic {
    pub fn new(aggressiveness: FilterAggressiveness) -> Self {
        let (min_average_line, max_whitespace_ratio) = aggressiveness.minified_thresholds();
        Self {
            min_average_line,
            max_whitespace_ratio,
        }
    }
}

impl ContentHeuristic for MinifiedHeuristic {
    fn name(&self) -> &'static str {
        "minified"
    }

    fn classify(&self, _path: &CandidatePath, sample: &[u8]) -> Verdict {
        if sample.len() < MIN_MINIFIED_SAMPLE {
            return Verdict::Accept;
        }

        let text = String::from_utf8_lossy(sample);
        let line_count = text.lines().count().max(1);
        let chars = text.chars().filter(|c| *c != '\n' && *c != '\r').count();
        if chars == 0 {
            return Verdict::Accept;
        }

        let whitespace = text.chars().filter(|c| *c == ' ' || *c == '\t').count();
        let average_line = chars as f64 / line_count as f64;
        let whitespace_ratio = whitespace as f64 / chars as f64;

        if average_line > self.min_average_line && whitespace_ratio < self.max_whitespace_ratio {
            Verdict::Reject(RejectReason::Minified)
        } else {
            Verdict::Accept
        }
    }
}

/// Rejects files under vendored or third-party directories
#[derive(Debug, Clone)]
pub struct VendorHeuristic {
    dirs: Vec<&'static str>,
}

impl VendorHeuristic {
    pub fn new(aggressiveness: FilterAggressiveness) -> Self {
        Self {
            dirs: aggressiveness.vendor_dirs(),
        }
    }
}

impl ContentHeuristic for VendorHeuristic {
    fn name(&self) -> &'static str {
        "vendor"
    }

    fn classify(&self, path: &CandidatePath, _sample: &[u8]) -> Verdict {
        let key = path.key();
        let mut components: Vec<&str> = key.split('/').collect();
        // The file name itself does not count
        components.pop();

        if components.iter().any(|c| self.dirs.contains(c)) {
            Verdict::Reject(RejectReason::Vendored)
        } else {
            Verdict::Accept
        }
    }
}

/// Limits the classifier applies, combined from configuration and the
/// run's scaling policy
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub max_file_size: u64,
    pub large_file_threshold: u64,
    pub max_retained_lines: usize,
    pub sample_bytes: usize,
    pub aggressiveness: FilterAggressiveness,
}

impl ClassifierSettings {
    pub fn new(
        config: &IndexingConfig,
        max_file_size: u64,
        aggressiveness: FilterAggressiveness,
    ) -> Self {
        Self {
            max_file_size,
            large_file_threshold: config.large_file_threshold_bytes(),
            max_retained_lines: config.max_retained_lines,
            sample_bytes: config.sample_bytes,
            aggressiveness,
        }
    }
}

/// Outcome of classifying one candidate
#[derive(Debug, Clone)]
pub enum Classification {
    Accepted(FileRecord),
    Rejected(RejectReason),
}

/// Turns candidates into records or rejection reasons
pub struct ContentClassifier {
    settings: ClassifierSettings,
    heuristics: Vec<Box<dyn ContentHeuristic>>,
}

impl ContentClassifier {
    /// Create a classifier with the built-in heuristic chain
    pub fn new(settings: ClassifierSettings) -> Self {
        let aggressiveness = settings.aggressiveness;
        let heuristics: Vec<Box<dyn ContentHeuristic>> = vec![
            Box::new(BinaryHeuristic),
            Box::new(GeneratedHeuristic::new(aggressiveness)),
            Box::new(MinifiedHeuristic::new(aggressiveness)),
            Box::new(VendorHeuristic::new(aggressiveness)),
        ];

        Self {
            settings,
            heuristics,
        }
    }

    /// Append a heuristic after the built-in ones
    pub fn with_heuristic(mut self, heuristic: Box<dyn ContentHeuristic>) -> Self {
        self.heuristics.push(heuristic);
        self
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn heuristic_names(&self) -> Vec<&'static str> {
        self.heuristics.iter().map(|h| h.name()).collect()
    }

    /// Classify a candidate located under `root`
    pub fn classify(&self, root: &Path, candidate: &CandidatePath) -> Classification {
        let path = candidate.absolute(root);

        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!("Cannot stat {}: {}", candidate, e);
                return Classification::Rejected(RejectReason::Unreadable);
            }
        };

        if !metadata.file_type().is_file() {
            return Classification::Rejected(RejectReason::NotRegularFile);
        }

        let size = metadata.len();
        if size == 0 {
            return Classification::Rejected(RejectReason::Empty);
        }

        if size > self.settings.max_file_size {
            return Classification::Rejected(RejectReason::TooLarge {
                size,
                limit: self.settings.max_file_size,
            });
        }

        let streaming = size > self.settings.large_file_threshold;

        // Whole small files are read once; large ones are sampled first
        let (bytes, sample) = if streaming {
            match read_sample(&path, self.settings.sample_bytes) {
                Ok(sample) => (None, sample),
                Err(e) => {
                    tracing::debug!("Cannot sample {}: {}", candidate, e);
                    return Classification::Rejected(RejectReason::Unreadable);
                }
            }
        } else {
            match fs::read(&path) {
                Ok(bytes) => {
                    let end = bytes.len().min(self.settings.sample_bytes);
                    let sample = bytes[..end].to_vec();
                    (Some(bytes), sample)
                }
                Err(e) => {
                    tracing::debug!("Cannot read {}: {}", candidate, e);
                    return Classification::Rejected(RejectReason::Unreadable);
                }
            }
        };

        for heuristic in &self.heuristics {
            if let Verdict::Reject(reason) = heuristic.classify(candidate, &sample) {
                tracing::debug!("Rejected {} by {}: {}", candidate, heuristic.name(), reason);
                return Classification::Rejected(reason);
            }
        }

        let (fingerprint, line_count, truncated, retained_lines) = match bytes {
            Some(bytes) => {
                let line_count = String::from_utf8_lossy(&bytes).lines().count();
                (fingerprint(&bytes), line_count, false, None)
            }
            None => match read_bounded(&path, self.settings.max_retained_lines) {
                Ok(read) => {
                    if read.truncated {
                        tracing::debug!(
                            "Truncated {} at {} lines",
                            candidate,
                            self.settings.max_retained_lines
                        );
                    }
                    (
                        read.fingerprint,
                        read.line_count,
                        read.truncated,
                        Some(self.settings.max_retained_lines),
                    )
                }
                Err(e) => {
                    tracing::debug!("Cannot stream {}: {}", candidate, e);
                    return Classification::Rejected(RejectReason::Unreadable);
                }
            },
        };

        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));

        let language = candidate
            .extension()
            .and_then(|ext| detect_language(&ext))
            .map(str::to_string);

        Classification::Accepted(FileRecord {
            path: candidate.key(),
            absolute_path: path,
            fingerprint,
            size,
            last_modified,
            line_count,
            language,
            truncated,
            retained_lines,
        })
    }
}
