//! Scale-dependent indexing policy.
//!
//! Every [`SizeClass`] maps to one fixed [`ScalingConfig`]. Larger
//! codebases get bigger batches, tighter per-file limits, stricter
//! filtering and sparser progress reporting.

use serde::Serialize;

use crate::core::ingest::classifier::FilterAggressiveness;
use crate::core::ingest::language::FileKind;
use crate::core::ingest::metrics::{format_bytes, format_count, CodebaseMetrics, SizeClass};
use crate::core::types::{CandidatePath, FileRecord};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

/// Limits and pacing for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScalingConfig {
    /// Files per batch
    pub batch_size: usize,
    /// Largest file accepted, in bytes
    pub max_file_size: u64,
    /// Accepted files after which enumeration stops
    pub max_file_count: usize,
    pub filter_aggressiveness: FilterAggressiveness,
    /// Files between periodic progress log lines
    pub progress_interval_files: usize,
}

impl ScalingConfig {
    pub fn for_class(class: SizeClass) -> Self {
        match class {
            SizeClass::Small => Self {
                batch_size: 10,
                max_file_size: MB,
                max_file_count: 10_000,
                filter_aggressiveness: FilterAggressiveness::Permissive,
                progress_interval_files: 10,
            },
            SizeClass::Medium => Self {
                batch_size: 25,
                max_file_size: MB,
                max_file_count: 25_000,
                filter_aggressiveness: FilterAggressiveness::Standard,
                progress_interval_files: 100,
            },
            SizeClass::Large => Self {
                batch_size: 50,
                max_file_size: 512 * KB,
                max_file_count: 100_000,
                filter_aggressiveness: FilterAggressiveness::Aggressive,
                progress_interval_files: 500,
            },
            SizeClass::Huge => Self {
                batch_size: 100,
                max_file_size: 256 * KB,
                max_file_count: 250_000,
                filter_aggressiveness: FilterAggressiveness::Aggressive,
                progress_interval_files: 2_000,
            },
        }
    }

    /// Order records so the most search-relevant come first.
    ///
    /// Source before docs before config before everything else, then
    /// shallower paths first, then by path.
    pub fn prioritize(files: &mut [FileRecord]) {
        files.sort_by_cached_key(|record| priority_key(&CandidatePath::new(&record.path)));
    }

    /// Same ordering over candidates, applied before classification so
    /// the file-count cap drops the least relevant files
    pub fn prioritize_candidates(candidates: &mut [CandidatePath]) {
        candidates.sort_by_cached_key(priority_key);
    }
}

fn priority_key(candidate: &CandidatePath) -> (u8, usize, String) {
    (
        FileKind::of(candidate).rank(),
        candidate.depth(),
        candidate.key(),
    )
}

/// One-line description, e.g. `Medium codebase: 3,482 files, 18.4 MB`
pub fn describe(class: SizeClass, metrics: &CodebaseMetrics) -> String {
    format!(
        "{} codebase: {} files, {}",
        class,
        format_count(metrics.total_files),
        format_bytes(metrics.total_size)
    )
}
