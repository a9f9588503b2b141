//! Indexing pipeline orchestration.
//!
//! Coordinates the end-to-end ingestion workflow:
//! 1. Compile ignore rules and enumerate candidates
//! 2. Survey candidate sizes and pick the scaling policy
//! 3. Classify candidates into records, up to the file-count cap
//! 4. Skip records whose fingerprint the sink already holds
//! 5. Upload the rest in prioritised batches
//! 6. After a complete run, drop stored paths that are no longer indexed

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::core::config::IndexingConfig;
use crate::core::error::{Result, SgrepError};
use crate::core::ingest::change::ChangeDetector;
use crate::core::ingest::classifier::{
    Classification, ClassifierSettings, ContentClassifier, RejectReason,
};
use crate::core::ingest::enumerator::{EnumerationSource, FileEnumerator};
use crate::core::ingest::ignore::IgnoreEngine;
use crate::core::ingest::metrics::{CodebaseMetrics, SizeClass};
use crate::core::ingest::scaling::{describe, ScalingConfig};
use crate::core::ingest::scheduler::{BatchScheduler, ProgressEvent};
use crate::core::ingest::vcs::{GitCli, NoVcs, VersionControl};
use crate::core::sink::IndexSink;
use crate::core::types::{CancelFlag, CandidatePath, FileRecord};

/// Structural summary of the codebase, available before any upload
#[derive(Debug, Clone, Serialize)]
pub struct CodebaseSummary {
    pub root: PathBuf,
    pub source: EnumerationSource,
    pub size_class: SizeClass,
    pub description: String,
    pub scaling: ScalingConfig,
    /// Metrics over the ignore-filtered candidates
    pub metrics: CodebaseMetrics,
}

/// A candidate that did not become a record
#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    pub path: String,
    #[serde(flatten)]
    pub reason: RejectReason,
}

/// Everything known after enumeration and classification
#[derive(Debug, Clone)]
pub struct Collection {
    pub summary: CodebaseSummary,
    /// Accepted records in priority order
    pub records: Vec<FileRecord>,
    /// Metrics over the accepted records
    pub metrics: CodebaseMetrics,
    pub rejected: Vec<RejectedFile>,
    /// Candidates left unexamined once the file-count cap was reached
    pub dropped: usize,
    pub cancelled: bool,
}

impl Collection {
    /// Rejections by design (binary, empty, vendored, ...)
    pub fn filtered(&self) -> usize {
        self.rejected.iter().filter(|r| !r.reason.is_error()).count()
    }

    /// Rejections caused by I/O failures
    pub fn unreadable(&self) -> usize {
        self.rejected.iter().filter(|r| r.reason.is_error()).count()
    }

    /// Rejection counts keyed by reason label
    pub fn rejection_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for rejected in &self.rejected {
            *counts.entry(rejected.reason.label().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Root-relative paths of the accepted records
    pub fn paths(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.path.as_str()).collect()
    }
}

/// Events emitted while the pipeline runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineEvent {
    Structure(CodebaseSummary),
    Filtered {
        accepted: usize,
        filtered: usize,
        unreadable: usize,
        dropped: usize,
        reasons: BTreeMap<String, usize>,
    },
    Changes {
        to_index: usize,
        unchanged: usize,
        /// Stored paths that will be dropped if the run completes
        stale: usize,
    },
    Progress(ProgressEvent),
}

/// Final report of one run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Store written to; `None` for in-memory runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    pub dry_run: bool,
    pub indexed: usize,
    /// Unchanged since the last run
    pub skipped: usize,
    /// Upload failures plus unreadable files
    pub errors: usize,
    /// Stored paths dropped because they are no longer indexed
    pub removed: usize,
    pub filtered: usize,
    pub dropped: usize,
    pub elapsed_secs: f64,
    pub cancelled: bool,
    pub source: EnumerationSource,
    pub summary: CodebaseSummary,
    pub rejections: BTreeMap<String, usize>,
    /// Per-file rejections, kept only for verbose runs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_files: Vec<RejectedFile>,
}

/// Orchestrates the ingestion pipeline for one configuration
pub struct IndexingPipeline {
    config: IndexingConfig,
    vcs: Box<dyn VersionControl>,
    file_limit: Option<usize>,
}

impl IndexingPipeline {
    /// Create a pipeline; git is used when `config.use_vcs` is set
    pub fn new(config: IndexingConfig) -> Self {
        let vcs: Box<dyn VersionControl> = if config.use_vcs {
            Box::new(GitCli::new())
        } else {
            Box::new(NoVcs)
        };
        Self {
            config,
            vcs,
            file_limit: None,
        }
    }

    /// Replace the version-control backend
    pub fn with_vcs(mut self, vcs: Box<dyn VersionControl>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Cap accepted files below what the size class allows
    pub fn with_file_limit(mut self, limit: Option<usize>) -> Self {
        self.file_limit = limit;
        self
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    /// Enumerate, survey and classify without touching any sink
    pub fn collect(&self, root: &Path, cancel: &CancelFlag) -> Result<Collection> {
        let root = fs::canonicalize(root)
            .map_err(|e| SgrepError::InvalidPath(format!("{}: {e}", root.display())))?;

        let ignore = IgnoreEngine::build(
            &root,
            &self.config.ignore_file,
            &self.config.extra_ignore_patterns,
        )?;

        tracing::info!("Starting file collection from {:?}", root);
        let candidates = FileEnumerator::new(&ignore, self.vcs.as_ref())
            .with_cancel(cancel.clone())
            .enumerate(&root)?;
        let source = candidates.source();
        let (mut candidates, unkeyable): (Vec<CandidatePath>, Vec<CandidatePath>) =
            candidates.partition(CandidatePath::is_utf8);
        tracing::info!("Found {} candidates via {:?}", candidates.len(), source);

        let mut rejected: Vec<RejectedFile> = unkeyable
            .iter()
            .map(|candidate| {
                tracing::warn!(
                    "Skipping {:?}: path is not valid UTF-8",
                    candidate.as_path()
                );
                RejectedFile {
                    path: candidate.key(),
                    reason: RejectReason::NonUtf8Path,
                }
            })
            .collect();

        // Stat-only survey; the size class decides the classifier limits
        let survey: Vec<(&CandidatePath, u64)> = candidates
            .iter()
            .filter_map(|candidate| {
                let metadata = fs::symlink_metadata(candidate.absolute(&root)).ok()?;
                (metadata.file_type().is_file() && metadata.len() > 0)
                    .then_some((candidate, metadata.len()))
            })
            .collect();
        let survey_metrics = CodebaseMetrics::analyze(survey);
        let size_class = SizeClass::classify(&survey_metrics);
        let mut scaling = ScalingConfig::for_class(size_class);
        if let Some(limit) = self.file_limit {
            scaling.max_file_count = scaling.max_file_count.min(limit);
        }
        let description = describe(size_class, &survey_metrics);
        tracing::info!("{}", description);

        let classifier = ContentClassifier::new(ClassifierSettings::new(
            &self.config,
            scaling.max_file_size,
            scaling.filter_aggressiveness,
        ));

        ScalingConfig::prioritize_candidates(&mut candidates);

        let total = candidates.len();
        let mut records = Vec::new();
        let mut dropped = 0;
        let mut cancelled = false;

        for (idx, candidate) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            if records.len() >= scaling.max_file_count {
                dropped = total - idx;
                tracing::info!(
                    "Reached {} accepted files, dropping {} remaining candidates",
                    scaling.max_file_count,
                    dropped
                );
                break;
            }

            if idx > 0 && idx % scaling.progress_interval_files == 0 {
                tracing::info!("Progress: {}/{} candidates classified", idx, total);
            }

            match classifier.classify(&root, candidate) {
                Classification::Accepted(record) => records.push(record),
                Classification::Rejected(reason) => rejected.push(RejectedFile {
                    path: candidate.key(),
                    reason,
                }),
            }
        }

        ScalingConfig::prioritize(&mut records);
        let metrics = CodebaseMetrics::from_records(&records);

        tracing::info!(
            "Collection complete: {} accepted, {} rejected, {} dropped",
            records.len(),
            rejected.len(),
            dropped
        );

        Ok(Collection {
            summary: CodebaseSummary {
                root,
                source,
                size_class,
                description,
                scaling,
                metrics: survey_metrics,
            },
            records,
            metrics,
            rejected,
            dropped,
            cancelled,
        })
    }

    /// Run the whole pipeline against `sink`.
    ///
    /// Fails only on setup problems: an unusable root, invalid ignore
    /// configuration or a sink whose stored state cannot be listed.
    /// Per-file problems end up in the report counters.
    pub fn run<F>(
        &self,
        root: &Path,
        sink: &mut dyn IndexSink,
        force: bool,
        cancel: &CancelFlag,
        mut on_event: F,
    ) -> Result<PipelineReport>
    where
        F: FnMut(PipelineEvent),
    {
        let start = Instant::now();
        let collection = self.collect(root, cancel)?;

        on_event(PipelineEvent::Structure(collection.summary.clone()));
        on_event(PipelineEvent::Filtered {
            accepted: collection.records.len(),
            filtered: collection.filtered(),
            unreadable: collection.unreadable(),
            dropped: collection.dropped,
            reasons: collection.rejection_counts(),
        });

        let existing = sink
            .list_files()
            .map_err(|e| SgrepError::StoreUnavailable(format!("Cannot list stored files: {e}")))?;

        let accepted: HashSet<&str> = collection.records.iter().map(|r| r.path.as_str()).collect();
        let stale: Vec<String> = existing
            .iter()
            .filter(|file| !accepted.contains(file.path.as_str()))
            .map(|file| file.path.clone())
            .collect();
        let detector = ChangeDetector::from_sink_files(existing, force);

        let filtered = collection.filtered();
        let unreadable = collection.unreadable();
        let rejections = collection.rejection_counts();
        let progress_interval = collection.summary.scaling.progress_interval_files.max(1);
        let batch_size = collection.summary.scaling.batch_size;

        let (pending, unchanged): (Vec<FileRecord>, Vec<FileRecord>) = collection
            .records
            .into_iter()
            .partition(|record| detector.needs_indexing(&record.path, &record.fingerprint));
        let skipped = unchanged.len();

        tracing::info!(
            "{} files to index, {} unchanged, {} stale{}",
            pending.len(),
            skipped,
            stale.len(),
            if detector.is_forced() { " (forced)" } else { "" }
        );
        on_event(PipelineEvent::Changes {
            to_index: pending.len(),
            unchanged: skipped,
            stale: stale.len(),
        });

        let total = pending.len();
        let outcome = if collection.cancelled {
            None
        } else {
            let batches = BatchScheduler::schedule(pending, batch_size);
            Some(BatchScheduler::run(batches, sink, cancel, |event| {
                if let ProgressEvent::FileIndexed { progress, .. }
                | ProgressEvent::FileFailed { progress, .. } = &event
                {
                    let processed = progress.indexed + progress.failed;
                    if processed % progress_interval == 0 {
                        tracing::info!(
                            "Progress: {}/{} files uploaded ({:.1}%)",
                            processed,
                            total,
                            progress.percent_complete
                        );
                    }
                }
                on_event(PipelineEvent::Progress(event));
            }))
        };

        let (indexed, failed, cancelled) = match outcome {
            Some(outcome) => (outcome.indexed, outcome.failed, outcome.cancelled),
            None => (0, 0, true),
        };

        // A partial run has not seen every path, so nothing is stale yet
        let removed = if cancelled { 0 } else { prune(sink, &stale) };

        let elapsed_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Indexing complete: {} indexed, {} unchanged, {} errors in {:.2}s{}",
            indexed,
            skipped,
            failed + unreadable,
            elapsed_secs,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(PipelineReport {
            store: None,
            dry_run: false,
            indexed,
            skipped,
            errors: failed + unreadable,
            removed,
            filtered,
            dropped: collection.dropped,
            elapsed_secs,
            cancelled,
            source: collection.summary.source,
            summary: collection.summary,
            rejections,
            rejected_files: collection.rejected,
        })
    }
}

/// Drop `stale` paths from the sink and persist the removal
fn prune(sink: &mut dyn IndexSink, stale: &[String]) -> usize {
    if stale.is_empty() {
        return 0;
    }

    let mut removed = 0;
    for path in stale {
        match sink.remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to drop stale {}: {}", path, e),
        }
    }

    if let Err(e) = sink.flush() {
        tracing::warn!("Failed to persist removal of {} stale paths: {}", removed, e);
        return 0;
    }

    tracing::info!("Dropped {} stale paths", removed);
    removed
}
