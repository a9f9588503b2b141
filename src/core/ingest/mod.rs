//! File ingestion pipeline
//!
//! Turns a directory tree into prioritised, fingerprinted batches
//! ready for upload to an index sink.
//!
//! # Stages
//!
//! - **ignore**: Layered ignore rules (defaults, `.gitignore`, tool file)
//! - **vcs** / **enumerator**: Candidate listing via git or a filesystem walk
//! - **reader** / **language**: Bounded reads, binary sniffing, languages
//! - **classifier**: Content heuristics that accept or reject candidates
//! - **metrics** / **scaling**: Size class and the limits it implies
//! - **change**: Content fingerprints and incremental skipping
//! - **scheduler**: Batching, upload loop and progress
//! - **pipeline**: Orchestration of all of the above

pub mod change;
pub mod classifier;
pub mod enumerator;
pub mod ignore;
pub mod language;
pub mod metrics;
pub mod pipeline;
pub mod reader;
pub mod scaling;
pub mod scheduler;
pub mod vcs;

pub use change::{fingerprint, ChangeDetector};
pub use classifier::{
    Classification, ClassifierSettings, ContentClassifier, ContentHeuristic, FilterAggressiveness,
    RejectReason, Verdict,
};
pub use enumerator::{Candidates, EnumerationSource, FileEnumerator};
pub use ignore::{IgnoreEngine, IgnoreMatch};
pub use metrics::{CodebaseMetrics, SizeClass, SizeDistribution};
pub use pipeline::{
    CodebaseSummary, Collection, IndexingPipeline, PipelineEvent, PipelineReport, RejectedFile,
};
pub use scaling::ScalingConfig;
pub use scheduler::{Batch, BatchScheduler, Progress, ProgressEvent, ProgressTracker, RunOutcome};
pub use vcs::{GitCli, NoVcs, VersionControl};
