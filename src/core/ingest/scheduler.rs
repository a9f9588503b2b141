//! Batch scheduling and upload.
//!
//! Batches keep the prioritised order of their input. Uploads run
//! sequentially, one file at a time, so a path is never uploaded twice
//! concurrently and the counters need no synchronisation. Each file's
//! text is read right before its upload and dropped after it. A file that
//! cannot be read or uploaded is counted as failed and the run moves on.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::error::{Result, SgrepError};
use crate::core::sink::{IndexSink, UploadRequest};
use crate::core::types::{CancelFlag, FileRecord};

/// Bounded, ordered group of uploads
#[derive(Debug, Clone)]
pub struct Batch {
    /// Zero-based position in the schedule
    pub index: usize,
    pub files: Vec<FileRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Point-in-time upload progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub indexed: usize,
    pub failed: usize,
    pub total: usize,
    pub percent_complete: f64,
    /// None until throughput can be measured
    pub estimated_seconds_remaining: Option<f64>,
}

/// Tracks counters and throughput for one run
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    indexed: usize,
    failed: usize,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            indexed: 0,
            failed: 0,
            started: Instant::now(),
        }
    }

    pub fn record_success(&mut self) {
        self.indexed += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Move `count` successes to failures
    fn demote(&mut self, count: usize) {
        let count = count.min(self.indexed);
        self.indexed -= count;
        self.failed += count;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> Progress {
        self.snapshot_at(self.elapsed())
    }

    fn snapshot_at(&self, elapsed: Duration) -> Progress {
        let processed = self.indexed + self.failed;

        let percent_complete = if self.total == 0 {
            100.0
        } else {
            processed as f64 / self.total as f64 * 100.0
        };

        let seconds = elapsed.as_secs_f64();
        let estimated_seconds_remaining = if processed == 0 || seconds <= 0.0 {
            None
        } else {
            let rate = processed as f64 / seconds;
            Some(self.total.saturating_sub(processed) as f64 / rate)
        };

        Progress {
            indexed: self.indexed,
            failed: self.failed,
            total: self.total,
            percent_complete,
            estimated_seconds_remaining,
        }
    }
}

/// Events emitted while batches are uploaded
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    BatchStarted {
        index: usize,
        total_batches: usize,
        files: usize,
    },
    FileIndexed {
        path: String,
        progress: Progress,
    },
    FileFailed {
        path: String,
        error: String,
        progress: Progress,
    },
    BatchFinished {
        index: usize,
        progress: Progress,
    },
}

/// Totals of one upload run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOutcome {
    pub indexed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Splits uploads into batches and drives them through a sink
pub struct BatchScheduler;

impl BatchScheduler {
    /// Split `files` into consecutive batches of at most `batch_size`.
    ///
    /// A batch size of zero is treated as one.
    pub fn schedule(files: Vec<FileRecord>, batch_size: usize) -> Vec<Batch> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::with_capacity(files.len().div_ceil(batch_size));
        let mut current = Vec::with_capacity(batch_size);

        for file in files {
            current.push(file);
            if current.len() == batch_size {
                let index = batches.len();
                batches.push(Batch {
                    index,
                    files: std::mem::replace(&mut current, Vec::with_capacity(batch_size)),
                });
            }
        }

        if !current.is_empty() {
            let index = batches.len();
            batches.push(Batch {
                index,
                files: current,
            });
        }

        batches
    }

    /// Upload every batch in order.
    ///
    /// Cancellation is checked before each file. The sink is flushed
    /// after every batch and when the run is cancelled; if a flush fails,
    /// that batch's uploads are counted as failures.
    pub fn run<F>(
        batches: Vec<Batch>,
        sink: &mut dyn IndexSink,
        cancel: &CancelFlag,
        mut on_event: F,
    ) -> RunOutcome
    where
        F: FnMut(ProgressEvent),
    {
        let total = batches.iter().map(Batch::len).sum();
        let total_batches = batches.len();
        let mut tracker = ProgressTracker::new(total);
        let mut cancelled = false;

        'batches: for batch in batches {
            on_event(ProgressEvent::BatchStarted {
                index: batch.index,
                total_batches,
                files: batch.len(),
            });

            let mut uploaded_in_batch = 0;

            for record in &batch.files {
                if cancel.is_cancelled() {
                    cancelled = true;
                    flush(sink, &mut tracker, uploaded_in_batch);
                    break 'batches;
                }

                match upload(sink, record) {
                    Ok(()) => {
                        tracker.record_success();
                        uploaded_in_batch += 1;
                        on_event(ProgressEvent::FileIndexed {
                            path: record.path.clone(),
                            progress: tracker.snapshot(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Failed to upload {}: {}", record.path, e);
                        tracker.record_failure();
                        on_event(ProgressEvent::FileFailed {
                            path: record.path.clone(),
                            error: e.to_string(),
                            progress: tracker.snapshot(),
                        });
                    }
                }
            }

            flush(sink, &mut tracker, uploaded_in_batch);

            on_event(ProgressEvent::BatchFinished {
                index: batch.index,
                progress: tracker.snapshot(),
            });
        }

        let progress = tracker.snapshot();
        RunOutcome {
            indexed: progress.indexed,
            failed: progress.failed,
            elapsed: tracker.elapsed(),
            cancelled,
        }
    }
}

fn upload(sink: &mut dyn IndexSink, record: &FileRecord) -> Result<()> {
    let content = record.read_content().map_err(|e| {
        SgrepError::UploadFailed(format!("Cannot read {}: {e}", record.path))
    })?;

    sink.upload_file(&UploadRequest {
        path: &record.path,
        content: &content,
        fingerprint: &record.fingerprint,
        size: record.size,
        last_modified: record.last_modified,
    })
}

fn flush(sink: &mut dyn IndexSink, tracker: &mut ProgressTracker, uploaded_in_batch: usize) {
    if let Err(e) = sink.flush() {
        tracing::warn!(
            "Failed to flush sink, {} uploads not persisted: {}",
            uploaded_in_batch,
            e
        );
        tracker.demote(uploaded_in_batch);
    }
}
