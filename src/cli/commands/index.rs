//! Index command - index a repository into a store

use crate::cli::output::{self, colors, format_count, format_duration};
use crate::cli::OutputFormat;
use crate::core::ingest::pipeline::{PipelineEvent, PipelineReport};
use crate::core::ingest::scheduler::ProgressEvent;
use crate::core::services::{IndexRequest, Services};
use crate::core::types::CancelFlag;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Path to the repository to index
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Store to index into (defaults to the configured default store)
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Re-index every file, even unchanged ones
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Log per-file decisions and list rejected files
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Run the whole pipeline without writing to the store
    #[arg(long)]
    pub dry_run: bool,

    /// Stop after this many accepted files (most relevant first)
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Suppress progress output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Execute the index command
pub async fn execute(
    args: IndexArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.path.canonicalize().map_err(|e| {
        format!(
            "Invalid path '{}': {}. Make sure the path exists and is accessible.",
            args.path.display(),
            e
        )
    })?;

    let request = IndexRequest {
        root: path,
        store: args.store,
        force: args.force,
        verbose: args.verbose,
        dry_run: args.dry_run,
        max_files: args.max_files,
    };

    let show_progress = output::shows_progress(format, args.quiet);
    if show_progress {
        eprintln!(
            "Indexing {} into '{}'{}...",
            colors::file_path(&request.root.display().to_string()),
            colors::store(&services.store_name(request.store.as_deref())),
            if request.dry_run { " (dry run)" } else { "" }
        );
    }

    let cancel = CancelFlag::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output::print_warning("Interrupted, finishing current file...");
                cancel.cancel();
            }
        })
    };

    let worker = {
        let services = Arc::clone(services);
        tokio::task::spawn_blocking(move || {
            services.index_repository(&request, &cancel, |event| {
                if show_progress {
                    print_event(&event);
                }
            })
        })
    };

    let result = worker.await;
    interrupt.abort();
    let report = match result? {
        Ok(report) => report,
        Err(e) if e.is_fatal() => return Err(format!("Indexing aborted: {e}").into()),
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Human => print_report(&report),
        OutputFormat::Json => output::print_json(&report)?,
    }

    Ok(())
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Structure(summary) => {
            eprintln!("{}", colors::label(&summary.description));
            let top: Vec<String> = summary
                .metrics
                .top_extensions(5)
                .into_iter()
                .map(|(ext, count)| format!("{ext} ({})", format_count(count)))
                .collect();
            if !top.is_empty() {
                eprintln!("  {}", colors::dim(&top.join(", ")));
            }
        }
        PipelineEvent::Filtered {
            accepted,
            filtered,
            unreadable,
            dropped,
            ..
        } => {
            eprintln!(
                "Selected {} files ({} filtered, {} unreadable, {} over limit)",
                colors::number(&format_count(*accepted)),
                colors::number(&format_count(*filtered)),
                colors::number(&format_count(*unreadable)),
                colors::number(&format_count(*dropped))
            );
        }
        PipelineEvent::Changes {
            to_index,
            unchanged,
            stale,
        } => {
            eprintln!(
                "{} to index, {} unchanged, {} no longer present",
                colors::number(&format_count(*to_index)),
                colors::number(&format_count(*unchanged)),
                colors::number(&format_count(*stale))
            );
        }
        PipelineEvent::Progress(ProgressEvent::BatchFinished { index, progress }) => {
            eprintln!(
                "  batch {} done: {}/{} ({:.0}%)",
                index + 1,
                progress.indexed + progress.failed,
                progress.total,
                progress.percent_complete
            );
        }
        PipelineEvent::Progress(ProgressEvent::FileFailed { path, error, .. }) => {
            output::print_warning(&format!("{path}: {error}"));
        }
        PipelineEvent::Progress(_) => {}
    }
}

fn print_report(report: &PipelineReport) {
    let verb = if report.dry_run {
        "Would index"
    } else {
        "Indexed"
    };
    println!(
        "{} {} files ({} unchanged, {} errors) in {}",
        colors::success(verb),
        colors::number(&format_count(report.indexed)),
        colors::number(&format_count(report.skipped)),
        colors::number(&format_count(report.errors)),
        colors::number(&format_duration(report.elapsed_secs))
    );
    println!(
        "{} via {:?}, {} filtered, {} over limit, {} removed from store",
        colors::dim(&report.summary.description),
        report.source,
        colors::number(&format_count(report.filtered)),
        colors::number(&format_count(report.dropped)),
        colors::number(&format_count(report.removed))
    );

    if report.cancelled {
        output::print_warning("Run was cancelled; the store holds everything uploaded so far");
    }

    for rejected in &report.rejected_files {
        println!(
            "  {} {}",
            colors::dim(rejected.reason.label()),
            colors::file_path(&rejected.path)
        );
    }
}
