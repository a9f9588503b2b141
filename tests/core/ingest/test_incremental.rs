//! Incremental runs: fingerprints, forced re-indexing and batching

use crate::common::{
    create_test_services, create_test_services_with, index_repo, pipeline_without_vcs, TestRepo,
};
use sgrep::core::config::IndexingConfig;
use sgrep::core::ingest::change::fingerprint;
use sgrep::core::ingest::pipeline::PipelineEvent;
use sgrep::core::ingest::scheduler::ProgressEvent;
use sgrep::core::services::IndexRequest;
use sgrep::core::sink::{IndexSink, MemorySink};
use sgrep::core::types::CancelFlag;
use std::collections::HashSet;

#[test]
fn test_second_run_uploads_nothing() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::small();

    let first = index_repo(&services, repo.path(), false);
    assert_eq!(first.indexed, 8);
    assert_eq!(first.errors, 0);

    let second = index_repo(&services, repo.path(), false);
    assert_eq!(second.indexed, 0);
    assert_eq!(second.skipped, 8);
}

#[test]
fn test_single_byte_change_is_reindexed() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::with_files(&[
        ("a.rs", "fn a() -> u8 { 1 }\n"),
        ("b.rs", "fn b() -> u8 { 2 }\n"),
    ]);
    index_repo(&services, repo.path(), false);

    repo.write("a.rs", "fn a() -> u8 { 3 }\n");
    assert_ne!(
        fingerprint(b"fn a() -> u8 { 1 }\n"),
        fingerprint(b"fn a() -> u8 { 3 }\n")
    );

    let report = index_repo(&services, repo.path(), false);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.skipped, 1);

    let store = services.open_existing_store(None).unwrap();
    assert_eq!(store.read_content("a.rs").unwrap(), "fn a() -> u8 { 3 }\n");
}

#[test]
fn test_force_reindexes_everything() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);

    let report = index_repo(&services, repo.path(), true);
    assert_eq!(report.indexed, 8);
    assert_eq!(report.skipped, 0);
}

#[test]
fn test_deleted_file_is_dropped_from_store() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::with_files(&[
        ("a.rs", "fn a() -> u8 { 0 }\n"),
        ("b.rs", "fn b() {}\n"),
    ]);
    index_repo(&services, repo.path(), false);
    for version in 1..=5 {
        repo.write("a.rs", format!("fn a() -> u8 {{ {version} }}\n"));
        index_repo(&services, repo.path(), false);
    }

    repo.remove("b.rs");
    let report = index_repo(&services, repo.path(), false);
    assert_eq!(report.indexed, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.removed, 1);
    assert_eq!(report.errors, 0);

    let store = services.open_existing_store(None).unwrap();
    assert_eq!(store.get_info().unwrap().file_count, 1);
    assert!(store.entry("b.rs").is_none());
    // Only the latest a.rs is still referenced
    assert_eq!(store.blob_count().unwrap(), 1);
}

#[test]
fn test_cancelled_run_keeps_unseen_entries() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);

    let request = IndexRequest {
        root: repo.path().to_path_buf(),
        ..Default::default()
    };
    let cancel = CancelFlag::new();
    cancel.cancel();
    let report = services.index_repository(&request, &cancel, |_| {}).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.removed, 0);
    let store = services.open_existing_store(None).unwrap();
    assert_eq!(store.get_info().unwrap().file_count, 8);
}

#[test]
fn test_invalid_utf8_change_past_sample_is_reindexed() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::small();
    let mut body = "// filler line\n".repeat(640).into_bytes();
    body.extend_from_slice(b"// caf\xe9\n");
    repo.write("a.rs", &body);
    index_repo(&services, repo.path(), false);

    let last = body.len() - 2;
    body[last] = 0xe8;
    repo.write("a.rs", &body);
    let report = index_repo(&services, repo.path(), false);

    assert_eq!(report.indexed, 1);
    assert_eq!(report.skipped, 8);
    let store = services.open_existing_store(None).unwrap();
    assert_eq!(store.entry("a.rs").unwrap().fingerprint, fingerprint(&body));
}

#[test]
fn test_edit_past_line_cap_is_reindexed() {
    let (services, _store_dir) = create_test_services_with(IndexingConfig {
        large_file_threshold_kb: 1,
        max_retained_lines: 10,
        ..Default::default()
    });
    let mut lines: Vec<String> = (0..300).map(|i| format!("let v{i} = {i};")).collect();
    let body = lines.join("\n") + "\n";
    let repo = TestRepo::with_files(&[("big.rs", body.as_str())]);
    let first = index_repo(&services, repo.path(), false);
    assert_eq!(first.indexed, 1);

    lines[299] = "let v299 = 0;".to_string();
    repo.write("big.rs", lines.join("\n") + "\n");
    let second = index_repo(&services, repo.path(), false);

    assert_eq!(second.indexed, 1);
    assert_eq!(second.skipped, 0);
    let store = services.open_existing_store(None).unwrap();
    assert_eq!(store.read_content("big.rs").unwrap().lines().count(), 10);
}

#[test]
fn test_line_ending_change_is_reindexed() {
    let (services, _store_dir) = create_test_services();
    let repo = TestRepo::with_files(&[
        ("a.rs", "fn a() {}\nfn b() {}\n"),
        ("c.rs", "fn c() {}\n"),
    ]);
    index_repo(&services, repo.path(), false);

    repo.write("a.rs", "fn a() {}\r\nfn b() {}\r\n");
    let report = index_repo(&services, repo.path(), false);

    assert_eq!(report.indexed, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_every_file_reported_exactly_once() {
    let files: Vec<(String, String)> = (0..23)
        .map(|i| (format!("src/m{i:02}.rs"), format!("pub fn f{i}() {{}}\n")))
        .collect();
    let specs: Vec<(&str, &str)> = files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();
    let repo = TestRepo::with_files(&specs);
    let mut sink = MemorySink::default();

    let mut seen = HashSet::new();
    let mut batches = 0;
    let report = pipeline_without_vcs()
        .run(repo.path(), &mut sink, false, &CancelFlag::new(), |event| {
            match event {
                PipelineEvent::Progress(ProgressEvent::FileIndexed { path, .. }) => {
                    assert!(seen.insert(path), "file reported twice");
                }
                PipelineEvent::Progress(ProgressEvent::BatchStarted { files, .. }) => {
                    assert!(files <= 10);
                    batches += 1;
                }
                _ => {}
            }
        })
        .unwrap();

    assert_eq!(report.indexed, 23);
    assert_eq!(seen.len(), 23);
    // Small codebases upload in batches of 10
    assert_eq!(batches, 3);
    assert_eq!(sink.flush_count(), 3);
    assert_eq!(sink.get_info().unwrap().file_count, 23);
}

#[test]
fn test_cancelled_run_reports_partial_progress() {
    let repo = TestRepo::small();
    let mut sink = MemorySink::default();
    let cancel = CancelFlag::new();

    let report = pipeline_without_vcs()
        .run(repo.path(), &mut sink, false, &cancel, |event| {
            if let PipelineEvent::Progress(ProgressEvent::FileIndexed { .. }) = event {
                cancel.cancel();
            }
        })
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.indexed, 1);
    assert_eq!(sink.upload_count(), 1);
    // Whatever was uploaded before the cancel was flushed
    assert!(sink.flush_count() >= 1);
}

#[test]
fn test_failed_uploads_retried_next_run() {
    let repo = TestRepo::with_files(&[
        ("a.rs", "fn a() {}\n"),
        ("b.rs", "fn b() {}\n"),
    ]);
    let pipeline = pipeline_without_vcs();

    let mut flaky = MemorySink::default().fail_on("b.rs");
    let first = pipeline
        .run(repo.path(), &mut flaky, false, &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(first.indexed, 1);
    assert_eq!(first.errors, 1);

    // A healthy sink that already holds a.rs only needs b.rs
    let mut healthy = MemorySink::default().with_fingerprints(flaky.list_files().unwrap());
    let second = pipeline
        .run(repo.path(), &mut healthy, false, &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(second.indexed, 1);
    assert_eq!(second.skipped, 1);
    assert!(healthy.get("b.rs").is_some());
}
