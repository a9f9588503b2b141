//! Which files a run selects, and why the others are left out

use crate::common::{collect_paths, pipeline_without_vcs, TestRepo};
use sgrep::core::config::IndexingConfig;
use sgrep::core::error::SgrepError;
use sgrep::core::ingest::classifier::RejectReason;
use sgrep::core::ingest::pipeline::IndexingPipeline;
use sgrep::core::ingest::vcs::NoVcs;
use sgrep::core::types::CancelFlag;

const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

#[test]
fn test_source_kept_vendor_and_images_dropped() {
    let repo = TestRepo::with_files(&[
        ("a.ts", "export const a = 1;\n"),
        ("vendor/b.js", "module.exports = {};\n"),
    ]);
    repo.write("image.png", PNG_HEADER);

    let collection = pipeline_without_vcs()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();

    assert_eq!(collection.paths(), vec!["a.ts"]);
    // image.png never becomes a candidate; vendor/b.js is classified away
    assert_eq!(collection.rejected.len(), 1);
    assert_eq!(collection.rejected[0].path, "vendor/b.js");
    assert_eq!(collection.rejected[0].reason, RejectReason::Vendored);
}

#[test]
fn test_tool_ignore_file_reincludes_over_gitignore() {
    let repo = TestRepo::with_files(&[
        (".gitignore", "*.log\n"),
        (".sgrepignore", "!debug.log\n"),
        ("app.log", "noise\n"),
        ("debug.log", "useful trace\n"),
        ("main.rs", "fn main() {}\n"),
    ]);

    let paths = collect_paths(&pipeline_without_vcs(), repo.path());
    assert_eq!(paths, vec!["main.rs", "debug.log"]);
}

#[test]
fn test_binary_without_extension_rejected() {
    let repo = TestRepo::with_files(&[("main.rs", "fn main() {}\n")]);
    repo.write("blob", [b'a', 0, b'b', 0, b'c']);

    let collection = pipeline_without_vcs()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();

    assert_eq!(collection.paths(), vec!["main.rs"]);
    assert_eq!(collection.rejection_counts()["binary"], 1);
}

#[test]
fn test_generated_file_rejected() {
    let repo = TestRepo::with_files(&[
        ("api.rs", "// Code generated by protoc. DO NOT EDIT.\npub struct Api;\n"),
        ("main.rs", "fn main() {}\n"),
    ]);

    let collection = pipeline_without_vcs()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();

    assert_eq!(collection.paths(), vec!["main.rs"]);
    assert_eq!(collection.rejection_counts()["generated"], 1);
}

#[test]
fn test_hidden_and_dependency_dirs_skipped() {
    let repo = TestRepo::with_files(&[
        (".config/secret.rs", "fn hidden() {}\n"),
        ("node_modules/pkg/index.js", "module.exports = 1;\n"),
        ("target/debug/out.rs", "fn built() {}\n"),
        ("src/app.js", "console.log('app');\n"),
    ]);

    let collection = pipeline_without_vcs()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();

    assert_eq!(collection.paths(), vec!["src/app.js"]);
    // Pruned entries are not rejections
    assert!(collection.rejected.is_empty());
}

#[test]
fn test_extra_patterns_apply_last() {
    let repo = TestRepo::small();
    let config = IndexingConfig {
        extra_ignore_patterns: vec!["*.md".to_string(), "tests/".to_string()],
        ..Default::default()
    };
    let pipeline = IndexingPipeline::new(config).with_vcs(Box::new(NoVcs));

    let paths = collect_paths(&pipeline, repo.path());
    assert!(paths.iter().all(|p| !p.ends_with(".md")));
    assert!(paths.iter().all(|p| !p.starts_with("tests/")));
    assert!(paths.contains(&"src/main.rs".to_string()));
}

#[test]
fn test_invalid_extra_pattern_is_config_error() {
    let repo = TestRepo::small();
    let config = IndexingConfig {
        extra_ignore_patterns: vec!["[z-a].rs".to_string()],
        ..Default::default()
    };
    let pipeline = IndexingPipeline::new(config).with_vcs(Box::new(NoVcs));

    let result = pipeline.collect(repo.path(), &CancelFlag::new());
    assert!(matches!(result, Err(SgrepError::ConfigError(_))));
}

#[test]
fn test_large_file_truncated_at_line_cap() {
    let body: String = (0..500).map(|i| format!("let value_{i} = {i};\n")).collect();
    let repo = TestRepo::with_files(&[("big.rs", &body)]);
    let config = IndexingConfig {
        large_file_threshold_kb: 1,
        max_retained_lines: 10,
        ..Default::default()
    };
    let pipeline = IndexingPipeline::new(config).with_vcs(Box::new(NoVcs));

    let collection = pipeline.collect(repo.path(), &CancelFlag::new()).unwrap();
    let record = &collection.records[0];

    assert!(record.truncated);
    assert_eq!(record.line_count, 10);
    assert_eq!(record.retained_lines, Some(10));
    assert_eq!(record.read_content().unwrap().lines().count(), 10);
    assert_eq!(record.size, body.len() as u64);
    assert_eq!(record.language, Some("rust".to_string()));
}

#[test]
fn test_priority_order_across_kinds() {
    let repo = TestRepo::small();
    let paths = collect_paths(&pipeline_without_vcs(), repo.path());

    let first_doc = paths.iter().position(|p| p.ends_with(".md")).unwrap();
    let last_source = paths.iter().rposition(|p| p.ends_with(".rs")).unwrap();
    assert!(last_source < first_doc);
    assert_eq!(paths.len(), 8);
}

#[test]
fn test_file_limit_drops_least_relevant() {
    let repo = TestRepo::small();
    let pipeline = pipeline_without_vcs().with_file_limit(Some(3));

    let collection = pipeline.collect(repo.path(), &CancelFlag::new()).unwrap();
    assert_eq!(collection.records.len(), 3);
    assert_eq!(collection.dropped, 5);
    assert!(collection.paths().iter().all(|p| p.ends_with(".rs")));
}
