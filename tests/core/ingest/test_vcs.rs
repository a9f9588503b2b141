//! Git fast path and its filesystem-walk fallback

use crate::common::TestRepo;
use sgrep::core::config::IndexingConfig;
use sgrep::core::ingest::enumerator::EnumerationSource;
use sgrep::core::ingest::pipeline::IndexingPipeline;
use sgrep::core::types::CancelFlag;

fn git_pipeline() -> IndexingPipeline {
    IndexingPipeline::new(IndexingConfig::default())
}

#[test]
fn test_git_listing_with_reinclusion() {
    let repo = TestRepo::with_files(&[
        (".gitignore", "*.log\n"),
        (".sgrepignore", "!debug.log\n"),
        ("app.log", "noise\n"),
        ("debug.log", "useful trace\n"),
        ("main.rs", "fn main() {}\n"),
        ("src/lib.rs", "pub fn lib() {}\n"),
    ]);
    if !repo.init_git() {
        eprintln!("git unavailable, skipping");
        return;
    }

    let collection = git_pipeline()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();
    let paths = collection.paths();

    assert_eq!(collection.summary.source, EnumerationSource::Vcs);
    assert!(paths.contains(&"main.rs"));
    assert!(paths.contains(&"src/lib.rs"));
    assert!(paths.contains(&"debug.log"));
    assert!(!paths.contains(&"app.log"));
}

#[test]
fn test_git_listing_respects_builtin_exclusions() {
    let repo = TestRepo::with_files(&[
        ("main.rs", "fn main() {}\n"),
        ("node_modules/dep/index.js", "module.exports = 1;\n"),
        ("Cargo.lock", "# lock\n"),
    ]);
    if !repo.init_git() {
        eprintln!("git unavailable, skipping");
        return;
    }

    let collection = git_pipeline()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();

    assert_eq!(collection.summary.source, EnumerationSource::Vcs);
    assert_eq!(collection.paths(), vec!["main.rs"]);
}

#[test]
fn test_plain_directory_falls_back_to_walk() {
    let repo = TestRepo::small();

    let collection = git_pipeline()
        .collect(repo.path(), &CancelFlag::new())
        .unwrap();

    assert_eq!(collection.summary.source, EnumerationSource::Walk);
    assert_eq!(collection.records.len(), 8);
}
