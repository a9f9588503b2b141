//! Tests for the index CLI command

use crate::cli::test_helpers::create_cli_test_services;
use crate::common::TestRepo;
use sgrep::cli::commands::index::{execute, IndexArgs};
use sgrep::cli::OutputFormat;
use sgrep::core::sink::IndexSink;

fn args(repo: &TestRepo) -> IndexArgs {
    IndexArgs {
        path: repo.path().to_path_buf(),
        store: None,
        force: false,
        verbose: false,
        dry_run: false,
        max_files: None,
        quiet: true,
    }
}

#[tokio::test]
async fn test_index_human() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();

    let result = execute(args(&repo), &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Index should succeed: {:?}", result.err());

    let store = services.open_existing_store(None).unwrap();
    assert_eq!(store.get_info().unwrap().file_count, 8);
}

#[tokio::test]
async fn test_index_json_into_named_store() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();

    let named = IndexArgs {
        store: Some("project".to_string()),
        ..args(&repo)
    };
    let result = execute(named, &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Index (JSON) should succeed");
    assert!(services.open_existing_store(Some("project")).is_ok());
}

#[tokio::test]
async fn test_index_dry_run_creates_no_store() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();

    let dry = IndexArgs {
        dry_run: true,
        verbose: true,
        ..args(&repo)
    };
    let result = execute(dry, &services, OutputFormat::Human).await;
    assert!(result.is_ok());
    assert!(services.open_existing_store(None).is_err());
}

#[tokio::test]
async fn test_index_invalid_path() {
    let (services, store_temp) = create_cli_test_services();

    let missing = IndexArgs {
        path: store_temp.path().join("does-not-exist"),
        store: None,
        force: false,
        verbose: false,
        dry_run: false,
        max_files: None,
        quiet: true,
    };
    let result = execute(missing, &services, OutputFormat::Human).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_index_invalid_store_name() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();

    let bad = IndexArgs {
        store: Some("no spaces allowed".to_string()),
        ..args(&repo)
    };
    let err = execute(bad, &services, OutputFormat::Human)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("store name"), "{err}");
}
