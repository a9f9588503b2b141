//! Tests for the clean CLI command

use crate::cli::test_helpers::create_cli_test_services;
use crate::common::{index_repo, TestRepo};
use sgrep::cli::commands::clean::{self, CleanArgs};
use sgrep::cli::OutputFormat;
use sgrep::core::services::IndexRequest;
use sgrep::core::sink::FileStore;
use sgrep::core::types::CancelFlag;

fn index_into(services: &sgrep::core::services::Services, repo: &TestRepo, store: &str) {
    let request = IndexRequest {
        root: repo.path().to_path_buf(),
        store: Some(store.to_string()),
        ..Default::default()
    };
    services
        .index_repository(&request, &CancelFlag::new(), |_| {})
        .expect("Indexing should succeed");
}

#[tokio::test]
async fn test_list_stores() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);
    index_into(&services, &repo, "docs");

    let listing = clean::list_stores(&services).unwrap();
    let names: Vec<&str> = listing.stores.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["default", "docs"]);
    assert!(listing.stores.iter().all(|s| s.file_count == 8));

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let args = CleanArgs {
            list: true,
            ..Default::default()
        };
        let result = clean::execute(args, &services, format).await;
        assert!(result.is_ok(), "Listing should succeed: {:?}", result.err());
    }
}

#[tokio::test]
async fn test_delete_one_store() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);
    index_into(&services, &repo, "docs");

    let args = CleanArgs {
        store: Some("docs".to_string()),
        force: true,
        ..Default::default()
    };
    clean::execute(args, &services, OutputFormat::Json)
        .await
        .unwrap();

    let store_dir = &services.config.storage.store_dir;
    assert_eq!(FileStore::list_stores(store_dir).unwrap(), vec!["default"]);
}

#[tokio::test]
async fn test_delete_all_stores() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);
    index_into(&services, &repo, "docs");

    let args = CleanArgs {
        all: true,
        force: true,
        ..Default::default()
    };
    clean::execute(args, &services, OutputFormat::Human)
        .await
        .unwrap();

    assert!(clean::list_stores(&services).unwrap().stores.is_empty());
}

#[tokio::test]
async fn test_delete_missing_store() {
    let (services, _store_temp) = create_cli_test_services();

    let args = CleanArgs {
        store: Some("missing".to_string()),
        force: true,
        ..Default::default()
    };
    let err = clean::execute(args, &services, OutputFormat::Human)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"), "{err}");
}

#[tokio::test]
async fn test_delete_rejects_path_like_name() {
    let (services, store_temp) = create_cli_test_services();
    let nested = store_temp.path().join("stores");
    let mut config = (*services.config).clone();
    config.storage.store_dir = nested.clone();
    let services = std::sync::Arc::new(sgrep::core::services::Services::new(config));
    let sibling = store_temp.path().join("keep");
    std::fs::create_dir_all(&sibling).unwrap();
    std::fs::create_dir_all(&nested).unwrap();

    let args = CleanArgs {
        store: Some("../keep".to_string()),
        force: true,
        ..Default::default()
    };
    let err = clean::execute(args, &services, OutputFormat::Human)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid characters"), "{err}");
    assert!(sibling.exists());
}
