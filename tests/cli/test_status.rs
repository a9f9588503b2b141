//! Tests for the status and show-config CLI commands

use crate::cli::test_helpers::create_cli_test_services;
use crate::common::{index_repo, TestRepo};
use sgrep::cli::commands::config::{self, ConfigArgs};
use sgrep::cli::commands::status::{self, StatusArgs};
use sgrep::cli::OutputFormat;

#[tokio::test]
async fn test_status_after_index() {
    let (services, _store_temp) = create_cli_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let result = status::execute(StatusArgs { store: None }, &services, format).await;
        assert!(result.is_ok(), "Status should succeed: {:?}", result.err());
    }
}

#[tokio::test]
async fn test_status_missing_store() {
    let (services, _store_temp) = create_cli_test_services();

    let args = StatusArgs {
        store: Some("missing".to_string()),
    };
    let err = status::execute(args, &services, OutputFormat::Human)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"), "{err}");
}

#[tokio::test]
async fn test_show_config() {
    let (services, _store_temp) = create_cli_test_services();

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let result = config::execute(ConfigArgs {}, &services, format).await;
        assert!(result.is_ok());
    }
}
