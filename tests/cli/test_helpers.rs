//! CLI test helpers
//!
//! Provides Arc<Services> wrappers matching CLI execute() signatures.

use sgrep::core::config::Config;
use sgrep::core::services::Services;
use std::sync::Arc;
use tempfile::TempDir;

/// Create test services wrapped in Arc (matching CLI execute() signatures)
pub fn create_cli_test_services() -> (Arc<Services>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.storage.store_dir = temp_dir.path().to_path_buf();
    config.indexing.use_vcs = false;

    (Arc::new(Services::new(config)), temp_dir)
}
