// Test helper functions

use sgrep::core::config::{Config, IndexingConfig};
use sgrep::core::ingest::pipeline::{IndexingPipeline, PipelineReport};
use sgrep::core::ingest::vcs::NoVcs;
use sgrep::core::services::{IndexRequest, Services};
use sgrep::core::types::CancelFlag;
use std::path::Path;
use tempfile::TempDir;

/// Create test services with temporary store directory
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services() -> (Services, TempDir) {
    create_test_services_with(IndexingConfig::default())
}

/// Create test services with custom indexing settings (VCS always off)
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services_with(indexing: IndexingConfig) -> (Services, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.storage.store_dir = temp_dir.path().to_path_buf();
    config.indexing = indexing;
    config.indexing.use_vcs = false;

    (Services::new(config), temp_dir)
}

/// Pipeline that always walks the filesystem
#[allow(dead_code)] // Used in integration tests
pub fn pipeline_without_vcs() -> IndexingPipeline {
    IndexingPipeline::new(IndexingConfig::default()).with_vcs(Box::new(NoVcs))
}

/// Accepted paths of a repository, in priority order
#[allow(dead_code)] // Used in integration tests
pub fn collect_paths(pipeline: &IndexingPipeline, root: &Path) -> Vec<String> {
    let collection = pipeline
        .collect(root, &CancelFlag::new())
        .expect("Collection should succeed");
    collection.records.into_iter().map(|r| r.path).collect()
}

/// Index a repository into the default store
#[allow(dead_code)] // Used in integration tests
pub fn index_repo(services: &Services, root: &Path, force: bool) -> PipelineReport {
    let request = IndexRequest {
        root: root.to_path_buf(),
        force,
        ..Default::default()
    };
    services
        .index_repository(&request, &CancelFlag::new(), |_| {})
        .expect("Indexing should succeed")
}
