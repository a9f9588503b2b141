//! Unified service container for sgrep
//!
//! Provides shared access to configuration, pipelines and stores.

use crate::core::config::Config;
use crate::core::error::{Result, SgrepError};
use crate::core::ingest::pipeline::{IndexingPipeline, PipelineEvent, PipelineReport};
use crate::core::sink::{validate_store_name, FileStore, IndexSink, MemorySink};
use crate::core::types::CancelFlag;
use std::path::PathBuf;
use std::sync::Arc;

/// One indexing request
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
    /// Repository root
    pub root: PathBuf,
    /// Target store; the configured default when `None`
    pub store: Option<String>,
    /// Re-index files even when unchanged
    pub force: bool,
    /// Keep per-file rejections in the report
    pub verbose: bool,
    /// Run against an in-memory copy of the store's fingerprints
    pub dry_run: bool,
    /// Upper bound on accepted files
    pub max_files: Option<usize>,
}

/// Unified services container
///
/// All front ends use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Create services from configuration
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Create an IndexingPipeline from the indexing configuration
    pub fn create_pipeline(&self) -> IndexingPipeline {
        IndexingPipeline::new(self.config.indexing.clone())
    }

    /// Resolve a requested store name against the configured default
    pub fn store_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .unwrap_or_else(|| self.config.storage.default_store.clone())
    }

    /// Open (or create) a store
    pub fn open_store(&self, name: Option<&str>) -> Result<FileStore> {
        FileStore::open(&self.config.storage.store_dir, &self.store_name(name))
    }

    /// Open a store that must already exist
    pub fn open_existing_store(&self, name: Option<&str>) -> Result<FileStore> {
        FileStore::open_existing(&self.config.storage.store_dir, &self.store_name(name))
    }

    /// Index a repository into a store.
    ///
    /// Fails before touching anything when the store name is invalid or
    /// the root is not a directory.
    pub fn index_repository<F>(
        &self,
        request: &IndexRequest,
        cancel: &CancelFlag,
        on_event: F,
    ) -> Result<PipelineReport>
    where
        F: FnMut(PipelineEvent),
    {
        let store_name = self.store_name(request.store.as_deref());
        validate_store_name(&store_name)?;

        if !request.root.is_dir() {
            return Err(SgrepError::InvalidPath(format!(
                "Path is not a directory: {}",
                request.root.display()
            )));
        }

        let pipeline = self.create_pipeline().with_file_limit(request.max_files);

        let mut report = if request.dry_run {
            let mut sink = self.dry_run_sink(&store_name)?;
            pipeline.run(&request.root, &mut sink, request.force, cancel, on_event)?
        } else {
            let mut sink = self.open_store(Some(&store_name))?;
            pipeline.run(&request.root, &mut sink, request.force, cancel, on_event)?
        };

        report.store = Some(store_name);
        report.dry_run = request.dry_run;
        if !request.verbose {
            report.rejected_files.clear();
        }

        Ok(report)
    }

    /// Delete a store and everything it holds
    pub fn remove_store(&self, name: &str) -> Result<()> {
        FileStore::remove(&self.config.storage.store_dir, name)
    }

    /// In-memory sink that sees the fingerprints of an existing store
    fn dry_run_sink(&self, store_name: &str) -> Result<MemorySink> {
        let sink = MemorySink::new(store_name);
        match FileStore::open_existing(&self.config.storage.store_dir, store_name) {
            Ok(store) => Ok(sink.with_fingerprints(store.list_files()?)),
            Err(e) if e.is_not_found() => Ok(sink),
            Err(e) => Err(e),
        }
    }
}
