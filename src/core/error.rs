//! Error types and error handling for the sgrep ingestion pipeline.
//!
//! Errors local to a single file never leave the batch scheduler; the
//! variants here surface whole-run failures (bad root, unusable store,
//! invalid configuration) and the per-call failures of the standalone
//! accessors.

use thiserror::Error;

/// Result type alias for sgrep operations
pub type Result<T> = std::result::Result<T, SgrepError>;

/// Main error type for sgrep
#[derive(Error, Debug)]
pub enum SgrepError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid store name: {0}")]
    InvalidStoreName(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Indexing failed: {0}")]
    IndexingFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl SgrepError {
    /// Check if this error names a path or store that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SgrepError::InvalidPath(_) | SgrepError::StoreNotFound(_))
    }

    /// Check if this error aborts an indexing run.
    ///
    /// Only setup failures are fatal: the root cannot be used or the sink
    /// cannot be initialised.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SgrepError::InvalidPath(_)
                | SgrepError::InvalidStoreName(_)
                | SgrepError::StoreUnavailable(_)
                | SgrepError::ConfigError(_)
        )
    }
}
