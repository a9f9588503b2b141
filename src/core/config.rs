//! Configuration management for sgrep.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.
//! The loaded [`Config`] is an explicit value: it is built once per run
//! and handed to every component that needs it.

use crate::core::error::{Result, SgrepError};
use crate::core::sink::store::validate_store_name;
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Indexing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    /// Name of the tool-specific ignore file at the indexing root
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,

    /// Extra ignore patterns (gitignore syntax), applied last
    #[serde(default)]
    pub extra_ignore_patterns: Vec<String>,

    /// Use `git ls-files` when the root is inside a working tree
    #[serde(default = "default_use_vcs")]
    pub use_vcs: bool,

    /// Files above this size (KB) are read line by line
    #[serde(default = "default_large_file_threshold_kb")]
    pub large_file_threshold_kb: u64,

    /// Line cap for line-by-line reads; content past it is truncated
    #[serde(default = "default_max_retained_lines")]
    pub max_retained_lines: usize,

    /// Bytes sampled for binary/generated/minified detection
    #[serde(default = "default_sample_bytes")]
    pub sample_bytes: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory holding one directory per store
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Store used when none is named
    #[serde(default = "default_store")]
    pub default_store: String,
}

// Default value functions
fn default_ignore_file() -> String {
    ".sgrepignore".to_string()
}

fn default_use_vcs() -> bool {
    true
}

fn default_large_file_threshold_kb() -> u64 {
    128
}

fn default_max_retained_lines() -> usize {
    10_000
}

fn default_sample_bytes() -> usize {
    8192
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./data/stores")
}

fn default_store() -> String {
    "default".to_string()
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            ignore_file: default_ignore_file(),
            extra_ignore_patterns: Vec::new(),
            use_vcs: default_use_vcs(),
            large_file_threshold_kb: default_large_file_threshold_kb(),
            max_retained_lines: default_max_retained_lines(),
            sample_bytes: default_sample_bytes(),
        }
    }
}

impl IndexingConfig {
    /// Large-file threshold in bytes
    pub fn large_file_threshold_bytes(&self) -> u64 {
        self.large_file_threshold_kb * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            default_store: default_store(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SgrepError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. SGREP_CONFIG env var
    /// 2. XDG config file (~/.config/sgrep/config.toml)
    /// 3. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("SGREP_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else {
                Self::default()
            }
        };

        // Stores live under the XDG data dir unless placed explicitly
        if env::var("SGREP_STORE_DIR").is_err() && config.storage.store_dir == default_store_dir()
        {
            config.storage.store_dir = xdg.stores_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(name) = env::var("SGREP_IGNORE_FILE") {
            self.indexing.ignore_file = name;
        }
        if let Ok(use_vcs) = env::var("SGREP_USE_VCS") {
            if let Ok(v) = use_vcs.parse() {
                self.indexing.use_vcs = v;
            }
        }
        if let Ok(threshold) = env::var("SGREP_LARGE_FILE_THRESHOLD_KB") {
            if let Ok(kb) = threshold.parse() {
                self.indexing.large_file_threshold_kb = kb;
            }
        }
        if let Ok(lines) = env::var("SGREP_MAX_RETAINED_LINES") {
            if let Ok(n) = lines.parse() {
                self.indexing.max_retained_lines = n;
            }
        }
        if let Ok(sample) = env::var("SGREP_SAMPLE_BYTES") {
            if let Ok(n) = sample.parse() {
                self.indexing.sample_bytes = n;
            }
        }

        if let Ok(dir) = env::var("SGREP_STORE_DIR") {
            self.storage.store_dir = PathBuf::from(dir);
        }
        if let Ok(store) = env::var("SGREP_DEFAULT_STORE") {
            self.storage.default_store = store;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.indexing.ignore_file.trim().is_empty() {
            return Err(SgrepError::ConfigError(
                "Ignore file name must not be empty".to_string(),
            ));
        }

        if self.indexing.large_file_threshold_kb == 0 {
            return Err(SgrepError::ConfigError(
                "Large file threshold must be non-zero".to_string(),
            ));
        }

        if self.indexing.max_retained_lines == 0 {
            return Err(SgrepError::ConfigError(
                "Max retained lines must be non-zero".to_string(),
            ));
        }

        if self.indexing.sample_bytes == 0 {
            return Err(SgrepError::ConfigError(
                "Sample size must be non-zero".to_string(),
            ));
        }

        validate_store_name(&self.storage.default_store)
            .map_err(|e| SgrepError::ConfigError(format!("Default store: {e}")))?;

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Ignore file: {}", self.indexing.ignore_file);
        tracing::info!(
            "  Extra ignore patterns: {} patterns",
            self.indexing.extra_ignore_patterns.len()
        );
        tracing::info!("  Use VCS listing: {}", self.indexing.use_vcs);
        tracing::info!(
            "  Large file threshold: {} KB",
            self.indexing.large_file_threshold_kb
        );
        tracing::info!("  Max retained lines: {}", self.indexing.max_retained_lines);
        tracing::info!("  Sample bytes: {}", self.indexing.sample_bytes);
        tracing::info!("  Store dir: {:?}", self.storage.store_dir);
        tracing::info!("  Default store: {}", self.storage.default_store);
    }
}
