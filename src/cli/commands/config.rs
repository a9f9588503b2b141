//! Config command - show current configuration

use crate::cli::output;
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::services::Services;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_file: String,
    #[serde(flatten)]
    pub config: Config,
}

/// Execute the config command
pub async fn execute(
    _args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let xdg = XdgDirs::new();
    let response = ConfigResponse {
        config_file: xdg.config_file().display().to_string(),
        config: Config::clone(&services.config),
    };

    match format {
        OutputFormat::Human => {
            let indexing = &response.config.indexing;
            let storage = &response.config.storage;
            println!("Configuration:");
            println!("  config_file: {}", response.config_file);
            println!("  indexing:");
            println!("    ignore_file: {}", indexing.ignore_file);
            println!(
                "    extra_ignore_patterns: {:?}",
                indexing.extra_ignore_patterns
            );
            println!("    use_vcs: {}", indexing.use_vcs);
            println!(
                "    large_file_threshold_kb: {}",
                indexing.large_file_threshold_kb
            );
            println!("    max_retained_lines: {}", indexing.max_retained_lines);
            println!("    sample_bytes: {}", indexing.sample_bytes);
            println!("  storage:");
            println!("    store_dir: {}", storage.store_dir.display());
            println!("    default_store: {}", storage.default_store);
        }
        OutputFormat::Json => output::print_json(&response)?,
    }

    Ok(())
}
