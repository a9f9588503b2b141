//! Status command - show what a store holds

use crate::cli::output::{self, colors, format_bytes, format_count, format_relative_time};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::sink::{FileStore, IndexSink, SinkInfo};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Store to inspect (defaults to the configured default store)
    #[arg(long, short = 's')]
    pub store: Option<String>,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub info: SinkInfo,
    pub location: String,
    /// Every store found next to this one
    pub stores: Vec<String>,
}

/// Execute the status command
pub async fn execute(
    args: StatusArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = services.open_existing_store(args.store.as_deref())?;
    let response = StatusResponse {
        info: store.get_info()?,
        location: store.dir().display().to_string(),
        stores: FileStore::list_stores(&services.config.storage.store_dir)?,
    };

    match format {
        OutputFormat::Human => {
            output::print_header(&format!("Store '{}'", colors::store(&response.info.name)));
            println!("  location: {}", colors::file_path(&response.location));
            println!(
                "  files:    {}",
                colors::number(&format_count(response.info.file_count))
            );
            println!(
                "  size:     {}",
                colors::number(&format_bytes(response.info.total_size))
            );
            let updated = response
                .info
                .last_updated
                .map(|t| format_relative_time(&t))
                .unwrap_or_else(|| "never".to_string());
            println!("  updated:  {}", colors::dim(&updated));
            if response.stores.len() > 1 {
                println!("  other stores: {}", response.stores.join(", "));
            }
        }
        OutputFormat::Json => output::print_json(&response)?,
    }

    Ok(())
}
