//! Clean command - list or delete stores

use crate::cli::output::{self, colors, format_bytes, format_count};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::sink::{FileStore, IndexSink};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Arc;

/// Arguments for the clean command
#[derive(Args, Debug, Default)]
pub struct CleanArgs {
    /// Delete one store
    #[arg(long, short = 's', conflicts_with_all = ["all", "list"])]
    pub store: Option<String>,

    /// Delete every store
    #[arg(long, conflicts_with = "list")]
    pub all: bool,

    /// List stores and their sizes (the default)
    #[arg(long)]
    pub list: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'f')]
    pub force: bool,
}

/// One store as listed by `clean --list`
#[derive(Debug, Serialize)]
pub struct StoreSummary {
    pub name: String,
    pub file_count: usize,
    pub total_size: u64,
}

/// Listing response
#[derive(Debug, Serialize)]
pub struct StoreListing {
    pub location: String,
    pub stores: Vec<StoreSummary>,
    pub total_size: u64,
}

/// Execute the clean command
pub async fn execute(
    args: CleanArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let targets = if let Some(name) = args.store {
        vec![name]
    } else if args.all {
        FileStore::list_stores(&services.config.storage.store_dir)?
    } else {
        return list(services, format);
    };

    if targets.is_empty() {
        match format {
            OutputFormat::Human => println!("{}", colors::dim("No stores to delete.")),
            OutputFormat::Json => output::print_json(&serde_json::json!({ "deleted": [] }))?,
        }
        return Ok(());
    }

    if !args.force && !confirm(&targets)? {
        println!("{}", colors::dim("Cancelled."));
        return Ok(());
    }

    for name in &targets {
        services.remove_store(name)?;
        tracing::info!("Deleted store '{}'", name);
    }

    match format {
        OutputFormat::Human => {
            for name in &targets {
                println!("{} store '{}'", colors::success("Deleted"), colors::store(name));
            }
        }
        OutputFormat::Json => output::print_json(&serde_json::json!({ "deleted": targets }))?,
    }

    Ok(())
}

/// Every store with its size; unreadable stores are logged and left out
pub fn list_stores(services: &Services) -> crate::core::error::Result<StoreListing> {
    let store_dir = &services.config.storage.store_dir;
    let mut stores = Vec::new();
    for name in FileStore::list_stores(store_dir)? {
        match FileStore::open_existing(store_dir, &name).and_then(|store| store.get_info()) {
            Ok(info) => stores.push(StoreSummary {
                name,
                file_count: info.file_count,
                total_size: info.total_size,
            }),
            Err(e) => tracing::warn!("Skipping store '{}': {}", name, e),
        }
    }

    Ok(StoreListing {
        location: store_dir.display().to_string(),
        total_size: stores.iter().map(|s| s.total_size).sum(),
        stores,
    })
}

fn list(services: &Services, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let listing = list_stores(services)?;

    match format {
        OutputFormat::Human => {
            output::print_header("Stores");
            if listing.stores.is_empty() {
                println!("  {}", colors::dim("(no stores found)"));
            }
            for store in &listing.stores {
                println!(
                    "  {} {} files, {}",
                    colors::store(&store.name),
                    colors::number(&format_count(store.file_count)),
                    colors::number(&format_bytes(store.total_size))
                );
            }
            if listing.stores.len() > 1 {
                println!("  total: {}", colors::number(&format_bytes(listing.total_size)));
            }
            println!("  location: {}", colors::file_path(&listing.location));
        }
        OutputFormat::Json => output::print_json(&listing)?,
    }

    Ok(())
}

fn confirm(targets: &[String]) -> io::Result<bool> {
    let prompt = match targets {
        [name] => format!("Delete store '{}'?", colors::store(name)),
        _ => format!("Delete all {} stores?", targets.len()),
    };
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
