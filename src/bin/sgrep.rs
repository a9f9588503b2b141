//! sgrep CLI - index repositories for code search
//!
//! # Examples
//!
//! ```bash
//! # Index the current directory into the default store
//! sgrep index
//!
//! # Index into a named store, re-indexing everything
//! sgrep index /path/to/repo --store myproject --force
//!
//! # Preview what would be indexed
//! sgrep index --dry-run --verbose
//!
//! # Inspect a store
//! sgrep status --store myproject
//! ```

use clap::Parser;
use sgrep::cli::output::print_error;
use sgrep::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so stdout stays clean for JSON output
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "sgrep=debug" } else { "sgrep=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let json = std::env::var("SGREP_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.is_verbose());

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
