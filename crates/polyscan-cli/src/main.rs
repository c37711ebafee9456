//! Polyscan CLI - Command-line interface
//!
//! Drives the whole pipeline: boundary extraction, polygon splitting and
//! per-polygon retrieval of records and insights.

mod cli;
mod commands;
mod config_loader;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;

    // Failures were already reported by the output writer
    if runtime.block_on(commands::execute(cli)).is_err() {
        std::process::exit(1);
    }

    Ok(())
}
