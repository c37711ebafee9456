//! Command implementations

mod config;
mod extract;
mod folders;
mod insights;
mod retrieve;
mod selection;
mod split;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;
use polyscan_core::config::LayeredConfig;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let result = match load_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => dispatch(cli.command, &config, &output).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        output.error(format!("{:#}", e));
    }
    result
}

async fn dispatch(command: Commands, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    match command {
        Commands::Extract(args) => extract::execute(args, output),
        Commands::Split(args) => split::execute(args, config, output),
        Commands::Folders(args) => folders::execute(args, output),
        Commands::Businesses(args) => retrieve::businesses(args, config, output).await,
        Commands::Consumers(args) => retrieve::consumers(args, config, output).await,
        Commands::Insights(args) => insights::execute(args, config, output).await,
        Commands::Config => config::execute(config, output),
    }
}
