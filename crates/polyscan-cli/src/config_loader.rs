//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use polyscan_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "polyscan.toml";

/// Defaults, then the config file, then `POLYSCAN_*` variables, then CLI flags
pub fn load_config(path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        }
    };
    if let Some(file) = file {
        config = config
            .load_from_file(&file)
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;
        tracing::debug!("Loaded configuration from {}", file.display());
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    Ok(config)
}
