//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<CrankboxConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {:?}", path))?;
    let config: CrankboxConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config: {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path` if the file exists, defaults otherwise
pub fn load_or_default(path: &Path) -> Result<CrankboxConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(?path, "no config file, using defaults");
        Ok(CrankboxConfig::default())
    }
}

/// Example configuration written by `crankbox init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../crankbox.example.yaml");
