//! Config command implementation

use std::path::Path;

use anyhow::{Context, Result};
use zytra_core::Config;

/// Resolve the configuration for this run
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

pub fn cmd_config(config: &Config) -> Result<()> {
    match zytra_core::config::default_config_path() {
        Some(path) if path.exists() => println!("# Override: {}", path.display()),
        Some(path) => println!("# No override at {} (using defaults)", path.display()),
        None => println!("# Using defaults"),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
