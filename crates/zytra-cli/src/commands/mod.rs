//! CLI command implementations
//!
//! - `config` - Config loading and printing
//! - `forecast` - Run both models and report insights
//! - `inspect` - Column classification and preview
//! - `serve` - Web server command

pub mod config;
pub mod forecast;
pub mod inspect;
pub mod serve;

pub use config::*;
pub use forecast::*;
pub use inspect::*;
pub use serve::*;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use zytra_core::Table;

/// Read and parse a CSV file from disk
pub fn read_table(path: &Path) -> Result<Table> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    zytra_core::data::load(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
