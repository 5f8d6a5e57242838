//! Platform directories
//!
//! Uses XDG directories via `dirs` crate.
//!
//! - Linux: `~/.cache/galley/`
//! - macOS: `~/Library/Caches/galley/`
//! - Windows: `%LOCALAPPDATA%\galley\`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "galley";

/// Get the application cache directory, creating it if needed
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    Ok(dir)
}

/// Get the directory that holds log files
pub fn log_dir() -> Result<PathBuf> {
    let dir = cache_dir()?.join("logs");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    Ok(dir)
}
