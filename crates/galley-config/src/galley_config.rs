//! Application configuration
//!
//! Configuration loaded from `.galley.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from `.galley.toml`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GalleyConfig {
    /// Documentation build executable
    #[serde(default = "default_sphinx_command")]
    pub sphinx_command: String,

    /// Builder name passed with `-b`
    #[serde(default = "default_builder")]
    pub builder: String,

    /// Documentation sources, relative to the project directory
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Build output, relative to the project directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Suffixes of files that count as documentation sources
    #[serde(default = "default_source_suffixes")]
    pub source_suffixes: Vec<String>,

    /// Directory names the file monitor never descends into
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// How often the file monitor scans the source tree
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often the console drains the output queue
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Rebuild changed files as soon as the file monitor reports them
    #[serde(default = "default_rebuild_on_change")]
    pub rebuild_on_change: bool,
}

fn default_sphinx_command() -> String {
    "sphinx-build".to_string()
}

fn default_builder() -> String {
    "html".to_string()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs").join("_build").join("html")
}

fn default_source_suffixes() -> Vec<String> {
    vec![".rst".to_string(), ".txt".to_string()]
}

fn default_ignored_dirs() -> Vec<String> {
    vec![".git".to_string(), ".hg".to_string()]
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_drain_interval_ms() -> u64 {
    100
}

fn default_rebuild_on_change() -> bool {
    true
}

impl Default for GalleyConfig {
    fn default() -> Self {
        Self {
            sphinx_command: default_sphinx_command(),
            builder: default_builder(),
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            source_suffixes: default_source_suffixes(),
            ignored_dirs: default_ignored_dirs(),
            poll_interval_ms: default_poll_interval_ms(),
            drain_interval_ms: default_drain_interval_ms(),
            rebuild_on_change: default_rebuild_on_change(),
        }
    }
}

impl GalleyConfig {
    /// Load config from the project directory first, then home directory, or use defaults
    pub fn load(project_dir: &Path) -> Self {
        if let Some(content) = crate::load_config_file(project_dir) {
            match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded galley config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default galley config");
        Self::default()
    }

    /// Absolute documentation source directory
    pub fn source_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.source_dir)
    }

    /// Absolute build output directory
    pub fn output_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.output_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    /// Whether `path` has one of the configured source suffixes
    pub fn is_source_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        self.source_suffixes
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
    }
}
