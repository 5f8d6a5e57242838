//! Configuration and file locations for galley
//!
//! This crate provides:
//! - Configuration file loading (TOML)
//! - Application configuration (GalleyConfig)
//! - Platform cache and log directories

pub mod config_file;
pub mod galley_config;
pub mod paths;

pub use config_file::load_config_file;
pub use galley_config::GalleyConfig;
pub use paths::{cache_dir, log_dir};
