use std::{env, path::Path, path::PathBuf};

pub(crate) const CONFIG_FILE: &str = ".galley.toml";

/// Load config file content from the project directory first, then home directory
///
/// Searches for `.galley.toml` in:
/// 1. The project directory
/// 2. The home directory
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file(project_dir: &Path) -> Option<String> {
    let project_config = project_dir.join(CONFIG_FILE);
    if let Ok(content) = std::fs::read_to_string(&project_config) {
        log::debug!("Loaded config from {}", project_config.display());
        return Some(content);
    }

    if let Some(home_config) = get_home_config_path() {
        if let Ok(content) = std::fs::read_to_string(&home_config) {
            log::debug!("Loaded config from {}", home_config.display());
            return Some(content);
        }
    }

    None
}

/// Returns ~/.galley.toml if HOME environment variable is set.
fn get_home_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE))
}
