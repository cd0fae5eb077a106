use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::BaseDirs;

pub const ENV_CONFIG_DIR: &str = "LIGHTRAYS_CONFIG_DIR";

const APPLICATION_DIR: &str = "lightrays";
const CONFIG_FILE: &str = "rays.toml";

/// Directory holding `rays.toml`: `$LIGHTRAYS_CONFIG_DIR` when set, otherwise
/// `<user config dir>/lightrays`.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(value) = env_override(ENV_CONFIG_DIR) {
        return Ok(value);
    }
    let base = BaseDirs::new().ok_or_else(|| anyhow!("failed to determine user directories"))?;
    Ok(base.config_dir().join(APPLICATION_DIR))
}

/// Default config file, if one exists on disk.
pub fn default_config_file() -> Option<PathBuf> {
    match config_dir() {
        Ok(dir) => existing_config_in(&dir),
        Err(err) => {
            tracing::debug!(error = %err, "no user config directory; using built-in defaults");
            None
        }
    }
}

fn existing_config_in(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
