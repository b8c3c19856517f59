//! Configuration loading utilities.
//!
//! Config files may be YAML, JSON or TOML; the format follows the file
//! extension. Without an explicit path the nearest config file found walking
//! up from the working directory is used, and built-in defaults otherwise.

use crate::constants::{config_format_for_extension, ConfigFormat, CONFIG_FILE_NAMES};
use crate::error::{MdfmtError, Result};
use crate::models::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Search `start_dir` and its ancestors for a config file.
///
/// Returns the first match in the nearest directory, checking
/// `CONFIG_FILE_NAMES` in order within each directory.
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir.ancestors().find_map(|dir| {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Parse config text in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config> {
    let config = match format {
        ConfigFormat::Yaml => {
            // An empty YAML document deserializes to unit, not a map.
            if content.trim().is_empty() {
                Config::default()
            } else {
                serde_yaml::from_str(content)?
            }
        }
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Load and validate a config file. The extension selects the format.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.is_file() {
        return Err(MdfmtError::MissingPath(path.to_path_buf()));
    }

    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(config_format_for_extension)
        .ok_or_else(|| {
            MdfmtError::InvalidConfig(format!(
                "unsupported config file type: {} (expected .yaml, .yml, .json or .toml)",
                path.display()
            ))
        })?;

    let content = fs::read_to_string(path)?;
    let config = parse_config(&content, format)?;
    config.validate()?;
    Ok(config)
}

/// Resolve the effective configuration.
///
/// Priority:
/// 1. `explicit` path, if given (must exist)
/// 2. nearest config file above `working_dir`
/// 3. built-in defaults
pub fn load_config(explicit: Option<&Path>, working_dir: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading configuration");
        return load_config_file(path);
    }

    match find_config_file(working_dir) {
        Some(path) => {
            debug!(path = %path.display(), "found configuration file");
            load_config_file(&path)
        }
        None => {
            debug!("no configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}
