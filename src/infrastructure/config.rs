//! Configuration file loading.
//!
//! The config file is optional and only ever read; the tool never writes it.

use std::fs;
use std::path::Path;

use crate::domain::{AppConfig, AppError, Result};

/// Load configuration from an explicit path or the default location.
///
/// An explicit path must exist. The default location is optional and
/// falls back to `AppConfig::default()` when absent.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from_file(path);
    }

    let config_path = AppConfig::default_config_path();
    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        tracing::debug!("No config file at {}, using defaults", config_path.display());
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}
