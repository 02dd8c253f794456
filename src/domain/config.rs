//! Configuration models.
//!
//! Every section is optional in the TOML file; missing keys fall back to
//! the defaults below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directory names that hold projects rather than being projects.
pub const CONTAINER_DIRS: &[&str] = &[
    "Documents",
    "Projects",
    "Code",
    "workspace",
    "repos",
    "git",
    "src",
    "codebase",
];

/// Project names recognized anywhere below the home directory.
pub const DEFAULT_KNOWN_PROJECTS: &[&str] = &[
    "genaisf",
    "cursor-view",
    "cursor",
    "cursor-apps",
    "universal-github",
    "inquiry",
];

/// Path overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Cursor data root; skips platform detection when set.
    #[serde(default)]
    pub cursor_root: Option<PathBuf>,

    /// Directory holding per-project session log folders.
    #[serde(default)]
    pub session_logs_dir: Option<PathBuf>,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default export format name.
    #[serde(default = "default_format")]
    pub format: String,

    /// Default output directory (current directory when unset).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            output_dir: None,
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Project name inference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Extra names added to the built-in known-project list.
    #[serde(default)]
    pub known: Vec<String>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub projects: ProjectConfig,
}

impl AppConfig {
    /// Get the default config directory path.
    #[must_use]
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chat-exporter")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Built-in known projects followed by configured extras.
    #[must_use]
    pub fn known_projects(&self) -> Vec<String> {
        DEFAULT_KNOWN_PROJECTS
            .iter()
            .map(|s| (*s).to_string())
            .chain(self.projects.known.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.format, "markdown");
        assert!(config.paths.cursor_root.is_none());
        assert_eq!(config.known_projects().len(), DEFAULT_KNOWN_PROJECTS.len());
    }

    #[test]
    fn test_known_projects_extends_defaults() {
        let mut config = AppConfig::default();
        config.projects.known.push("monorepo".into());

        let known = config.known_projects();
        assert_eq!(known.first().map(String::as_str), Some("genaisf"));
        assert_eq!(known.last().map(String::as_str), Some("monorepo"));
    }
}
