//! Cursor IDE path discovery.
//!
//! Handles locating Cursor's data root across platforms and the state
//! databases beneath it.

use std::path::{Path, PathBuf};

use crate::domain::{AppError, PathConfig, Result};

/// Subdirectories containing state databases.
const GLOBAL_STORAGE_PATH: &str = "User/globalStorage";
const WORKSPACE_STORAGE_PATH: &str = "User/workspaceStorage";
const STATE_DB_NAME: &str = "state.vscdb";

/// Pre-`state.vscdb` global storage directories, checked in order.
const LEGACY_GLOBAL_DIRS: &[&str] = &["cursor.cursor", "cursor"];

/// Host platforms with a known Cursor data location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// Platform of the running binary.
    ///
    /// # Errors
    /// Returns `UnsupportedPlatform` for any OS without a known layout.
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Parses an operating system identifier.
    ///
    /// # Errors
    /// Returns `UnsupportedPlatform` for unrecognized identifiers.
    pub fn from_os(os: &str) -> Result<Self> {
        match os.to_lowercase().as_str() {
            "macos" | "darwin" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            _ => Err(AppError::UnsupportedPlatform { os: os.to_string() }),
        }
    }

    /// Cursor data root relative to the home directory.
    #[must_use]
    pub fn cursor_root(self, home: &Path) -> PathBuf {
        match self {
            Self::MacOs => home.join("Library").join("Application Support").join("Cursor"),
            Self::Windows => home.join("AppData").join("Roaming").join("Cursor"),
            Self::Linux => home.join(".config").join("Cursor"),
        }
    }
}

/// A workspace-scoped state database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDb {
    /// Workspace storage directory name.
    pub id: String,
    pub path: PathBuf,
}

/// Resolves the Cursor data root, honoring a configured override.
///
/// # Errors
/// Returns error if the platform is unsupported, the home directory is
/// unknown, or the resolved root does not exist.
pub fn find_cursor_root(paths: &PathConfig) -> Result<PathBuf> {
    let root = if let Some(root) = &paths.cursor_root {
        root.clone()
    } else {
        let platform = Platform::current()?;
        let home = dirs::home_dir().ok_or_else(|| AppError::Config {
            message: "Could not determine home directory".into(),
        })?;
        platform.cursor_root(&home)
    };

    if !root.is_dir() {
        return Err(AppError::StorageRootNotFound { path: root });
    }

    tracing::debug!("Using Cursor root: {}", root.display());
    Ok(root)
}

/// Enumerates workspace state databases, one per storage subdirectory.
///
/// Sorted by workspace id so repeated runs visit them in the same order.
#[must_use]
pub fn workspace_databases(root: &Path) -> Vec<WorkspaceDb> {
    let workspace_dir = root.join(WORKSPACE_STORAGE_PATH);
    let entries = match std::fs::read_dir(&workspace_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("No workspace storage at {}: {}", workspace_dir.display(), e);
            return Vec::new();
        }
    };

    let mut databases: Vec<WorkspaceDb> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let path = entry.path().join(STATE_DB_NAME);
            path.is_file().then(|| WorkspaceDb {
                id: entry.file_name().to_string_lossy().into_owned(),
                path,
            })
        })
        .collect();

    databases.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::debug!("Found {} workspace state DBs", databases.len());
    databases
}

/// Locates the global state database.
///
/// Checks `User/globalStorage/state.vscdb` first, then the first `*.sqlite`
/// file in each legacy directory.
#[must_use]
pub fn global_storage_path(root: &Path) -> Option<PathBuf> {
    let global_dir = root.join(GLOBAL_STORAGE_PATH);
    let global_db = global_dir.join(STATE_DB_NAME);
    if global_db.is_file() {
        tracing::debug!("Found global state DB: {}", global_db.display());
        return Some(global_db);
    }

    LEGACY_GLOBAL_DIRS
        .iter()
        .find_map(|dir| first_sqlite_file(&global_dir.join(dir)))
}

fn first_sqlite_file(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "sqlite"))
        .collect();
    files.sort();
    files.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("Darwin").unwrap(), Platform::MacOs);
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::MacOs);
        assert_eq!(Platform::from_os("windows").unwrap(), Platform::Windows);
        assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
        assert!(matches!(
            Platform::from_os("freebsd"),
            Err(AppError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_cursor_root_per_platform() {
        let home = Path::new("/home/alice");
        assert_eq!(
            Platform::Linux.cursor_root(home),
            PathBuf::from("/home/alice/.config/Cursor")
        );
        assert_eq!(
            Platform::MacOs.cursor_root(home),
            PathBuf::from("/home/alice/Library/Application Support/Cursor")
        );
        assert_eq!(
            Platform::Windows.cursor_root(home),
            PathBuf::from("/home/alice/AppData/Roaming/Cursor")
        );
    }

    #[test]
    fn test_find_cursor_root_missing_override() {
        let dir = tempdir().unwrap();
        let paths = PathConfig {
            cursor_root: Some(dir.path().join("nope")),
            session_logs_dir: None,
        };
        assert!(matches!(
            find_cursor_root(&paths),
            Err(AppError::StorageRootNotFound { .. })
        ));
    }

    #[test]
    fn test_workspace_databases_sorted() {
        let dir = tempdir().unwrap();
        for id in ["zzz", "aaa", "empty"] {
            let ws = dir.path().join(WORKSPACE_STORAGE_PATH).join(id);
            fs::create_dir_all(&ws).unwrap();
            if id != "empty" {
                fs::write(ws.join(STATE_DB_NAME), b"").unwrap();
            }
        }

        let dbs = workspace_databases(dir.path());
        let ids: Vec<_> = dbs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "zzz"]);
    }

    #[test]
    fn test_global_storage_primary_and_legacy() {
        let dir = tempdir().unwrap();
        assert!(global_storage_path(dir.path()).is_none());

        let legacy = dir.path().join(GLOBAL_STORAGE_PATH).join("cursor");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join("b.sqlite"), b"").unwrap();
        fs::write(legacy.join("a.sqlite"), b"").unwrap();
        assert_eq!(global_storage_path(dir.path()), Some(legacy.join("a.sqlite")));

        let primary = dir.path().join(GLOBAL_STORAGE_PATH).join(STATE_DB_NAME);
        fs::write(&primary, b"").unwrap();
        assert_eq!(global_storage_path(dir.path()), Some(primary));
    }
}
