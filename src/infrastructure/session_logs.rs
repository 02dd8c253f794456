//! Claude Code session log discovery and reading.
//!
//! Logs live under `<logs_dir>/<project path with '/' replaced by '-'>/*.jsonl`,
//! one JSON object per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::{AppError, Result};

/// A log file with its filesystem metadata.
#[derive(Debug, Clone)]
pub struct LogFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// One decoded log line.
pub type LogEntry = Map<String, Value>;

/// Default base directory for per-project logs (`~/.claude/projects`).
#[must_use]
pub fn default_logs_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("projects")
}

/// Encodes a project path into its log directory name.
#[must_use]
pub fn encode_project_dir(project: &Path) -> String {
    project.to_string_lossy().replace('/', "-")
}

/// Log directory for a project under `base`.
#[must_use]
pub fn project_log_dir(base: &Path, project: &Path) -> PathBuf {
    base.join(encode_project_dir(project))
}

/// Lists `*.jsonl` files in `dir`, newest first.
///
/// A missing directory yields an empty list.
///
/// # Errors
/// Returns error if the directory exists but cannot be read.
pub fn list_log_files(dir: &Path) -> Result<Vec<LogFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::io(format!("Failed to read {}", dir.display()), e))?;

    let mut files = Vec::new();
    for entry in entries.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "jsonl") {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Failed to stat {}: {}", path.display(), e);
                continue;
            }
        };
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();

        files.push(LogFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size: meta.len(),
            modified,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

/// Reads a JSONL log file.
///
/// Blank lines are ignored. Lines that are not JSON objects are logged
/// with their line number and skipped.
///
/// # Errors
/// Returns error if the file cannot be opened.
pub fn read_log_file(path: &Path) -> Result<Vec<LogEntry>> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open {}", path.display()), e))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read line {} in {}: {}", line_num + 1, path.display(), e);
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(entry)) => entries.push(entry),
            Ok(_) => {
                tracing::warn!("Line {} in {} is not a JSON object", line_num + 1, path.display());
            }
            Err(e) => {
                tracing::warn!(
                    "Invalid JSON on line {} in {}: {}",
                    line_num + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(entries)
}
