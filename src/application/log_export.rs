//! Export of Claude Code session logs.
//!
//! Entries from the most recent log files are concatenated, tagged with
//! the file they came from, and written as JSON, JSONL or Markdown.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::domain::{AppError, Result};
use crate::infrastructure::{list_log_files, read_log_file, LogEntry, LogFile};

use super::formatter::FormatError;

/// Key added to every exported entry naming its log file.
pub const SOURCE_FILE_KEY: &str = "_source_file";

/// Session log export formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty-printed array.
    #[default]
    Json,
    /// One compact object per line.
    Jsonl,
    /// Readable transcript.
    Markdown,
}

impl LogFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Markdown => "markdown",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use: json, jsonl, markdown")),
        }
    }
}

/// Default output file name, stamped with the given time.
#[must_use]
pub fn default_output_name(format: LogFormat, now: DateTime<Local>) -> String {
    format!(
        "claude_history_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Reads the first `limit` files (all when `None` or zero) and tags each
/// entry with its source file.
///
/// Files that cannot be opened are logged and skipped.
#[must_use]
pub fn collect_entries(files: &[LogFile], limit: Option<usize>) -> Vec<LogEntry> {
    let count = limit
        .filter(|&n| n > 0)
        .map_or(files.len(), |n| n.min(files.len()));

    let mut all = Vec::new();
    for file in &files[..count] {
        match read_log_file(&file.path) {
            Ok(entries) => {
                let source = file.path.display().to_string();
                all.extend(entries.into_iter().map(|mut entry| {
                    entry.insert(SOURCE_FILE_KEY.to_string(), Value::String(source.clone()));
                    entry
                }));
            }
            Err(e) => tracing::warn!("Error reading file {}: {}", file.path.display(), e),
        }
    }
    all
}

/// Formats entries in the requested format.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_entries(
    entries: &[LogEntry],
    format: LogFormat,
) -> std::result::Result<String, FormatError> {
    match format {
        LogFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        LogFormat::Jsonl => {
            let mut out = String::new();
            for entry in entries {
                out.push_str(&serde_json::to_string(entry)?);
                out.push('\n');
            }
            Ok(out)
        }
        LogFormat::Markdown => format_markdown(entries),
    }
}

fn format_markdown(entries: &[LogEntry]) -> std::result::Result<String, FormatError> {
    let mut out = String::from("# Claude Code History\n\n");
    let mut current_session: Option<&Value> = None;

    for entry in entries {
        let session = entry.get("sessionId");
        if session != current_session {
            current_session = session;
            write!(out, "## Session: {}\n\n", session.map_or_else(|| "None".to_string(), display))?;
        }

        let timestamp = entry.get("timestamp").map_or_else(|| "N/A".to_string(), display);
        match entry.get("type").and_then(Value::as_str) {
            Some(kind @ ("user" | "assistant")) => {
                let label = if kind == "user" { "User" } else { "Assistant" };
                let content = entry
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .map_or_else(|| "No content".to_string(), display);
                write!(out, "### {label} ({timestamp})\n\n{content}\n\n")?;
            }
            Some("tool") => {
                let tool = entry.get("tool").map_or_else(|| "Unknown".to_string(), display);
                write!(out, "### Tool Call: {tool} ({timestamp})\n\n")?;
                if let Some(input) = entry.get("input").filter(|v| !is_empty_value(v)) {
                    write!(
                        out,
                        "**Input:**\n```json\n{}\n```\n\n",
                        serde_json::to_string_pretty(input)?
                    )?;
                }
            }
            Some("tool_result") => {
                write!(out, "### Tool Result ({timestamp})\n\n")?;
                match entry.get("result") {
                    Some(Value::Object(result)) => match result.get("output") {
                        Some(output) => write!(out, "```\n{}\n```\n\n", display(output))?,
                        None => write!(
                            out,
                            "```json\n{}\n```\n\n",
                            serde_json::to_string_pretty(result)?
                        )?,
                    },
                    None => write!(out, "```json\n{{}}\n```\n\n")?,
                    Some(other) => write!(out, "```\n{}\n```\n\n", display(other))?,
                }
            }
            _ => {}
        }

        out.push_str("---\n\n");
    }

    Ok(out)
}

/// Strings verbatim, anything else as compact JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Exports the session logs in `dir` to `output`.
///
/// Returns the number of entries written.
///
/// # Errors
/// Returns `NoRecords` when there are no logs or no valid entries, or an
/// I/O error if the output cannot be written.
pub fn export_logs(
    dir: &Path,
    output: &Path,
    format: LogFormat,
    limit: Option<usize>,
) -> Result<usize> {
    if !dir.is_dir() {
        return Err(AppError::no_records(
            "No Claude Code history found for this project.",
            Some(&format!("Expected location: {}", dir.display())),
        ));
    }

    let files = list_log_files(dir)?;
    if files.is_empty() {
        return Err(AppError::no_records("No history files found.", None));
    }

    let entries = collect_entries(&files, limit);
    if entries.is_empty() {
        return Err(AppError::no_records("No valid history entries found.", None));
    }

    let document = format_entries(&entries, format).map_err(|e| AppError::InvalidData {
        message: format!("Failed to format history: {e}"),
    })?;
    fs::write(output, document)
        .map_err(|e| AppError::io(format!("Failed to write {}", output.display()), e))?;

    tracing::info!("Exported {} entries to {}", entries.len(), output.display());
    Ok(entries.len())
}

/// Summary lines for the available log files.
#[must_use]
pub fn format_log_summary(files: &[LogFile]) -> String {
    if files.is_empty() {
        return "No history files found.".to_string();
    }

    let mut out = format!("Found {} history files:\n", files.len());
    for file in files {
        out.push_str(&format!(
            "  {} - {} bytes - {}\n",
            file.name,
            file.size,
            file.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}
