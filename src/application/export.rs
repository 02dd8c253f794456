//! Writing rendered conversations to disk.
//!
//! A single session goes to the path the user asked for; several sessions
//! go to generated file names inside an output directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::domain::{AppError, ConversationRecord, Result};

use super::formatter::{render, OutputFormat, Rendered};

/// A file produced by an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub bytes: u64,
    /// Formatter diagnostic when an error document was written instead.
    pub diagnostic: Option<String>,
}

/// Result of exporting one session in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    /// 1-based position in the batch.
    pub index: usize,
    pub session_id: String,
    pub result: Result<ExportedFile>,
}

/// Project label safe for file names.
fn file_project(record: &ConversationRecord) -> String {
    record.project.name.replace(' ', "_")
}

/// Output path for a single exported session.
///
/// An existing directory gets a generated file name inside it; a path
/// without extension gets the session id and extension appended; any other
/// path is used as given.
#[must_use]
pub fn single_output_path(
    record: &ConversationRecord,
    base: &Path,
    format: OutputFormat,
) -> PathBuf {
    let id = record.short_id();
    if base.is_dir() {
        base.join(format!(
            "cursor-chat-{}-{}.{}",
            file_project(record),
            id,
            format.extension()
        ))
    } else if base.extension().is_none() {
        PathBuf::from(format!("{}-{}.{}", base.display(), id, format.extension()))
    } else {
        base.to_path_buf()
    }
}

/// File name for the `index`-th (1-based) session of a batch.
///
/// The suffix is the creation (or last update) time, or the zero-padded
/// index when the session has neither.
#[must_use]
pub fn batch_file_name(record: &ConversationRecord, index: usize, format: OutputFormat) -> String {
    let id = if record.conversation_id.is_empty() {
        format!("chat{index:03}")
    } else {
        record.short_id().to_string()
    };

    let suffix = record
        .session
        .created_at
        .or(record.session.last_updated_at)
        .map_or_else(
            || format!("-{index:03}"),
            |ms| {
                DateTime::from_timestamp_millis(ms).map_or_else(
                    || format!("-{ms}"),
                    |dt| dt.with_timezone(&Local).format("-%Y%m%d-%H%M%S").to_string(),
                )
            },
        );

    format!(
        "cursor-chat-{}-{}{}.{}",
        file_project(record),
        id,
        suffix,
        format.extension()
    )
}

/// Renders one session and writes it to `path`.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn write_session(
    record: &ConversationRecord,
    format: OutputFormat,
    path: &Path,
) -> Result<ExportedFile> {
    let (document, diagnostic) = match render(record, format) {
        Rendered::Document(document) => (document, None),
        Rendered::Fallback {
            document,
            diagnostic,
        } => (document, Some(diagnostic)),
    };

    fs::write(path, &document)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!("Wrote {} ({} bytes)", path.display(), document.len());
    Ok(ExportedFile {
        path: path.to_path_buf(),
        bytes: document.len() as u64,
        diagnostic,
    })
}

/// Exports one session to the location derived from `base`.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn export_single(
    record: &ConversationRecord,
    format: OutputFormat,
    base: &Path,
) -> Result<ExportedFile> {
    write_session(record, format, &single_output_path(record, base, format))
}

/// Exports every session into `dir`, creating it if needed.
///
/// A failed write is reported in its entry and does not stop the batch.
///
/// # Errors
/// Returns error only if the output directory cannot be created.
pub fn export_batch(
    records: &[ConversationRecord],
    format: OutputFormat,
    dir: &Path,
) -> Result<Vec<BatchEntry>> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory {}", dir.display()), e))?;

    Ok(records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let index = i + 1;
            let path = dir.join(batch_file_name(record, index, format));
            BatchEntry {
                index,
                session_id: record.conversation_id.clone(),
                result: write_session(record, format, &path),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, ProjectInfo, Role};
    use tempfile::tempdir;

    fn record(id: &str, created_at: Option<i64>) -> ConversationRecord {
        let mut rec = ConversationRecord::new(id);
        rec.project = ProjectInfo::new("my shop", "/Users/alice/my shop");
        rec.session.created_at = created_at;
        rec.messages = vec![Message::new(Role::User, "hello")];
        rec
    }

    #[test]
    fn test_single_output_into_directory() {
        let dir = tempdir().unwrap();
        let rec = record("abcdef0123456789", None);
        let path = single_output_path(&rec, dir.path(), OutputFormat::Html);
        assert_eq!(path, dir.path().join("cursor-chat-my_shop-abcdef01.html"));
    }

    #[test]
    fn test_single_output_without_extension() {
        let dir = tempdir().unwrap();
        let rec = record("abcdef0123456789", None);
        let base = dir.path().join("chat");
        let path = single_output_path(&rec, &base, OutputFormat::Markdown);
        assert_eq!(path, dir.path().join("chat-abcdef01.md"));

        let explicit = dir.path().join("out.txt");
        assert_eq!(single_output_path(&rec, &explicit, OutputFormat::Json), explicit);
    }

    #[test]
    fn test_batch_file_name_suffixes() {
        let undated = record("abcdef0123456789", None);
        assert_eq!(
            batch_file_name(&undated, 7, OutputFormat::Json),
            "cursor-chat-my_shop-abcdef01-007.json"
        );

        let dated = record("abcdef0123456789", Some(1_700_000_000_000));
        let expected = DateTime::from_timestamp_millis(1_700_000_000_000)
            .unwrap()
            .with_timezone(&Local)
            .format("-%Y%m%d-%H%M%S")
            .to_string();
        assert_eq!(
            batch_file_name(&dated, 1, OutputFormat::Markdown),
            format!("cursor-chat-my_shop-abcdef01{expected}.md")
        );

        let mut updated_only = record("abcdef0123456789", None);
        updated_only.session.last_updated_at = Some(1_700_000_000_000);
        assert_eq!(
            batch_file_name(&updated_only, 1, OutputFormat::Markdown),
            batch_file_name(&dated, 1, OutputFormat::Markdown)
        );

        let anonymous = record("", None);
        assert_eq!(
            batch_file_name(&anonymous, 2, OutputFormat::Html),
            "cursor-chat-my_shop-chat002-002.html"
        );
    }

    #[test]
    fn test_export_single_writes_file() {
        let dir = tempdir().unwrap();
        let rec = record("abcdef0123456789", Some(1_700_000_000_000));
        let file = export_single(&rec, OutputFormat::Json, dir.path()).unwrap();

        let written = fs::read_to_string(&file.path).unwrap();
        assert_eq!(file.bytes, written.len() as u64);
        assert!(file.diagnostic.is_none());
        assert!(written.contains("\"session_id\": \"abcdef0123456789\""));
    }

    #[test]
    fn test_export_batch_creates_directory() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested/exports");
        let records = vec![record("aaaa0000", None), record("bbbb1111", None)];

        let entries = export_batch(&records, OutputFormat::Markdown, &out).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.result.is_ok()));
        assert!(out.join("cursor-chat-my_shop-aaaa0000-001.md").is_file());
        assert!(out.join("cursor-chat-my_shop-bbbb1111-002.md").is_file());
    }

    #[test]
    fn test_export_batch_continues_after_failure() {
        let dir = tempdir().unwrap();
        let mut blocked = record("aaaa0000", None);
        blocked.project.name = "missing/sub".into();
        let records = vec![blocked, record("bbbb1111", None)];

        let entries = export_batch(&records, OutputFormat::Json, dir.path()).unwrap();
        assert!(entries[0].result.is_err());
        assert!(entries[1].result.is_ok());
        assert_eq!(entries[1].index, 2);
    }
}
