//! Output formatting for exported conversations.
//!
//! Supports three document formats (JSON, Markdown, HTML) plus the
//! terminal listing, table and statistics views.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ConversationRecord, ExtractionStats, Message, ProjectInfo, Role};

/// Body shown for messages without usable text.
pub const CONTENT_UNAVAILABLE: &str = "Content unavailable";

/// Sessions shown per project in the grouped listing.
const SESSIONS_PER_PROJECT: usize = 5;

/// Preview length in the verbose listing.
const PREVIEW_CHARS: usize = 60;

/// Prefixes that mark a Markdown line as code.
const CODE_PREFIXES: &[&str] = &[
    "import ", "from ", "def ", "class ", "if ", "for ", "while ", "const ", "let ", "var ",
    "function ", "{", "}", "//", "#",
];

/// Keywords that, next to an `=`, mark a line as code.
const ASSIGNMENT_KEYWORDS: &[&str] = &["function", "const", "let", "var", "=>"];

/// Line endings that mark a line as code.
const CODE_SUFFIXES: &[&str] = &[";", "{", "}", ":", "))"];

/// Export document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Structured JSON document.
    Json,
    /// Human-readable Markdown.
    #[default]
    Markdown,
    /// Self-contained styled HTML page.
    Html,
}

impl OutputFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Html => "html",
        }
    }

    /// Minimal valid document in this format describing a failure.
    #[must_use]
    pub fn error_document(self, error: &str) -> String {
        match self {
            Self::Json => {
                let doc = serde_json::json!({
                    "project": { "name": "Error", "root_path": "/" },
                    "messages": [],
                    "date": Utc::now().timestamp(),
                    "session_id": "error",
                    "workspace_id": "error",
                    "source_path": null,
                    "error": error,
                });
                format!("{doc:#}")
            }
            Self::Markdown => format!(
                "# Error Generating Chat Export\n\n**Error**: {error}\n\nPlease try again or contact support if the problem persists.\n\n---\n\n"
            ),
            Self::Html => format!(
                "<html><body><h1>Error generating chat export</h1><p>Error: {}</p></body></html>",
                escape_html(error)
            ),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            _ => Err(format!("Unknown format: {s}. Use: json, markdown, md, html")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Errors raised while producing a document.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document write failed: {0}")]
    Write(#[from] std::fmt::Error),
}

/// Outcome of rendering one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// The formatter succeeded.
    Document(String),
    /// The formatter failed; `document` is a minimal error document in the
    /// requested format.
    Fallback { document: String, diagnostic: String },
}

/// Exported form of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub project: ProjectInfo,
    pub messages: Vec<Message>,
    /// Creation time, epoch seconds.
    pub date: i64,
    pub session_id: String,
    pub workspace_id: String,
    /// Database the conversation was first read from.
    #[serde(default, alias = "db_path")]
    pub source_path: Option<String>,
}

impl ExportDocument {
    /// Builds the export form; a missing creation time becomes "now".
    #[must_use]
    pub fn from_record(record: &ConversationRecord) -> Self {
        let date = record
            .session
            .created_at
            .map_or_else(|| Utc::now().timestamp(), |ms| ms / 1000);

        Self {
            project: record.project.clone(),
            messages: record.messages.clone(),
            date,
            session_id: record.conversation_id.clone(),
            workspace_id: record.workspace_id.clone(),
            source_path: record.source_path.clone(),
        }
    }

    /// Creation time in local time, for display.
    fn date_display(&self, pattern: &str) -> String {
        DateTime::from_timestamp(self.date, 0).map_or_else(
            || "Unknown date".to_string(),
            |dt| dt.with_timezone(&Local).format(pattern).to_string(),
        )
    }
}

/// Renders a conversation, substituting an error document on failure.
#[must_use]
pub fn render(record: &ConversationRecord, format: OutputFormat) -> Rendered {
    let doc = ExportDocument::from_record(record);
    let result = match format {
        OutputFormat::Json => format_json(&doc),
        OutputFormat::Markdown => format_markdown(&doc),
        OutputFormat::Html => format_html(&doc),
    };

    match result {
        Ok(document) => Rendered::Document(document),
        Err(e) => {
            tracing::error!("Error generating {} for session {}: {}", format, doc.session_id, e);
            Rendered::Fallback {
                document: format.error_document(&e.to_string()),
                diagnostic: e.to_string(),
            }
        }
    }
}

/// Formats a document as pretty-printed JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_json(doc: &ExportDocument) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Formats a document as Markdown.
///
/// Message bodies already holding a fenced block are passed through.
/// Otherwise runs of lines that look like code are fenced; the check is a
/// keyword and punctuation sniff, not a parser, and will misfire on some
/// prose.
///
/// # Errors
/// Returns error if writing to the buffer fails.
pub fn format_markdown(doc: &ExportDocument) -> Result<String, FormatError> {
    let mut out = String::new();

    writeln!(out, "# Cursor Chat: {}", doc.project.name)?;
    writeln!(out)?;
    writeln!(out, "## Chat Information")?;
    writeln!(out)?;
    writeln!(out, "- **Project**: {}", doc.project.name)?;
    writeln!(out, "- **Path**: `{}`", doc.project.root_path)?;
    writeln!(out, "- **Date**: {}", doc.date_display("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "- **Session ID**: `{}`", doc.session_id)?;
    writeln!(out)?;
    writeln!(out, "## Conversation History")?;
    writeln!(out)?;

    if doc.messages.is_empty() {
        writeln!(out, "No messages found in this conversation.")?;
    }

    for message in &doc.messages {
        let role = match message.role {
            Role::User => "👤 **You**",
            Role::Assistant => "🤖 **Cursor Assistant**",
        };
        writeln!(out, "### {role}")?;
        writeln!(out)?;

        let content = message.content.as_text().unwrap_or(CONTENT_UNAVAILABLE).trim();
        if content.contains("```") {
            writeln!(out, "{content}")?;
        } else {
            write_fenced_code(&mut out, content)?;
        }

        writeln!(out)?;
        writeln!(out, "---")?;
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "---")?;
    Ok(out)
}

fn write_fenced_code(out: &mut String, content: &str) -> std::fmt::Result {
    let mut in_code = false;
    for line in content.split('\n') {
        let line = line.trim_end();
        if looks_like_code(line) {
            if !in_code {
                writeln!(out, "```")?;
                in_code = true;
            }
        } else if in_code {
            writeln!(out, "```")?;
            in_code = false;
        }
        writeln!(out, "{line}")?;
    }
    if in_code {
        writeln!(out, "```")?;
    }
    Ok(())
}

fn looks_like_code(line: &str) -> bool {
    let trimmed = line.trim();
    CODE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        || (line.contains('=') && ASSIGNMENT_KEYWORDS.iter().any(|k| line.contains(k)))
        || CODE_SUFFIXES.iter().any(|s| trimmed.ends_with(s))
}

/// Formats a document as a standalone HTML page with inline styling.
///
/// # Errors
/// Returns error if writing to the buffer fails.
pub fn format_html(doc: &ExportDocument) -> Result<String, FormatError> {
    let project_name = escape_html(&doc.project.name);
    let project_path = escape_html(&doc.project.root_path);

    let mut messages_html = String::new();
    if doc.messages.is_empty() {
        messages_html.push_str("<p>No messages found in this conversation.</p>");
    }

    for message in &doc.messages {
        let content = message.content.as_text().unwrap_or(CONTENT_UNAVAILABLE);
        let body = html_body(&escape_html(content));

        let (avatar, name, bg_color, border_color, margin_left, margin_right) = match message.role
        {
            Role::User => ("👤", "You", "#f0f7ff", "#3f51b5", "0", "40px"),
            Role::Assistant => ("🤖", "Cursor Assistant", "#f0fff7", "#00796b", "40px", "0"),
        };

        write!(
            messages_html,
            r#"
        <div class="message" style="margin-bottom: 20px;">
            <div class="message-header" style="display: flex; align-items: center; margin-bottom: 8px;">
                <div class="avatar" style="width: 32px; height: 32px; border-radius: 50%; background-color: {border_color}; color: white; display: flex; justify-content: center; align-items: center; margin-right: 10px;">
                    {avatar}
                </div>
                <div class="sender" style="font-weight: bold;">{name}</div>
            </div>
            <div class="message-content" style="padding: 15px; border-radius: 8px; background-color: {bg_color}; border-left: 4px solid {border_color}; margin-left: {margin_left}; margin-right: {margin_right};">
                {body}
            </div>
        </div>
"#
        )?;
    }

    let mut out = String::new();
    write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Cursor Chat - {project_name}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 900px; margin: 20px auto; padding: 20px; border: 1px solid #eee; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }}
        h1, h2, h3 {{ color: #2c3e50; }}
        .header {{ background: linear-gradient(90deg, #f0f7ff 0%, #f0fff7 100%); padding: 15px 20px; border-radius: 8px 8px 0 0; margin: -20px -20px 20px -20px; }}
        .chat-info {{ display: flex; flex-wrap: wrap; gap: 10px 20px; margin-bottom: 20px; background-color: #f9f9f9; padding: 12px 15px; border-radius: 8px; font-size: 0.9em; }}
        .info-item {{ display: flex; align-items: center; }}
        .info-label {{ font-weight: bold; margin-right: 5px; color: #555; }}
        pre {{ background-color: #eef; padding: 15px; border-radius: 5px; overflow-x: auto; border: 1px solid #ddd; font-family: 'Courier New', Courier, monospace; font-size: 0.9em; white-space: pre-wrap; word-wrap: break-word; }}
        code {{ background-color: transparent; padding: 0; font-family: inherit; }}
        .message-content {{ word-wrap: break-word; overflow-wrap: break-word; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>Cursor Chat: {project_name}</h1>
    </div>
    <div class="chat-info">
        <div class="info-item"><span class="info-label">Project:</span> <span>{project_name}</span></div>
        <div class="info-item"><span class="info-label">Path:</span> <span>{project_path}</span></div>
        <div class="info-item"><span class="info-label">Date:</span> <span>{date}</span></div>
        <div class="info-item"><span class="info-label">Session ID:</span> <span>{session_id}</span></div>
    </div>
    <h2>Conversation History</h2>
    <div class="messages">
{messages_html}
    </div>
</body>
</html>"#,
        date = doc.date_display("%Y-%m-%d %H:%M:%S"),
        session_id = escape_html(&doc.session_id),
    )?;

    Ok(out)
}

/// Converts escaped message text to HTML: fences become `<pre><code>`
/// blocks and other newlines become `<br>`.
fn html_body(escaped: &str) -> String {
    let mut out = String::new();
    let mut in_code = false;

    for line in escaped.split('\n') {
        let mut line = line;
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            if in_code {
                out.push_str("</code></pre>\n");
                in_code = false;
                line = "";
            } else {
                out.push_str("<pre><code>");
                in_code = true;
                line = &trimmed[3..];
            }
        }

        out.push_str(line);
        out.push_str(if in_code { "\n" } else { "<br>" });
    }

    if in_code {
        out.push_str("</code></pre>");
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Formats the grouped session listing.
///
/// Sessions are grouped by project in order of first appearance; only the
/// first few per project are shown.
#[must_use]
pub fn format_session_list(conversations: &[ConversationRecord], verbose: bool) -> String {
    let mut groups: Vec<(&str, Vec<&ConversationRecord>)> = Vec::new();
    for conv in conversations {
        match groups.iter_mut().find(|(name, _)| *name == conv.project.name) {
            Some((_, group)) => group.push(conv),
            None => groups.push((conv.project.name.as_str(), vec![conv])),
        }
    }

    let mut out = String::new();
    for (name, group) in groups {
        out.push_str(&format!(
            "📁 {} ({} sessions)\n",
            name.bold(),
            group.len()
        ));

        for conv in group.iter().take(SESSIONS_PER_PROJECT) {
            let date = conv.created_at().map_or_else(
                || "Unknown date".to_string(),
                |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            );
            out.push_str(&format!(
                "  🆔 {} | 📅 {} | 💬 {} messages\n",
                conv.short_id().cyan(),
                date,
                conv.message_count()
            ));
            if verbose {
                out.push_str(&format!("     💭 {}\n", preview(conv.preview(), PREVIEW_CHARS)));
            }
        }

        if group.len() > SESSIONS_PER_PROJECT {
            out.push_str(&format!(
                "     ... and {} more sessions\n",
                group.len() - SESSIONS_PER_PROJECT
            ));
        }
        out.push('\n');
    }

    out
}

/// Formats a table listing of conversations.
#[must_use]
pub fn format_conversations_table(conversations: &[ConversationRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Project", "Updated", "Msgs", "Title"]);

    for conv in conversations {
        let updated = conv
            .session
            .last_updated_at
            .and_then(DateTime::from_timestamp_millis)
            .map_or_else(
                || "-".to_string(),
                |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
            );

        table.add_row(vec![
            conv.short_id().to_string(),
            truncate(&conv.project.name, 20),
            updated,
            conv.message_count().to_string(),
            truncate(&conv.session.title, 35),
        ]);
    }

    table.to_string()
}

/// Formats extraction statistics for display.
#[must_use]
pub fn format_stats(stats: &ExtractionStats, conversations: &[ConversationRecord]) -> String {
    let user: usize = conversations.iter().map(ConversationRecord::user_message_count).sum();
    let assistant: usize = conversations
        .iter()
        .map(ConversationRecord::assistant_message_count)
        .sum();

    format!(
        "{}\n  Conversations: {}\n  User messages: {}\n  Assistant messages: {}\n  Workspaces scanned: {}\n  Global store: {}\n  Messages read: {} (item table {}, bubbles {}, composer data {})\n  Duplicates skipped: {}",
        "📊 Statistics".bold(),
        stats.conversation_count.to_string().cyan(),
        user.to_string().green(),
        assistant.to_string().blue(),
        stats.workspaces_scanned.to_string().yellow(),
        if stats.global_store_found { "found" } else { "not found" },
        stats.total_messages(),
        stats.item_table_messages,
        stats.bubble_messages,
        stats.composer_messages,
        stats.duplicate_messages
    )
}

/// One-line preview, cut at `max_chars` with an ellipsis.
fn preview(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    let cut = if text.chars().count() > max_chars {
        format!("{cut}...")
    } else {
        cut
    };
    cut.replace('\n', " ")
}

/// Truncates the first line of a string to `max_len` characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
