//! Domain models for exported chat sessions.
//!
//! These models represent conversations reassembled from Cursor's `SQLite`
//! stores. Timestamps are kept as epoch milliseconds, the unit Cursor
//! writes, and converted only at display time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a project or workspace cannot be resolved.
pub const UNKNOWN: &str = "(unknown)";

/// Workspace id for conversations found only in global storage.
pub const GLOBAL_WORKSPACE: &str = "(global)";

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user (human).
    User,
    /// Message from the AI assistant.
    Assistant,
}

impl Role {
    /// Maps a textual role label; only `"user"` is the user.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label == "user" {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Body of a message.
///
/// Almost always text. Older composer stores occasionally hold structured
/// values in the content slot; those are carried through untouched so the
/// structured export stays faithful, and rendered as a placeholder elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Other(serde_json::Value),
}

impl MessageContent {
    /// Text body, if this is a non-empty string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One message as yielded by a record reader, before assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRecord {
    /// Conversation (composer / tab) the message belongs to.
    pub conversation_id: String,
    pub role: Role,
    pub content: MessageContent,
    /// Database file the message was read from.
    pub source_path: String,
}

impl ChatRecord {
    #[must_use]
    pub fn new(
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<MessageContent>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            source_path: source_path.into(),
        }
    }

    /// Converts into the stored message form.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message::new(self.role, self.content)
    }
}

/// Project a conversation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Short human-readable label.
    pub name: String,
    /// Project root directory.
    #[serde(alias = "rootPath")]
    pub root_path: String,
}

impl ProjectInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, root_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.into(),
        }
    }
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

/// Session-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub title: String,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Last update time, epoch milliseconds.
    #[serde(default)]
    pub last_updated_at: Option<i64>,
}

impl SessionMetadata {
    /// Metadata synthesized for a conversation seen without any composer entry.
    #[must_use]
    pub fn placeholder(conversation_id: &str) -> Self {
        Self {
            title: format!("Chat {}", short_id(conversation_id)),
            created_at: None,
            last_updated_at: None,
        }
    }
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            title: "(untitled)".to_string(),
            created_at: None,
            last_updated_at: None,
        }
    }
}

/// One exported conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    /// Messages in the order they were encountered.
    pub messages: Vec<Message>,
    pub project: ProjectInfo,
    pub session: SessionMetadata,
    /// Workspace storage directory name, or `(global)`.
    pub workspace_id: String,
    /// Database the first message was read from.
    pub source_path: Option<String>,
}

impl ConversationRecord {
    /// Creates an empty record with placeholder project and metadata.
    #[must_use]
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            project: ProjectInfo::default(),
            session: SessionMetadata::default(),
            workspace_id: UNKNOWN.to_string(),
            source_path: None,
        }
    }

    /// First eight characters of the conversation id.
    #[must_use]
    pub fn short_id(&self) -> &str {
        short_id(&self.conversation_id)
    }

    /// First message text, or a placeholder.
    #[must_use]
    pub fn preview(&self) -> &str {
        self.messages
            .first()
            .and_then(|m| m.content.as_text())
            .unwrap_or("No messages")
    }

    /// Sort key: last update time, missing counts as 0.
    #[must_use]
    pub fn recency(&self) -> i64 {
        self.session.last_updated_at.unwrap_or(0)
    }

    /// Creation time as a UTC datetime.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.session
            .created_at
            .and_then(DateTime::from_timestamp_millis)
    }

    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    #[must_use]
    pub fn assistant_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}

/// Summary statistics for one extraction pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    /// Workspace databases scanned.
    pub workspaces_scanned: usize,
    /// Whether a global storage database was found.
    pub global_store_found: bool,
    /// Messages read from workspace `ItemTable`s.
    pub item_table_messages: usize,
    /// Messages read from global `bubbleId:` entries.
    pub bubble_messages: usize,
    /// Messages read from global `composerData:` entries.
    pub composer_messages: usize,
    /// Messages dropped as duplicates of an earlier source.
    pub duplicate_messages: usize,
    /// Conversations emitted.
    pub conversation_count: usize,
}

impl ExtractionStats {
    /// Messages read across all sources.
    #[must_use]
    pub const fn total_messages(&self) -> usize {
        self.item_table_messages + self.bubble_messages + self.composer_messages
    }
}

/// First eight characters of an id, on a char boundary.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}
