//! JSON parsing for Cursor chat data.
//!
//! Cursor's stored documents are loosely typed: fields go missing, change
//! type between versions, or hold `null`. Everything here is lenient and
//! returns nothing rather than failing on an unexpected shape. Only a value
//! that is not JSON at all is reported as an error.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{AppError, MessageContent, Result, Role, SessionMetadata};

/// Key prefixes used in Cursor's KV store.
pub const BUBBLE_PREFIX: &str = "bubbleId:";
pub const COMPOSER_PREFIX: &str = "composerData:";

/// `ItemTable` keys.
pub const CHAT_DATA_KEY: &str = "workbench.panel.aichat.view.aichat.chatdata";
pub const COMPOSER_INDEX_KEY: &str = "composer.composerData";
pub const PROMPTS_KEY: &str = "aiService.prompts";
pub const GENERATIONS_KEY: &str = "aiService.generations";
pub const HISTORY_ENTRIES_KEY: &str = "history.entries";
pub const SELECTED_ROOT_KEY: &str = "debug.selectedroot";

/// Conversation id under which prompt/generation lists are combined.
pub const AI_SERVICE_CONVERSATION_ID: &str = "aiService_combined";

const FILE_URI_PREFIX: &str = "file:///";

/// Raw bubble data as stored under `bubbleId:` keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBubble {
    #[serde(rename = "type", default)]
    bubble_type: Value,
    #[serde(default)]
    text: Value,
    #[serde(default)]
    rich_text: Value,
}

/// Raw composer data as stored under `composerData:` keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComposer {
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    conversation: Value,
}

#[derive(Debug, Deserialize)]
struct RawComposerTurn {
    #[serde(rename = "type", default)]
    turn_type: Value,
    #[serde(default)]
    text: Value,
}

/// A decoded `composerData:` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerEntry {
    /// Creation time, epoch milliseconds.
    pub created_at: Option<i64>,
    /// Turns with non-empty text, in stored order.
    pub messages: Vec<(Role, String)>,
}

/// Parses a `bubbleId:` value into a role and trimmed text.
///
/// Returns `Ok(None)` for bubbles without usable text.
///
/// # Errors
/// Returns error if the value is not JSON or its text is not a string.
pub fn parse_bubble(data: &[u8]) -> Result<Option<(Role, String)>> {
    let raw: RawBubble = serde_json::from_slice(data).map_err(AppError::json_parse)?;

    let text = match [&raw.text, &raw.rich_text].into_iter().find(|v| truthy(v)) {
        None => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(other) => {
            return Err(AppError::InvalidData {
                message: format!("bubble text is not a string: {other}"),
            })
        }
    };

    if text.is_empty() {
        return Ok(None);
    }

    let role = if is_one(&raw.bubble_type) {
        Role::User
    } else {
        Role::Assistant
    };
    Ok(Some((role, text.to_string())))
}

/// Parses a `composerData:` value.
///
/// # Errors
/// Returns error if JSON parsing fails.
pub fn parse_composer(data: &[u8]) -> Result<ComposerEntry> {
    let raw: RawComposer = serde_json::from_slice(data).map_err(AppError::json_parse)?;

    let turns: Vec<RawComposerTurn> = match raw.conversation {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };

    let messages = turns
        .into_iter()
        .filter(|turn| !turn.turn_type.is_null())
        .filter_map(|turn| {
            let role = if is_one(&turn.turn_type) {
                Role::User
            } else {
                Role::Assistant
            };
            match turn.text {
                Value::String(text) if !text.is_empty() => Some((role, text)),
                _ => None,
            }
        })
        .collect();

    Ok(ComposerEntry {
        created_at: millis(&raw.created_at),
        messages,
    })
}

/// Messages from the tabbed chat document (`aichat.chatdata`).
///
/// Each tab is one conversation keyed by its `tabId`.
#[must_use]
pub fn tab_messages(chat_data: &Value) -> Vec<(String, Role, MessageContent)> {
    let mut out = Vec::new();
    for tab in array(chat_data.get("tabs")) {
        let tab_id = tab
            .get("tabId")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        for bubble in array(tab.get("bubbles")) {
            let bubble_type = bubble.get("type").unwrap_or(&Value::Null);
            if !truthy(bubble_type) {
                continue;
            }

            // `text` wins when present, even if empty.
            let text = bubble.get("text").or_else(|| bubble.get("content"));
            if let Some(Value::String(text)) = text {
                if !text.is_empty() {
                    let role = if bubble_type.as_str() == Some("user") {
                        Role::User
                    } else {
                        Role::Assistant
                    };
                    out.push((tab_id.to_string(), role, MessageContent::Text(text.clone())));
                }
            }
        }
    }
    out
}

/// Messages from the composer index (`composer.composerData`).
///
/// Message content is passed through as stored, including non-string
/// values, as long as it is not empty.
#[must_use]
pub fn composer_index_messages(composer_index: &Value) -> Vec<(String, Role, MessageContent)> {
    let mut out = Vec::new();
    for composer in array(composer_index.get("allComposers")) {
        let composer_id = composer
            .get("composerId")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        for msg in array(composer.get("messages")) {
            let role =
                Role::from_label(msg.get("role").and_then(Value::as_str).unwrap_or("unknown"));
            let content = msg.get("content").unwrap_or(&Value::Null);
            if !truthy(content) {
                continue;
            }
            let content = match content {
                Value::String(s) => MessageContent::Text(s.clone()),
                other => MessageContent::Other(other.clone()),
            };
            out.push((composer_id.to_string(), role, content));
        }
    }
    out
}

/// Combines `aiService.prompts` and `aiService.generations` into one
/// message list: all prompts first, then all generations.
#[must_use]
pub fn prompt_generation_messages(
    prompts: Option<&Value>,
    generations: Option<&Value>,
) -> Vec<(Role, String)> {
    let user = array(prompts)
        .iter()
        .filter_map(|item| trimmed_str(item.get("text")))
        .map(|text| (Role::User, text));
    let assistant = array(generations)
        .iter()
        .filter_map(|item| trimmed_str(item.get("textDescription")))
        .map(|text| (Role::Assistant, text));
    user.chain(assistant).collect()
}

/// Session metadata from the composer index, keyed by composer id.
///
/// Composers without an id are skipped.
#[must_use]
pub fn composer_metadata(composer_index: &Value) -> Vec<(String, SessionMetadata)> {
    array(composer_index.get("allComposers"))
        .iter()
        .filter_map(|composer| {
            let id = composer.get("composerId")?.as_str()?;
            let title = composer
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("(untitled)")
                .to_string();
            Some((
                id.to_string(),
                SessionMetadata {
                    title,
                    created_at: composer.get("createdAt").and_then(millis),
                    last_updated_at: composer.get("lastUpdatedAt").and_then(millis),
                },
            ))
        })
        .collect()
}

/// Tab ids from the tabbed chat document.
#[must_use]
pub fn tab_ids(chat_data: &Value) -> Vec<String> {
    array(chat_data.get("tabs"))
        .iter()
        .filter_map(|tab| tab.get("tabId")?.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Editor file paths from `history.entries`, with the `file:///` scheme
/// stripped (so they carry no leading slash).
#[must_use]
pub fn history_paths(entries: &Value) -> Vec<String> {
    array(Some(entries))
        .iter()
        .filter_map(|entry| entry.get("editor")?.get("resource")?.as_str())
        .filter_map(strip_file_uri)
        .map(str::to_string)
        .collect()
}

/// Strips the `file:///` scheme from a URI.
#[must_use]
pub fn strip_file_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(FILE_URI_PREFIX)
}

/// Extracts conversation ID from a bubble key.
///
/// Key format: `bubbleId:{composer_id}:{bubble_id}`
pub fn extract_conversation_id(key: &str) -> Option<&str> {
    let stripped = key.strip_prefix(BUBBLE_PREFIX)?;
    stripped.split(':').next().filter(|id| !id.is_empty())
}

/// Extracts composer ID from a composer key.
///
/// Key format: `composerData:{composer_id}`
pub fn extract_composer_id(key: &str) -> Option<&str> {
    let stripped = key.strip_prefix(COMPOSER_PREFIX)?;
    stripped.split(':').next().filter(|id| !id.is_empty())
}

/// Epoch milliseconds from an integer or float JSON number.
#[allow(clippy::cast_possible_truncation)]
fn millis(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn is_one(value: &Value) -> bool {
    value.as_f64() == Some(1.0)
}

/// JSON truthiness: null, false, zero and empty values are falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn trimmed_str(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn array(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
