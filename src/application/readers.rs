//! Record readers for Cursor state databases.
//!
//! Each [`ExtractionStrategy`] knows one storage shape and turns it into
//! [`ChatRecord`]s. Strategies never fail: a missing table, an unreadable
//! database or a malformed row contributes nothing and is logged at
//! `debug` level.

use crate::domain::{ChatRecord, Role};
use crate::infrastructure::StateDbReader;

use super::parser::{
    composer_index_messages, extract_composer_id, extract_conversation_id, parse_bubble,
    parse_composer, prompt_generation_messages, tab_messages, ComposerEntry,
    AI_SERVICE_CONVERSATION_ID, BUBBLE_PREFIX, CHAT_DATA_KEY, COMPOSER_INDEX_KEY,
    COMPOSER_PREFIX, GENERATIONS_KEY, PROMPTS_KEY,
};

/// Known storage shapes for chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `cursorDiskKV` rows keyed `bubbleId:<conversation>:<bubble>`.
    DiskKvBubbles,
    /// `ItemTable` tabbed chat document with nested bubble lists.
    TabbedChat,
    /// `ItemTable` composer index with explicit role/content messages.
    ComposerIndex,
    /// `ItemTable` prompt and generation lists, combined into one conversation.
    PromptGenerations,
    /// `cursorDiskKV` rows keyed `composerData:<conversation>`.
    ComposerData,
}

impl ExtractionStrategy {
    /// Shapes found in a workspace database's `ItemTable`, in read order.
    pub const ITEM_TABLE: [Self; 3] = [
        Self::TabbedChat,
        Self::ComposerIndex,
        Self::PromptGenerations,
    ];

    /// Runs this strategy against an open database.
    #[must_use]
    pub fn extract(self, db: &StateDbReader) -> Vec<ChatRecord> {
        let source = db.path_string();
        match self {
            Self::DiskKvBubbles => read_disk_kv_bubbles(db),
            Self::TabbedChat => db
                .item_json(CHAT_DATA_KEY)
                .map(|data| {
                    tab_messages(&data)
                        .into_iter()
                        .map(|(id, role, content)| {
                            ChatRecord::new(id, role, content, source.as_str())
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Self::ComposerIndex => db
                .item_json(COMPOSER_INDEX_KEY)
                .map(|data| {
                    composer_index_messages(&data)
                        .into_iter()
                        .map(|(id, role, content)| {
                            ChatRecord::new(id, role, content, source.as_str())
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Self::PromptGenerations => {
                let prompts = db.item_json(PROMPTS_KEY);
                let generations = db.item_json(GENERATIONS_KEY);
                prompt_generation_messages(prompts.as_ref(), generations.as_ref())
                    .into_iter()
                    .map(|(role, text)| {
                        ChatRecord::new(AI_SERVICE_CONVERSATION_ID, role, text, source.as_str())
                    })
                    .collect()
            }
            Self::ComposerData => read_composer_data(db),
        }
    }
}

/// Reads every `bubbleId:` row with non-blank text.
fn read_disk_kv_bubbles(db: &StateDbReader) -> Vec<ChatRecord> {
    let entries = match db.fetch_disk_kv(BUBBLE_PREFIX) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Database error with {}: {}", db.path().display(), e);
            return Vec::new();
        }
    };

    let source = db.path_string();
    entries
        .into_iter()
        .filter_map(|entry| {
            let conv_id = extract_conversation_id(&entry.key)?;
            match parse_bubble(&entry.value) {
                Ok(Some((role, text))) => {
                    Some(ChatRecord::new(conv_id, role, text, source.as_str()))
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!("Failed to parse bubble JSON for key {}: {}", entry.key, e);
                    None
                }
            }
        })
        .collect()
}

/// Reads all three `ItemTable` shapes: tabbed chats, the composer index,
/// then the combined prompt/generation conversation.
#[must_use]
pub fn read_item_table_chat(db: &StateDbReader) -> Vec<ChatRecord> {
    ExtractionStrategy::ITEM_TABLE
        .into_iter()
        .flat_map(|strategy| strategy.extract(db))
        .collect()
}

/// Reads every decodable `composerData:` row, including ones without
/// messages.
fn read_composer_entries(db: &StateDbReader) -> Vec<(String, ComposerEntry)> {
    let entries = match db.fetch_disk_kv(COMPOSER_PREFIX) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Database error with {}: {}", db.path().display(), e);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let id = extract_composer_id(&entry.key)?.to_string();
            match parse_composer(&entry.value) {
                Ok(composer) => Some((id, composer)),
                Err(e) => {
                    tracing::debug!("Failed to parse composer data for key {}: {}", entry.key, e);
                    None
                }
            }
        })
        .collect()
}

/// Creation time of every decodable `composerData:` row.
#[must_use]
pub fn read_composer_timestamps(db: &StateDbReader) -> Vec<(String, Option<i64>)> {
    read_composer_entries(db)
        .into_iter()
        .map(|(id, composer)| (id, composer.created_at))
        .collect()
}

/// Reads the messages held in `composerData:` rows.
fn read_composer_data(db: &StateDbReader) -> Vec<ChatRecord> {
    let source = db.path_string();
    read_composer_entries(db)
        .into_iter()
        .flat_map(|(id, composer)| {
            let source = source.clone();
            composer
                .messages
                .into_iter()
                .map(move |(role, text): (Role, String)| {
                    ChatRecord::new(id.as_str(), role, text, source.as_str())
                })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::{create_state_db, put_item, put_kv};
    use super::*;
    use crate::domain::MessageContent;
    use rusqlite::Connection;
    use tempfile::tempdir;

    #[test]
    fn test_disk_kv_bubble_scenario() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        let conn = create_state_db(&path);
        put_kv(&conn, "bubbleId:abc123:b1", r#"{"text": "hello", "type": 1}"#);
        put_kv(&conn, "bubbleId:abc123:b2", r#"{"text": "   ", "type": 2}"#);
        put_kv(&conn, "bubbleId:abc123:b3", "{broken");
        drop(conn);

        let db = StateDbReader::open(&path).unwrap();
        let records = ExtractionStrategy::DiskKvBubbles.extract(&db);
        assert_eq!(
            records,
            vec![ChatRecord::new(
                "abc123",
                Role::User,
                "hello",
                path.display().to_string()
            )]
        );
    }

    #[test]
    fn test_prompt_generation_scenario() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        let conn = create_state_db(&path);
        put_item(&conn, "aiService.prompts", r#"[{"text":"hi"}]"#);
        put_item(&conn, "aiService.generations", r#"[{"textDescription":"hello"}]"#);
        drop(conn);

        let db = StateDbReader::open(&path).unwrap();
        let records = read_item_table_chat(&db);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.conversation_id == "aiService_combined"));
        assert_eq!(records[0].role, Role::User);
        assert_eq!(records[0].content, MessageContent::from("hi"));
        assert_eq!(records[1].role, Role::Assistant);
        assert_eq!(records[1].content, MessageContent::from("hello"));
    }

    #[test]
    fn test_item_table_order_tabs_composers_prompts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        let conn = create_state_db(&path);
        put_item(&conn, "aiService.prompts", r#"[{"text":"p"}]"#);
        put_item(
            &conn,
            "composer.composerData",
            r#"{"allComposers":[{"composerId":"c1","messages":[{"role":"user","content":"c"}]}]}"#,
        );
        put_item(
            &conn,
            "workbench.panel.aichat.view.aichat.chatdata",
            r#"{"tabs":[{"tabId":"t1","bubbles":[{"type":"user","text":"t"}]}]}"#,
        );
        drop(conn);

        let db = StateDbReader::open(&path).unwrap();
        let ids: Vec<_> = read_item_table_chat(&db)
            .into_iter()
            .map(|r| r.conversation_id)
            .collect();
        assert_eq!(ids, vec!["t1", "c1", "aiService_combined"]);
    }

    #[test]
    fn test_composer_data_reader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        let conn = create_state_db(&path);
        put_kv(
            &conn,
            "composerData:comp1",
            r#"{"createdAt": 5, "conversation": [{"type": 1, "text": "q"}, {"type": 2, "text": "a"}]}"#,
        );
        put_kv(&conn, "composerData:comp2", r#"{"createdAt": 6}"#);
        put_kv(&conn, "composerData:comp3", "garbage");
        drop(conn);

        let db = StateDbReader::open(&path).unwrap();
        let timestamps = read_composer_timestamps(&db);
        assert_eq!(
            timestamps,
            vec![("comp1".to_string(), Some(5)), ("comp2".to_string(), Some(6))]
        );

        let records = ExtractionStrategy::ComposerData.extract(&db);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].conversation_id, "comp1");
        assert_eq!(records[1].role, Role::Assistant);
    }

    #[test]
    fn test_every_strategy_is_empty_on_empty_store() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.vscdb");
        Connection::open(&empty)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();
        let tables_only = dir.path().join("tables.vscdb");
        drop(create_state_db(&tables_only));
        let corrupt = dir.path().join("corrupt.vscdb");
        std::fs::write(&corrupt, b"definitely not an sqlite database at all").unwrap();

        let strategies = [
            ExtractionStrategy::DiskKvBubbles,
            ExtractionStrategy::TabbedChat,
            ExtractionStrategy::ComposerIndex,
            ExtractionStrategy::PromptGenerations,
            ExtractionStrategy::ComposerData,
        ];
        for path in [&empty, &tables_only, &corrupt] {
            // A corrupt file may already be rejected at open time.
            let Ok(db) = StateDbReader::open(path) else {
                continue;
            };
            for strategy in strategies {
                assert!(strategy.extract(&db).is_empty(), "{strategy:?} on {}", path.display());
            }
        }
        assert!(StateDbReader::open(&dir.path().join("missing.vscdb")).is_err());
    }
}
