//! Chat extraction service.
//!
//! Orchestrates reading from every Cursor database and merging the
//! results into one [`ConversationRecord`] per conversation id.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::{
    AppConfig, ChatRecord, ConversationRecord, ExtractionStats, ProjectInfo, Result,
    SessionMetadata, GLOBAL_WORKSPACE, UNKNOWN,
};
use crate::infrastructure::{
    find_cursor_root, global_storage_path, workspace_databases, StateDbReader,
};

use super::project_name::ProjectNamer;
use super::readers::{read_composer_timestamps, read_item_table_chat, ExtractionStrategy};
use super::workspace::{workspace_info, WorkspaceInfo};

/// Accumulates conversations across storage files.
///
/// Records are kept in first-touch order; ties in the final recency sort
/// keep that order, so identical storage always yields identical output.
#[derive(Debug, Default)]
pub struct SessionAssembler {
    records: Vec<ConversationRecord>,
    index: HashMap<String, usize>,
    metadata: HashMap<String, SessionMetadata>,
    conversation_workspace: HashMap<String, String>,
    projects: HashMap<String, ProjectInfo>,
    stats: ExtractionStats,
}

impl SessionAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one workspace: its project, its conversation metadata and the
    /// messages read from its `ItemTable`.
    pub fn add_workspace(
        &mut self,
        workspace_id: &str,
        info: WorkspaceInfo,
        records: Vec<ChatRecord>,
    ) {
        self.stats.workspaces_scanned += 1;
        self.projects.insert(workspace_id.to_string(), info.project);

        for (conv_id, meta) in info.sessions {
            self.conversation_workspace
                .insert(conv_id.clone(), workspace_id.to_string());
            self.metadata.insert(conv_id, meta);
        }

        let count = self.absorb(records, workspace_id);
        self.stats.item_table_messages += count;
        tracing::debug!("Extracted {} messages from workspace {}", count, workspace_id);
    }

    /// Adds messages read from global `bubbleId:` rows.
    pub fn add_global_bubbles(&mut self, records: Vec<ChatRecord>) {
        self.stats.global_store_found = true;
        let count = self.absorb(records, GLOBAL_WORKSPACE);
        self.stats.bubble_messages += count;
        tracing::debug!("Extracted {} messages from global bubbles", count);
    }

    /// Registers the conversations of global `composerData:` rows with
    /// their creation times.
    ///
    /// A conversation registered here but given no messages by any source
    /// is dropped by [`finish`](Self::finish).
    pub fn add_composer_metadata(
        &mut self,
        entries: Vec<(String, Option<i64>)>,
        source_path: &str,
    ) {
        self.stats.global_store_found = true;

        for (conv_id, created_at) in entries {
            match self.metadata.get_mut(&conv_id) {
                Some(meta) => {
                    if meta.created_at.is_none() {
                        meta.created_at = created_at;
                    }
                    if meta.last_updated_at.is_none() {
                        meta.last_updated_at = created_at;
                    }
                }
                None => {
                    let mut meta = SessionMetadata::placeholder(&conv_id);
                    meta.created_at = created_at;
                    meta.last_updated_at = created_at;
                    self.metadata.insert(conv_id.clone(), meta);
                    self.conversation_workspace
                        .insert(conv_id.clone(), GLOBAL_WORKSPACE.to_string());
                }
            }

            let idx = self.touch(&conv_id);
            self.records[idx]
                .source_path
                .get_or_insert_with(|| source_path.to_string());
        }
    }

    /// Adds messages read from global `composerData:` rows.
    pub fn add_global_composers(&mut self, records: Vec<ChatRecord>) {
        self.stats.global_store_found = true;
        let count = self.absorb(records, GLOBAL_WORKSPACE);
        self.stats.composer_messages += count;
        tracing::debug!("Extracted {} messages from global composer data", count);
    }

    /// Drops empty conversations, attaches project and metadata, and sorts
    /// by last update time (newest first, missing last).
    #[must_use]
    pub fn finish(self) -> (Vec<ConversationRecord>, ExtractionStats) {
        let Self {
            records,
            metadata,
            conversation_workspace,
            projects,
            mut stats,
            ..
        } = self;

        let mut conversations: Vec<ConversationRecord> = records
            .into_iter()
            .filter(|r| !r.messages.is_empty())
            .map(|mut record| {
                let workspace_id = conversation_workspace
                    .get(&record.conversation_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN.to_string());
                record.project = projects.get(&workspace_id).cloned().unwrap_or_default();
                record.session = metadata
                    .get(&record.conversation_id)
                    .cloned()
                    .unwrap_or_default();
                record.workspace_id = workspace_id;
                record
            })
            .collect();

        conversations.sort_by_key(|r| std::cmp::Reverse(r.recency()));

        stats.conversation_count = conversations.len();
        tracing::info!(
            "Extracted {} conversations with {} messages",
            stats.conversation_count,
            stats.total_messages()
        );

        (conversations, stats)
    }

    /// Index of the record for `conv_id`, creating an empty one on first touch.
    fn touch(&mut self, conv_id: &str) -> usize {
        if let Some(&idx) = self.index.get(conv_id) {
            return idx;
        }
        let idx = self.records.len();
        self.records.push(ConversationRecord::new(conv_id));
        self.index.insert(conv_id.to_string(), idx);
        idx
    }

    /// Appends one source's messages, returning how many were read.
    ///
    /// A message equal to one contributed by an earlier source is not
    /// appended again; repeats within this batch are kept.
    fn absorb(&mut self, records: Vec<ChatRecord>, workspace_id: &str) -> usize {
        let count = records.len();
        let mut baseline: HashMap<String, usize> = HashMap::new();

        for record in records {
            let conv_id = record.conversation_id.clone();
            if !self.metadata.contains_key(&conv_id) {
                self.metadata
                    .insert(conv_id.clone(), SessionMetadata::placeholder(&conv_id));
                self.conversation_workspace
                    .insert(conv_id.clone(), workspace_id.to_string());
            }

            let idx = self.touch(&conv_id);
            let target = &mut self.records[idx];
            let prior = *baseline
                .entry(conv_id)
                .or_insert_with(|| target.messages.len());

            target
                .source_path
                .get_or_insert_with(|| record.source_path.clone());

            let message = record.into_message();
            if target.messages[..prior].contains(&message) {
                self.stats.duplicate_messages += 1;
                continue;
            }
            target.messages.push(message);
        }

        count
    }
}

/// Extracts all conversations under the configured Cursor root.
///
/// # Errors
/// Returns error if the platform is unsupported or the storage root is missing.
pub fn extract_all_conversations(
    config: &AppConfig,
) -> Result<(Vec<ConversationRecord>, ExtractionStats)> {
    let root = find_cursor_root(&config.paths)?;
    let namer = ProjectNamer::for_current_user(config.known_projects());
    Ok(collect_conversations(&root, &namer))
}

/// Runs one full extraction pass over a Cursor data root.
///
/// Workspace databases are read first, then the global database. Each
/// database is closed before the next is opened.
#[must_use]
pub fn collect_conversations(
    root: &Path,
    namer: &ProjectNamer,
) -> (Vec<ConversationRecord>, ExtractionStats) {
    let mut assembler = SessionAssembler::new();

    for ws in workspace_databases(root) {
        tracing::info!("Processing workspace {} - {}", ws.id, ws.path.display());
        let (info, records) = match StateDbReader::open(&ws.path) {
            Ok(db) => (workspace_info(&db, namer), read_item_table_chat(&db)),
            Err(e) => {
                tracing::debug!("Database error with {}: {}", ws.path.display(), e);
                (WorkspaceInfo::default(), Vec::new())
            }
        };
        assembler.add_workspace(&ws.id, info, records);
    }

    if let Some(global_db) = global_storage_path(root) {
        tracing::info!("Processing global storage: {}", global_db.display());
        match StateDbReader::open(&global_db) {
            Ok(db) => {
                assembler.add_global_bubbles(ExtractionStrategy::DiskKvBubbles.extract(&db));
                assembler.add_composer_metadata(read_composer_timestamps(&db), &db.path_string());
                assembler.add_global_composers(ExtractionStrategy::ComposerData.extract(&db));
            }
            Err(e) => {
                tracing::debug!("Database error with {}: {}", global_db.display(), e);
            }
        }
    }

    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::readers::fixtures::{create_state_db, put_item, put_kv};
    use crate::domain::{Message, Role};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn namer() -> ProjectNamer {
        ProjectNamer::new("alice", vec![])
    }

    fn workspace_db(root: &Path, id: &str) -> PathBuf {
        let dir = root.join("User/workspaceStorage").join(id);
        fs::create_dir_all(&dir).unwrap();
        dir.join("state.vscdb")
    }

    fn global_db(root: &Path) -> PathBuf {
        let dir = root.join("User/globalStorage");
        fs::create_dir_all(&dir).unwrap();
        dir.join("state.vscdb")
    }

    /// Two workspaces plus a global store, with overlapping conversation ids.
    fn build_root(root: &Path) {
        let conn = create_state_db(&workspace_db(root, "ws-a"));
        put_item(
            &conn,
            "history.entries",
            r#"[{"editor":{"resource":"file:///Users/alice/dev/shop/a.ts"}}]"#,
        );
        put_item(
            &conn,
            "composer.composerData",
            r#"{"allComposers":[
                {"composerId":"comp-old","name":"Old","createdAt":100,"lastUpdatedAt":200,
                 "messages":[{"role":"user","content":"first"}]},
                {"composerId":"comp-new","name":"New","createdAt":300,"lastUpdatedAt":900},
                {"composerId":"comp-empty","name":"Empty","lastUpdatedAt":5000}
            ]}"#,
        );
        drop(conn);

        let conn = create_state_db(&workspace_db(root, "ws-b"));
        put_item(&conn, "debug.selectedroot", r#""file:///home/alice/api""#);
        put_item(&conn, "aiService.prompts", r#"[{"text":"hi"}]"#);
        put_item(&conn, "aiService.generations", r#"[{"textDescription":"hello"}]"#);
        drop(conn);

        let conn = create_state_db(&global_db(root));
        put_kv(&conn, "bubbleId:comp-new:1", r#"{"text":"new question","type":1}"#);
        put_kv(&conn, "bubbleId:comp-new:2", r#"{"text":"new answer","type":2}"#);
        put_kv(&conn, "bubbleId:comp-old:1", r#"{"text":"first","type":1}"#);
        put_kv(&conn, "bubbleId:comp-old:2", r#"{"text":"second","type":2}"#);
        put_kv(&conn, "bubbleId:orphan:1", r#"{"text":"lonely","type":1}"#);
        put_kv(
            &conn,
            "composerData:comp-new",
            r#"{"createdAt":300,"conversation":[{"type":1,"text":"new question"},{"type":2,"text":"new answer"}]}"#,
        );
        put_kv(
            &conn,
            "composerData:dated",
            r#"{"createdAt":700,"conversation":[{"type":1,"text":"dated q"}]}"#,
        );
        put_kv(&conn, "composerData:silent", r#"{"createdAt":9999}"#);
        drop(conn);
    }

    fn ids(conversations: &[ConversationRecord]) -> Vec<&str> {
        conversations
            .iter()
            .map(|c| c.conversation_id.as_str())
            .collect()
    }

    #[test]
    fn test_collect_sorts_by_last_update() {
        let dir = tempdir().unwrap();
        build_root(dir.path());

        let (conversations, stats) = collect_conversations(dir.path(), &namer());

        assert_eq!(
            ids(&conversations),
            vec!["comp-new", "dated", "comp-old", "aiService_combined", "orphan"]
        );
        assert_eq!(stats.workspaces_scanned, 2);
        assert!(stats.global_store_found);
        assert_eq!(stats.conversation_count, 5);
    }

    #[test]
    fn test_merge_keeps_first_seen_order_without_duplicates() {
        let dir = tempdir().unwrap();
        build_root(dir.path());

        let (conversations, stats) = collect_conversations(dir.path(), &namer());
        let old = conversations
            .iter()
            .find(|c| c.conversation_id == "comp-old")
            .unwrap();
        assert_eq!(
            old.messages,
            vec![
                Message::new(Role::User, "first"),
                Message::new(Role::Assistant, "second"),
            ]
        );

        let new = conversations
            .iter()
            .find(|c| c.conversation_id == "comp-new")
            .unwrap();
        assert_eq!(new.messages.len(), 2);
        assert_eq!(stats.duplicate_messages, 3);
    }

    #[test]
    fn test_project_and_workspace_attachment() {
        let dir = tempdir().unwrap();
        build_root(dir.path());

        let (conversations, _) = collect_conversations(dir.path(), &namer());
        let by_id = |id: &str| {
            conversations
                .iter()
                .find(|c| c.conversation_id == id)
                .unwrap()
                .clone()
        };

        let new = by_id("comp-new");
        assert_eq!(new.workspace_id, "ws-a");
        assert_eq!(new.project, ProjectInfo::new("shop", "/Users/alice/dev/shop"));
        assert_eq!(new.session.title, "New");
        assert!(new.source_path.unwrap().ends_with("globalStorage/state.vscdb"));

        let combined = by_id("aiService_combined");
        assert_eq!(combined.workspace_id, "ws-b");
        assert_eq!(combined.project.name, "api");
        assert_eq!(combined.session.title, "Chat aiServic");
        assert_eq!(
            combined.messages,
            vec![
                Message::new(Role::User, "hi"),
                Message::new(Role::Assistant, "hello"),
            ]
        );

        let orphan = by_id("orphan");
        assert_eq!(orphan.workspace_id, GLOBAL_WORKSPACE);
        assert_eq!(orphan.project, ProjectInfo::default());

        let dated = by_id("dated");
        assert_eq!(dated.session.created_at, Some(700));
        assert_eq!(dated.session.last_updated_at, Some(700));
    }

    #[test]
    fn test_empty_conversations_discarded() {
        let dir = tempdir().unwrap();
        build_root(dir.path());

        let (conversations, _) = collect_conversations(dir.path(), &namer());
        assert!(conversations.iter().all(|c| !c.messages.is_empty()));
        assert!(!ids(&conversations).contains(&"comp-empty"));
        assert!(!ids(&conversations).contains(&"silent"));
    }

    #[test]
    fn test_collect_is_idempotent() {
        let dir = tempdir().unwrap();
        build_root(dir.path());

        let (first, _) = collect_conversations(dir.path(), &namer());
        let (second, _) = collect_conversations(dir.path(), &namer());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_empty_root() {
        let dir = tempdir().unwrap();
        let (conversations, stats) = collect_conversations(dir.path(), &namer());
        assert!(conversations.is_empty());
        assert!(!stats.global_store_found);
    }

    #[test]
    fn test_corrupt_workspace_is_skipped() {
        let dir = tempdir().unwrap();
        build_root(dir.path());
        fs::write(workspace_db(dir.path(), "ws-broken"), b"not a database").unwrap();

        let (conversations, stats) = collect_conversations(dir.path(), &namer());
        assert_eq!(stats.workspaces_scanned, 3);
        assert_eq!(conversations.len(), 5);
        assert!(conversations.iter().all(|c| c.workspace_id != "ws-broken"));
    }

    #[test]
    fn test_sort_missing_timestamps_last() {
        let mut assembler = SessionAssembler::new();
        let info = WorkspaceInfo {
            project: ProjectInfo::default(),
            sessions: vec![
                (
                    "late".to_string(),
                    SessionMetadata {
                        title: "late".into(),
                        created_at: None,
                        last_updated_at: Some(50),
                    },
                ),
                (
                    "early".to_string(),
                    SessionMetadata {
                        title: "early".into(),
                        created_at: None,
                        last_updated_at: Some(10),
                    },
                ),
            ],
        };
        let records = ["none", "early", "late"]
            .into_iter()
            .map(|id| ChatRecord::new(id, Role::User, "x", "db"))
            .collect();
        assembler.add_workspace("ws", info, records);

        let (conversations, _) = assembler.finish();
        assert_eq!(ids(&conversations), vec!["late", "early", "none"]);
        for pair in conversations.windows(2) {
            assert!(pair[0].recency() >= pair[1].recency());
        }
    }

    #[test]
    fn test_global_composers_use_registered_timestamps() {
        let mut assembler = SessionAssembler::new();
        assembler.add_global_bubbles(vec![ChatRecord::new("known", Role::User, "q", "g.db")]);
        assembler.add_composer_metadata(
            vec![("known".to_string(), Some(40)), ("fresh".to_string(), Some(70))],
            "g.db",
        );
        assembler.add_global_composers(vec![
            ChatRecord::new("fresh", Role::User, "hi", "g.db"),
            ChatRecord::new("known", Role::User, "q", "g.db"),
        ]);

        let (conversations, stats) = assembler.finish();
        assert_eq!(ids(&conversations), vec!["fresh", "known"]);
        assert_eq!(conversations[0].session.created_at, Some(70));
        assert_eq!(conversations[0].workspace_id, GLOBAL_WORKSPACE);
        assert_eq!(conversations[1].session.last_updated_at, Some(40));
        assert_eq!(conversations[1].messages.len(), 1);
        assert_eq!(stats.composer_messages, 2);
        assert_eq!(stats.duplicate_messages, 1);
    }

    #[test]
    fn test_repeats_within_one_source_are_kept() {
        let mut assembler = SessionAssembler::new();
        let records = vec![
            ChatRecord::new("c", Role::User, "yes", "db"),
            ChatRecord::new("c", Role::User, "yes", "db"),
        ];
        assembler.add_global_bubbles(records.clone());
        assembler.add_global_bubbles(records);

        let (conversations, stats) = assembler.finish();
        assert_eq!(conversations[0].messages.len(), 2);
        assert_eq!(stats.duplicate_messages, 2);
    }
}
