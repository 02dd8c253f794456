//! Workspace metadata extraction.
//!
//! A workspace database knows which project it belongs to only
//! indirectly, through the files that were open in its editors. It also
//! carries titles and timestamps for the conversations held in it.

use crate::domain::{ProjectInfo, SessionMetadata};
use crate::infrastructure::StateDbReader;

use super::parser::{
    composer_metadata, history_paths, strip_file_uri, tab_ids, CHAT_DATA_KEY,
    COMPOSER_INDEX_KEY, HISTORY_ENTRIES_KEY, SELECTED_ROOT_KEY,
};
use super::project_name::ProjectNamer;

/// Project and per-conversation metadata of one workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceInfo {
    pub project: ProjectInfo,
    /// Conversation metadata in discovery order: composers, then chat tabs.
    pub sessions: Vec<(String, SessionMetadata)>,
}

/// Reads workspace metadata from an open database.
#[must_use]
pub fn workspace_info(db: &StateDbReader, namer: &ProjectNamer) -> WorkspaceInfo {
    let project = project_from_history(db, namer)
        .or_else(|| project_from_selected_root(db, namer))
        .unwrap_or_default();

    let mut sessions = db
        .item_json(COMPOSER_INDEX_KEY)
        .map(|index| composer_metadata(&index))
        .unwrap_or_default();

    if let Some(chat_data) = db.item_json(CHAT_DATA_KEY) {
        for tab_id in tab_ids(&chat_data) {
            if !sessions.iter().any(|(id, _)| *id == tab_id) {
                let meta = SessionMetadata::placeholder(&tab_id);
                sessions.push((tab_id, meta));
            }
        }
    }

    WorkspaceInfo { project, sessions }
}

fn project_from_history(db: &StateDbReader, namer: &ProjectNamer) -> Option<ProjectInfo> {
    let entries = db.item_json(HISTORY_ENTRIES_KEY)?;
    let paths = history_paths(&entries);
    if paths.is_empty() {
        return None;
    }
    tracing::debug!("Found {} paths in history entries", paths.len());

    let project = namer.project_from_files(&paths)?;
    tracing::debug!(
        name = %project.name,
        root = %project.root_path,
        "Project from history entries"
    );
    Some(project)
}

fn project_from_selected_root(db: &StateDbReader, namer: &ProjectNamer) -> Option<ProjectInfo> {
    let selected = db.item_json(SELECTED_ROOT_KEY)?;
    let path = strip_file_uri(selected.as_str()?)?;
    if path.is_empty() {
        return None;
    }

    let project = namer.project_from_root(path);
    tracing::debug!(
        name = %project.name,
        root = %project.root_path,
        "Project from debug.selectedroot"
    );
    Some(project)
}
