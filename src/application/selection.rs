//! Session filtering for the export command.

use std::path::Path;

use crate::domain::{AppError, ConversationRecord, Result, CONTAINER_DIRS};

/// Hint shown when nothing was extracted at all.
pub const NO_RECORDS_HINT: &str = "Please ensure Cursor is installed and you have used the AI assistant";

const SCOPE_HINT: &str =
    "Use --all-projects to export all projects' sessions, or use --project to specify another project";

/// Which projects an export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    /// Sessions whose project name contains the given text.
    Named(String),
    /// Sessions of the project in the working directory.
    Current(String),
    /// Every session.
    All,
}

impl std::fmt::Display for ProjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "Filtering by specified project: {name}"),
            Self::Current(name) => write!(f, "Defaulting to current project: {name}"),
            Self::All => write!(f, "Exporting all projects' sessions"),
        }
    }
}

/// Filters applied before export.
#[derive(Debug, Clone)]
pub struct SessionFilter {
    /// Conversation id prefix.
    pub session_id: Option<String>,
    pub scope: ProjectScope,
    /// Maximum number of sessions, applied last; zero means no limit.
    pub limit: Option<usize>,
}

impl SessionFilter {
    /// Builds a filter from command-line choices.
    ///
    /// An explicit project wins over `all_projects`; with neither, the
    /// project is derived from `cwd`.
    #[must_use]
    pub fn new(
        session_id: Option<String>,
        project: Option<String>,
        all_projects: bool,
        limit: Option<usize>,
        cwd: &Path,
    ) -> Self {
        let scope = match project {
            Some(name) => ProjectScope::Named(name),
            None if all_projects => ProjectScope::All,
            None => ProjectScope::Current(current_project_name(cwd)),
        };
        Self {
            session_id,
            scope,
            limit,
        }
    }

    /// Applies the filters in order: session id, project, limit.
    ///
    /// # Errors
    /// Returns `NoRecords` when the input is empty or a filter leaves
    /// nothing.
    pub fn apply(&self, conversations: Vec<ConversationRecord>) -> Result<Vec<ConversationRecord>> {
        if conversations.is_empty() {
            return Err(AppError::no_records("No chat records found", Some(NO_RECORDS_HINT)));
        }

        let mut selected = conversations;

        if let Some(prefix) = &self.session_id {
            selected.retain(|c| c.conversation_id.starts_with(prefix.as_str()));
            if selected.is_empty() {
                return Err(AppError::no_records(
                    format!("No chat records found with session ID starting with '{prefix}'"),
                    None,
                ));
            }
        }

        match &self.scope {
            ProjectScope::Named(name) => {
                selected.retain(|c| project_matches(c, name));
                if selected.is_empty() {
                    return Err(AppError::no_records(
                        format!("No chat records found with project name containing '{name}'"),
                        None,
                    ));
                }
            }
            ProjectScope::Current(name) => {
                selected.retain(|c| project_matches(c, name));
                if selected.is_empty() {
                    return Err(AppError::no_records(
                        format!("No chat records found for current project '{name}'"),
                        Some(SCOPE_HINT),
                    ));
                }
            }
            ProjectScope::All => {}
        }

        if let Some(limit) = self.limit.filter(|&n| n > 0) {
            selected.truncate(limit);
        }

        tracing::debug!("{} sessions selected", selected.len());
        Ok(selected)
    }
}

/// Case-insensitive substring match on the project name.
fn project_matches(conv: &ConversationRecord, needle: &str) -> bool {
    conv.project
        .name
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

/// Project name of a working directory.
///
/// A container directory such as `src` stands for its parent.
#[must_use]
pub fn current_project_name(cwd: &Path) -> String {
    let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());

    match name(cwd) {
        Some(dir) if CONTAINER_DIRS.contains(&dir.as_str()) => cwd
            .parent()
            .and_then(name)
            .unwrap_or(dir),
        Some(dir) => dir,
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectInfo;

    fn conv(id: &str, project: &str) -> ConversationRecord {
        let mut c = ConversationRecord::new(id);
        c.project = ProjectInfo::new(project, format!("/p/{project}"));
        c
    }

    fn sample() -> Vec<ConversationRecord> {
        vec![
            conv("aaa111", "Cursor-View"),
            conv("aab222", "shop"),
            conv("bbb333", "cursor-view"),
            conv("ccc444", "api"),
        ]
    }

    fn ids(convs: &[ConversationRecord]) -> Vec<&str> {
        convs.iter().map(|c| c.conversation_id.as_str()).collect()
    }

    #[test]
    fn test_current_project_name() {
        assert_eq!(current_project_name(Path::new("/home/alice/shop")), "shop");
        assert_eq!(current_project_name(Path::new("/home/alice/shop/src")), "shop");
        assert_eq!(current_project_name(Path::new("/")), "unknown");
    }

    #[test]
    fn test_scope_from_flags() {
        let cwd = Path::new("/home/alice/shop");
        let f = SessionFilter::new(None, Some("api".into()), true, None, cwd);
        assert_eq!(f.scope, ProjectScope::Named("api".into()));
        let f = SessionFilter::new(None, None, true, None, cwd);
        assert_eq!(f.scope, ProjectScope::All);
        let f = SessionFilter::new(None, None, false, None, cwd);
        assert_eq!(f.scope, ProjectScope::Current("shop".into()));
    }

    #[test]
    fn test_project_filter_case_insensitive() {
        let f = SessionFilter::new(None, Some("CURSOR".into()), false, None, Path::new("/"));
        assert_eq!(ids(&f.apply(sample()).unwrap()), vec!["aaa111", "bbb333"]);
    }

    #[test]
    fn test_session_prefix_and_limit() {
        let f = SessionFilter::new(Some("aa".into()), None, true, Some(1), Path::new("/"));
        assert_eq!(ids(&f.apply(sample()).unwrap()), vec!["aaa111"]);
    }

    #[test]
    fn test_zero_limit_exports_everything() {
        let f = SessionFilter::new(None, None, true, Some(0), Path::new("/"));
        assert_eq!(f.apply(sample()).unwrap().len(), 4);
    }

    #[test]
    fn test_current_project_scope() {
        let f = SessionFilter::new(None, None, false, None, Path::new("/work/shop"));
        assert_eq!(ids(&f.apply(sample()).unwrap()), vec!["aab222"]);
    }

    #[test]
    fn test_empty_results_are_no_records() {
        let f = SessionFilter::new(None, None, true, None, Path::new("/"));
        let err = f.apply(Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::NoRecords { .. }));

        let f = SessionFilter::new(Some("zzz".into()), None, true, None, Path::new("/"));
        assert!(matches!(f.apply(sample()), Err(AppError::NoRecords { .. })));

        let f = SessionFilter::new(None, None, false, None, Path::new("/work/nothing"));
        match f.apply(sample()).unwrap_err() {
            AppError::NoRecords { message, hint } => {
                assert!(message.contains("'nothing'"));
                assert!(hint.unwrap().contains("--all-projects"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
