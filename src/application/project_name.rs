//! Project name inference from filesystem paths.
//!
//! Best-effort and approximate. The rules are applied in a fixed order and
//! the first one that matches wins; never fails, only degrades to a
//! generic label.

use crate::domain::{ProjectInfo, CONTAINER_DIRS};

/// Label for a path that is exactly a home directory.
pub const HOME_LABEL: &str = "Home Directory";
/// Label for an empty path or `/`.
pub const ROOT_LABEL: &str = "Root";
/// Label when nothing usable is left.
pub const UNKNOWN_PROJECT: &str = "Unknown Project";

/// Segments that introduce a user's home directory.
const HOME_SEGMENTS: &[&str] = &["Users", "home"];

/// Directories that are never projects.
const SYSTEM_DIRS: &[&str] = &["Library", "Applications", "System", "var", "opt", "tmp"];

/// Derives short project labels from paths.
#[derive(Debug, Clone)]
pub struct ProjectNamer {
    username: String,
    known_projects: Vec<String>,
}

impl ProjectNamer {
    /// Creates a namer for the given OS username and known-project list.
    #[must_use]
    pub fn new(username: impl Into<String>, known_projects: Vec<String>) -> Self {
        Self {
            username: username.into(),
            known_projects,
        }
    }

    /// Creates a namer for the user running the process.
    #[must_use]
    pub fn for_current_user(known_projects: Vec<String>) -> Self {
        Self::new(current_username(), known_projects)
    }

    /// Infers a project label for a forward-slash separated path.
    #[must_use]
    pub fn infer(&self, path: &str) -> String {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some(last) = parts.last() else {
            return ROOT_LABEL.to_string();
        };

        // Outside any home directory the basename is all we have.
        let Some(user_idx) = parts
            .iter()
            .position(|p| HOME_SEGMENTS.contains(p))
            .map(|i| i + 1)
            .filter(|&i| i < parts.len())
        else {
            return (*last).to_string();
        };

        if parts.len() == user_idx + 1 {
            return HOME_LABEL.to_string();
        }

        let label_idx = self
            .known_project_index(&parts, user_idx)
            .or_else(|| codebase_child_index(&parts))
            .unwrap_or(parts.len() - 1);
        let label = parts[label_idx];

        if CONTAINER_DIRS.contains(&label) || label == self.username {
            return parts[user_idx + 1..]
                .iter()
                .find(|p| self.is_candidate(p))
                .map_or_else(|| HOME_LABEL.to_string(), |p| (*p).to_string());
        }

        if label.is_empty() {
            UNKNOWN_PROJECT.to_string()
        } else {
            label.to_string()
        }
    }

    /// Project for a set of file paths, rooted at their common directory.
    ///
    /// Paths are expected without a leading slash (as left by stripping a
    /// `file:///` scheme); the returned root path always has one.
    #[must_use]
    pub fn project_from_files(&self, files: &[String]) -> Option<ProjectInfo> {
        let root = common_root(files)?;
        Some(ProjectInfo::new(
            self.infer(&root),
            format!("/{}", root.trim_start_matches('/')),
        ))
    }

    /// Project for an explicit root directory.
    #[must_use]
    pub fn project_from_root(&self, root: &str) -> ProjectInfo {
        let root_path = format!("/{}", root.trim_matches('/'));
        ProjectInfo::new(self.infer(&root_path), root_path)
    }

    /// Deepest segment below the username that is a known project.
    fn known_project_index(&self, parts: &[&str], user_idx: usize) -> Option<usize> {
        (user_idx + 1..parts.len())
            .rev()
            .find(|&i| self.known_projects.iter().any(|k| k == parts[i]))
    }

    fn is_candidate(&self, segment: &str) -> bool {
        !CONTAINER_DIRS.contains(&segment)
            && !SYSTEM_DIRS.contains(&segment)
            && segment != self.username
    }
}

/// `.../Documents/.../codebase/<project>/...` layout.
fn codebase_child_index(parts: &[&str]) -> Option<usize> {
    if !parts.contains(&"Documents") {
        return None;
    }
    let codebase = parts.iter().position(|p| *p == "codebase")?;
    (codebase + 1 < parts.len()).then_some(codebase + 1)
}

/// Directory portion of the longest common prefix of `paths`.
///
/// The prefix is computed character by character and cut at its last `/`;
/// `None` when there are no paths or no separator past the first character.
#[must_use]
pub fn common_root(paths: &[String]) -> Option<String> {
    let (first, rest) = paths.split_first()?;

    let mut prefix_len = first.len();
    for path in rest {
        prefix_len = first
            .char_indices()
            .zip(path.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8())
            .min(prefix_len);
    }

    let prefix = &first[..prefix_len];
    match prefix.rfind('/') {
        Some(idx) if idx > 0 => Some(prefix[..idx].to_string()),
        _ => None,
    }
}

/// Name of the current OS user, taken from the home directory.
#[must_use]
pub fn current_username() -> String {
    dirs::home_dir()
        .and_then(|home| home.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::DEFAULT_KNOWN_PROJECTS;

    fn namer() -> ProjectNamer {
        ProjectNamer::new(
            "alice",
            DEFAULT_KNOWN_PROJECTS.iter().map(|s| (*s).to_string()).collect(),
        )
    }

    #[test]
    fn test_documents_codebase_layout() {
        assert_eq!(
            namer().infer("/Users/alice/Documents/codebase/myproj/src/main.py"),
            "myproj"
        );
    }

    #[test]
    fn test_home_directory() {
        assert_eq!(namer().infer("/Users/alice"), HOME_LABEL);
        assert_eq!(namer().infer("/home/alice/"), HOME_LABEL);
    }

    #[test]
    fn test_root_and_non_home_paths() {
        assert_eq!(namer().infer(""), ROOT_LABEL);
        assert_eq!(namer().infer("/"), ROOT_LABEL);
        assert_eq!(namer().infer("/opt/services/billing"), "billing");
        assert_eq!(namer().infer("/Users"), "Users");
    }

    #[test]
    fn test_known_project_deepest_first() {
        assert_eq!(namer().infer("/Users/alice/work/cursor/cursor-view/ui"), "cursor-view");
        assert_eq!(namer().infer("/home/alice/cursor/tools"), "cursor");
    }

    #[test]
    fn test_last_segment_default() {
        assert_eq!(namer().infer("/Users/alice/dev/my-app"), "my-app");
    }

    #[test]
    fn test_container_walks_forward() {
        assert_eq!(namer().infer("/Users/alice/src/app/src"), "app");
        assert_eq!(namer().infer("/Users/alice/Projects/Code/web/repos"), "web");
        assert_eq!(namer().infer("/Users/alice/Projects"), HOME_LABEL);
        assert_eq!(namer().infer("/Users/alice/Library/git"), HOME_LABEL);
    }

    #[test]
    fn test_username_label_is_replaced() {
        assert_eq!(namer().infer("/home/alice/backup/alice"), "backup");
        assert_eq!(namer().infer("/home/bob/alice"), HOME_LABEL);
    }

    #[test]
    fn test_deterministic() {
        let path = "/Users/alice/Documents/codebase/x/y";
        assert_eq!(namer().infer(path), namer().infer(path));
    }

    #[test]
    fn test_common_root() {
        let paths = vec![
            "Users/alice/app/src/main.rs".to_string(),
            "Users/alice/app/src/lib.rs".to_string(),
            "Users/alice/app/Cargo.toml".to_string(),
        ];
        assert_eq!(common_root(&paths).as_deref(), Some("Users/alice/app"));

        let single = vec!["Users/alice/app/main.rs".to_string()];
        assert_eq!(common_root(&single).as_deref(), Some("Users/alice/app"));

        let disjoint = vec!["a/x".to_string(), "b/y".to_string()];
        assert_eq!(common_root(&disjoint), None);
        assert_eq!(common_root(&[]), None);
    }

    #[test]
    fn test_common_root_partial_segment() {
        let paths = vec![
            "Users/alice/app-one/a.rs".to_string(),
            "Users/alice/app-two/b.rs".to_string(),
        ];
        assert_eq!(common_root(&paths).as_deref(), Some("Users/alice"));
    }

    #[test]
    fn test_project_from_files() {
        let files = vec![
            "Users/alice/dev/shop/a.ts".to_string(),
            "Users/alice/dev/shop/b.ts".to_string(),
        ];
        assert_eq!(
            namer().project_from_files(&files),
            Some(ProjectInfo::new("shop", "/Users/alice/dev/shop"))
        );
    }

    #[test]
    fn test_project_from_root() {
        assert_eq!(
            namer().project_from_root("Users/alice/dev/shop/"),
            ProjectInfo::new("shop", "/Users/alice/dev/shop")
        );
    }
}
