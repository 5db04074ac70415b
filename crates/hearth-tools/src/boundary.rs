//! Workspace boundary checking for path-taking tools.
//!
//! Grounded on `astrid-workspace::boundaries::WorkspaceBoundary`, trimmed
//! to the fields spec.md's `ToolUsePermissionContext` actually carries
//! (`additional_working_directories`, no `WorkspaceMode`/`EscapePolicy`
//! tri-state — that UI-layer concept isn't part of C4's data model).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Paths that are never allowed regardless of workspace configuration.
const NEVER_ALLOW: &[&str] = &[".ssh", ".aws", ".gnupg"];

/// Result of checking a path against the workspace boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCheck {
    /// Within the workspace root.
    Allowed,
    /// Outside the root but in `additional_working_directories`.
    AutoAllowed,
    /// A protected path (e.g. SSH keys), never allowed.
    NeverAllowed,
    /// Outside the root and not auto-allowed; caller must ask.
    RequiresApproval,
}

impl PathCheck {
    /// Whether the call may proceed without asking.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::AutoAllowed)
    }
}

/// Checks paths against a workspace root plus additional allowed
/// directories (spec.md §3, `ToolUsePermissionContext.additional_working_directories`).
#[derive(Debug, Clone)]
pub struct WorkspaceBoundary {
    root: PathBuf,
    additional: HashSet<PathBuf>,
}

impl WorkspaceBoundary {
    /// Create a boundary rooted at `root` with no additional directories.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            additional: HashSet::new(),
        }
    }

    /// Add an auto-allowed directory.
    #[must_use]
    pub fn with_additional_directory(mut self, dir: PathBuf) -> Self {
        self.additional.insert(dir);
        self
    }

    /// The workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn expand(&self, path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root.join(path)
            }
        })
    }

    fn is_never_allowed(&self, expanded: &Path) -> bool {
        NEVER_ALLOW.iter().any(|blocked| {
            expanded
                .components()
                .any(|c| c.as_os_str().to_str() == Some(blocked))
        })
    }

    /// Check `path` against the boundary.
    #[must_use]
    pub fn check(&self, path: &Path) -> PathCheck {
        let expanded = self.expand(path);
        debug!(path = %path.display(), expanded = %expanded.display(), "checking workspace boundary");

        if self.is_never_allowed(&expanded) {
            return PathCheck::NeverAllowed;
        }
        if expanded.starts_with(&self.root) {
            return PathCheck::Allowed;
        }
        if self.additional.iter().any(|dir| expanded.starts_with(dir)) {
            return PathCheck::AutoAllowed;
        }
        PathCheck::RequiresApproval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_inside_root_is_allowed() {
        let dir = TempDir::new().unwrap();
        let boundary = WorkspaceBoundary::new(dir.path().to_path_buf());
        assert_eq!(boundary.check(&dir.path().join("src/main.rs")), PathCheck::Allowed);
    }

    #[test]
    fn path_outside_root_requires_approval() {
        let dir = TempDir::new().unwrap();
        let boundary = WorkspaceBoundary::new(dir.path().to_path_buf());
        assert_eq!(boundary.check(Path::new("/tmp/elsewhere/file.txt")), PathCheck::RequiresApproval);
    }

    #[test]
    fn additional_directory_is_auto_allowed() {
        let dir = TempDir::new().unwrap();
        let extra = TempDir::new().unwrap();
        let boundary = WorkspaceBoundary::new(dir.path().to_path_buf())
            .with_additional_directory(extra.path().to_path_buf());
        assert_eq!(
            boundary.check(&extra.path().join("file.txt")),
            PathCheck::AutoAllowed
        );
    }

    #[test]
    fn ssh_directory_is_never_allowed() {
        let dir = TempDir::new().unwrap();
        let boundary = WorkspaceBoundary::new(dir.path().to_path_buf());
        assert_eq!(
            boundary.check(Path::new("/home/user/.ssh/id_rsa")),
            PathCheck::NeverAllowed
        );
    }
}
