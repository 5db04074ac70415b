//! `ToolUsePermissionContext` (spec.md §3): per-session permission state,
//! mutated only by the UI layer and read by the executor and by each
//! tool's own `permission_check`.

use std::collections::HashSet;
use std::path::PathBuf;

/// Base permission mode consulted when no hook and no per-tool rule
/// short-circuits the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Every call proceeds.
    Allow,
    /// Every call is denied.
    Deny,
    /// Per-tool rules apply; otherwise ask the user.
    Ask,
}

/// A tool's own judgment of whether it should proceed, or a hook's
/// override of that judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Proceed.
    Allow,
    /// Refuse.
    Deny,
    /// Defer to the base `permission_mode`/rules/user prompt.
    Ask,
}

/// Session-scoped permission state. Cheap to clone; intended to live
/// behind a lock in the executor and be mutated by the UI layer.
#[derive(Debug, Clone)]
pub struct ToolUsePermissionContext {
    /// The base mode.
    pub mode: PermissionMode,
    /// Per-tool names that are always allowed without asking.
    pub always_allow_rules: HashSet<String>,
    /// Per-tool names that are always denied.
    pub always_deny_rules: HashSet<String>,
    /// Directories outside the workspace root that tools may touch
    /// without triggering approval.
    pub additional_working_directories: HashSet<PathBuf>,
}

impl Default for ToolUsePermissionContext {
    fn default() -> Self {
        Self {
            mode: PermissionMode::Ask,
            always_allow_rules: HashSet::new(),
            always_deny_rules: HashSet::new(),
            additional_working_directories: HashSet::new(),
        }
    }
}

impl ToolUsePermissionContext {
    /// Create a context with the given base mode.
    #[must_use]
    pub fn new(mode: PermissionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Always allow `tool_name` without asking.
    pub fn allow_tool(&mut self, tool_name: impl Into<String>) {
        self.always_allow_rules.insert(tool_name.into());
    }

    /// Always deny `tool_name`.
    pub fn deny_tool(&mut self, tool_name: impl Into<String>) {
        self.always_deny_rules.insert(tool_name.into());
    }

    /// Resolve the base decision for `tool_name`, per spec.md §4.4 step 4
    /// ("otherwise apply base `permission_mode`"). Does not consult hooks
    /// or the tool's own `permission_check` — those are layered on by the
    /// executor.
    #[must_use]
    pub fn resolve_base(&self, tool_name: &str) -> PermissionDecision {
        match self.mode {
            PermissionMode::Allow => PermissionDecision::Allow,
            PermissionMode::Deny => PermissionDecision::Deny,
            PermissionMode::Ask => {
                if self.always_allow_rules.contains(tool_name) {
                    PermissionDecision::Allow
                } else if self.always_deny_rules.contains(tool_name) {
                    PermissionDecision::Deny
                } else {
                    PermissionDecision::Ask
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_mode_always_allows() {
        let ctx = ToolUsePermissionContext::new(PermissionMode::Allow);
        assert_eq!(ctx.resolve_base("bash"), PermissionDecision::Allow);
    }

    #[test]
    fn deny_mode_always_denies() {
        let ctx = ToolUsePermissionContext::new(PermissionMode::Deny);
        assert_eq!(ctx.resolve_base("bash"), PermissionDecision::Deny);
    }

    #[test]
    fn ask_mode_falls_through_to_rules() {
        let mut ctx = ToolUsePermissionContext::new(PermissionMode::Ask);
        ctx.allow_tool("read_file");
        ctx.deny_tool("bash");

        assert_eq!(ctx.resolve_base("read_file"), PermissionDecision::Allow);
        assert_eq!(ctx.resolve_base("bash"), PermissionDecision::Deny);
        assert_eq!(ctx.resolve_base("glob"), PermissionDecision::Ask);
    }
}
