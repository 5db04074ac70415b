//! The eight hook lifecycle events (spec.md §3).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A hook lifecycle event. Each carries a different "match value" used by
/// the matcher grammar (see `crate::matcher`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    /// Fires before a tool executes. Match value: the tool name.
    PreToolUse,
    /// Fires after a tool completes. Match value: the tool name.
    PostToolUse,
    /// Fires when the user submits a prompt. No natural match value.
    UserPromptSubmit,
    /// Fires on session start. Match value: the session source.
    SessionStart,
    /// Fires on session end. No natural match value.
    SessionEnd,
    /// Fires before compaction. Match value: the compaction trigger.
    PreCompact,
    /// Fires on UI notifications. No natural match value.
    Notification,
    /// Fires when the main loop stops. No natural match value.
    Stop,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::PreCompact => "PreCompact",
            Self::Notification => "Notification",
            Self::Stop => "Stop",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant_name() {
        assert_eq!(HookEvent::PreToolUse.to_string(), "PreToolUse");
        assert_eq!(HookEvent::PreCompact.to_string(), "PreCompact");
    }
}
