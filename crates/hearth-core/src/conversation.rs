//! The ordered message history plus tool-use bookkeeping for one session.

use std::collections::HashSet;

use uuid::Uuid;

use crate::message::{Message, Role, Usage};

/// The ordered message history plus associated state for one agent session.
///
/// Invariants (enforced by the mutating methods, never by external callers
/// reaching into the sets directly): `in_progress`, `errored`, and
/// `resolved` are pairwise disjoint, and every id in any of the three sets
/// names a `tool_use` block present in some assistant message already
/// appended to `messages`.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Stable identifier, used for telemetry correlation.
    pub id: Uuid,
    messages: Vec<Message>,
    token_usage: Usage,
    in_progress: HashSet<String>,
    errored: HashSet<String>,
    resolved: HashSet<String>,
}

impl Conversation {
    /// Start a new, empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            token_usage: Usage::default(),
            in_progress: HashSet::new(),
            errored: HashSet::new(),
            resolved: HashSet::new(),
        }
    }

    /// Read-only view of the transcript.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Accumulated token usage across the conversation.
    #[must_use]
    pub fn token_usage(&self) -> Usage {
        self.token_usage
    }

    /// Ids of `tool_use` blocks awaiting a result.
    #[must_use]
    pub fn in_progress_tool_use_ids(&self) -> &HashSet<String> {
        &self.in_progress
    }

    /// Ids of `tool_use` blocks whose result was an error (including
    /// synthetic cancellation results).
    #[must_use]
    pub fn errored_tool_use_ids(&self) -> &HashSet<String> {
        &self.errored
    }

    /// Ids of `tool_use` blocks that received a successful result.
    #[must_use]
    pub fn resolved_tool_use_ids(&self) -> &HashSet<String> {
        &self.resolved
    }

    /// Append an assistant message, registering every `tool_use` block it
    /// carries as in-progress, and merging any usage it reports.
    pub fn append_assistant_message(&mut self, message: Message) {
        debug_assert!(message.role == Role::Assistant);
        if let Some(usage) = message.usage {
            self.token_usage.merge(&usage);
        }
        for (id, _name, _input) in message.tool_uses() {
            self.in_progress.insert(id.to_string());
        }
        self.messages.push(message);
    }

    /// Append a plain message (user input, or a non-tool-result user
    /// message) without touching the tool-use sets.
    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a `tool_result` message, moving the matching id from
    /// `in_progress` to `resolved` or `errored`.
    pub fn append_tool_result(&mut self, tool_use_id: &str, content: impl Into<String>, is_error: bool) {
        let message = Message::tool_result(tool_use_id, content, is_error);
        self.resolve(tool_use_id, is_error);
        self.messages.push(message);
    }

    /// Move an id out of `in_progress` into `resolved` or `errored`
    /// without appending a message — used by the cancellation path, which
    /// assigns a synthetic result separately.
    pub fn resolve(&mut self, tool_use_id: &str, is_error: bool) {
        self.in_progress.remove(tool_use_id);
        if is_error {
            self.errored.insert(tool_use_id.to_string());
        } else {
            self.resolved.insert(tool_use_id.to_string());
        }
    }

    /// On cancellation: every `tool_use` id still in progress is moved to
    /// `errored_tool_use_ids`. Callers are responsible for appending the
    /// corresponding synthetic `tool_result` messages (`is_error=true,
    /// content="cancelled"`) for each id this returns.
    pub fn cancel_in_progress(&mut self) -> Vec<String> {
        let ids: Vec<String> = self.in_progress.drain().collect();
        for id in &ids {
            self.errored.insert(id.clone());
        }
        ids
    }

    /// Replace the transcript in place. Used by compaction, which drops,
    /// coalesces, or summarises historical messages. The three tool-use id
    /// sets and token usage are untouched: they track correctness across
    /// the conversation's lifetime, not which messages are still
    /// materialized in `messages`.
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Empty the conversation: messages and all three tool-use sets reset,
    /// token counters reset.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.token_usage = Usage::default();
        self.in_progress.clear();
        self.errored.clear();
        self.resolved.clear();
    }

    /// Whether the three tool-use sets are pairwise disjoint. Exposed for
    /// tests and debug assertions; true by construction in all mutating
    /// paths above.
    #[must_use]
    pub fn sets_are_disjoint(&self) -> bool {
        self.in_progress.is_disjoint(&self.errored)
            && self.in_progress.is_disjoint(&self.resolved)
            && self.errored.is_disjoint(&self.resolved)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ContentBlock;

    fn assistant_with_tool_use(id: &str) -> Message {
        Message {
            role: Role::Assistant,
            content: vec![ContentBlock::tool_use(id, "Bash", serde_json::json!({}))],
            usage: None,
            thinking: None,
        }
    }

    #[test]
    fn tool_use_moves_from_in_progress_to_resolved() {
        let mut conv = Conversation::new();
        conv.append_assistant_message(assistant_with_tool_use("t1"));
        assert!(conv.in_progress_tool_use_ids().contains("t1"));

        conv.append_tool_result("t1", "a.txt\nb.txt\n", false);
        assert!(!conv.in_progress_tool_use_ids().contains("t1"));
        assert!(conv.resolved_tool_use_ids().contains("t1"));
        assert!(conv.sets_are_disjoint());
    }

    #[test]
    fn cancellation_moves_in_progress_to_errored() {
        let mut conv = Conversation::new();
        conv.append_assistant_message(assistant_with_tool_use("t1"));
        conv.append_assistant_message(assistant_with_tool_use("t2"));

        let cancelled = conv.cancel_in_progress();
        assert_eq!(cancelled.len(), 2);
        assert!(conv.in_progress_tool_use_ids().is_empty());
        assert!(conv.errored_tool_use_ids().contains("t1"));
        assert!(conv.errored_tool_use_ids().contains("t2"));
        assert!(conv.sets_are_disjoint());
    }

    #[test]
    fn clear_resets_everything() {
        let mut conv = Conversation::new();
        conv.append_assistant_message(assistant_with_tool_use("t1"));
        conv.append_message(Message::user("hi"));
        conv.clear();
        assert!(conv.messages().is_empty());
        assert!(conv.in_progress_tool_use_ids().is_empty());
    }
}
