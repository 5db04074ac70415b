//! Conversation message and content block types.

use serde::{Deserialize, Serialize};

/// Who produced a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user, or a tool_result fed back into the conversation.
    User,
    /// The LLM.
    Assistant,
    /// System prompt content (kept out of the transcript proper; present
    /// for completeness of the role enum named in the data model).
    System,
}

/// Token usage counters. Appears on assistant messages and is accumulated
/// at the conversation level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed by the request that produced this message.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_creation_tokens: u64,
    /// Tokens read from the prompt cache.
    pub cache_read_tokens: u64,
}

impl Usage {
    /// Merge another usage reading into this one (used when message_delta
    /// events carry partial usage updates during streaming).
    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
    }
}

/// A single block within a message's `content` list.
///
/// Tagged on `type` to match the wire shape tool-use deltas reassemble
/// into and the wire shape a provider round-trips back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An inline image.
    Image {
        /// MIME type, e.g. `image/png`.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// An inline document (e.g. PDF).
    Document {
        /// MIME type.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// A request by the assistant to invoke a tool.
    ToolUse {
        /// Unique id for this tool invocation, referenced by the matching
        /// `tool_result`.
        id: String,
        /// Tool name.
        name: String,
        /// Tool input. Reassembled from streamed partial JSON; kept as the
        /// raw string when parsing fails so a best-effort value is never
        /// silently dropped.
        input: serde_json::Value,
    },
    /// The result of executing a `tool_use` block, fed back as part of a
    /// user-role message.
    ToolResult {
        /// The `id` of the `tool_use` block this result answers.
        tool_use_id: String,
        /// Tool output, or an error description.
        content: String,
        /// Whether `content` describes an error.
        is_error: bool,
    },
    /// Extended thinking output.
    Thinking {
        /// The thinking text.
        text: String,
    },
}

impl ContentBlock {
    /// Build a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build a tool_use block.
    #[must_use]
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Build a tool_result block.
    #[must_use]
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }

    /// The `tool_use_id` this block carries, if it is a tool_use or
    /// tool_result block.
    #[must_use]
    pub fn tool_use_id(&self) -> Option<&str> {
        match self {
            Self::ToolUse { id, .. } => Some(id),
            Self::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            _ => None,
        }
    }

    /// The text content, if this is a text block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// One element of a [`Conversation`](crate::Conversation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// Token usage, present on assistant messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Extended thinking text, present on assistant messages only. Mirrors
    /// any `Thinking` content block for callers that want it without
    /// scanning `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl Message {
    /// Build a plain user text message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
            usage: None,
            thinking: None,
        }
    }

    /// Build an assistant text message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
            usage: None,
            thinking: None,
        }
    }

    /// Build a user-role message carrying a single tool_result block, the
    /// shape C5 appends after awaiting C4.
    #[must_use]
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::tool_result(tool_use_id, content, is_error)],
            usage: None,
            thinking: None,
        }
    }

    /// All `tool_use` blocks in this message.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
            _ => None,
        })
    }

    /// The first text block's content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_use_id_round_trips_both_variants() {
        let use_block = ContentBlock::tool_use("t1", "Bash", serde_json::json!({"command": "ls"}));
        assert_eq!(use_block.tool_use_id(), Some("t1"));

        let result_block = ContentBlock::tool_result("t1", "ok", false);
        assert_eq!(result_block.tool_use_id(), Some("t1"));

        assert_eq!(ContentBlock::text("hi").tool_use_id(), None);
    }

    #[test]
    fn message_tool_uses_iterates_only_tool_use_blocks() {
        let msg = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::text("thinking out loud"),
                ContentBlock::tool_use("t1", "Bash", serde_json::json!({})),
                ContentBlock::tool_use("t2", "Grep", serde_json::json!({})),
            ],
            usage: None,
            thinking: None,
        };

        let names: Vec<&str> = msg.tool_uses().map(|(_, name, _)| name).collect();
        assert_eq!(names, vec!["Bash", "Grep"]);
    }

    #[test]
    fn usage_merge_accumulates() {
        let mut a = Usage {
            input_tokens: 10,
            output_tokens: 5,
            ..Default::default()
        };
        let b = Usage {
            output_tokens: 7,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.output_tokens, 12);
        assert_eq!(a.input_tokens, 10);
    }
}
