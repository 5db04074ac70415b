//! Streaming event vocabulary emitted by a [`crate::provider::LlmProvider`],
//! matching the event table in spec.md §4.5. Grounded on
//! `astrid-llm::types::StreamEvent`, generalized with the `thinking`
//! accumulator and cache-control bookkeeping the distilled teacher type
//! didn't carry.

use serde_json::Value;

use hearth_core::Usage;

/// One parsed SSE event from the LLM wire protocol.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// `content_block_start{type=text}` — open a text accumulator.
    TextBlockStart,
    /// `content_block_start{type=thinking}` — open a thinking accumulator.
    ThinkingBlockStart,
    /// `content_block_start{type=tool_use, id, name}` — open a tool-use
    /// accumulator with an empty JSON input buffer.
    ToolUseBlockStart {
        /// Tool-use id, referenced by later deltas and the matching
        /// `tool_result`.
        id: String,
        /// Tool name.
        name: String,
    },
    /// `content_block_delta{text}` — append to the current text
    /// accumulator.
    TextDelta(String),
    /// `content_block_delta{thinking}` — append to the current thinking
    /// accumulator.
    ThinkingDelta(String),
    /// `content_block_delta{partial_json}` — append to the current
    /// tool-use JSON buffer.
    ToolUseJsonDelta {
        /// The tool-use id this delta belongs to.
        id: String,
        /// Raw partial JSON fragment.
        partial_json: String,
    },
    /// `content_block_stop` — close the current accumulator. Carries the
    /// final parsed tool input when the closed block was a tool_use block
    /// (`None` for text/thinking blocks).
    BlockStop {
        /// Parsed (or raw-string-fallback) tool input, if this closed a
        /// tool_use block.
        tool_input: Option<Value>,
    },
    /// `message_delta{usage}` — merge usage counters.
    UsageDelta(Usage),
    /// `message_stop` — the assembled assistant message is complete.
    MessageStop,
    /// `error` — raise as retryable/non-retryable per C2.
    Error(hearth_core::HearthError),
    /// `[DONE]` sentinel; the stream is exhausted.
    Done,
}
