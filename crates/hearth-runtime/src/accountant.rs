//! C6: token estimation, pressure thresholds, compaction, and cost
//! calculation.
//!
//! No direct teacher source file was retrieved for this component (the
//! teacher declares `context.rs` in its `lib.rs` but the file itself isn't
//! in the pack); the numeric-heuristic style follows
//! `astrid-runtime::runtime::mod.rs::tokens_to_usd`, and the compaction
//! ordering follows the three-step algorithm named directly in spec.md
//! §4.6.

use futures::StreamExt;
use serde_json::json;
use tracing::info;

use hearth_core::{ContentBlock, Conversation, Message, Role, Usage};
use hearth_hooks::{run_event, AsyncHookRegistry, HookDefinition, HookEvent};
use hearth_llm::{LlmProvider, RequestSpec, StreamEvent};

use crate::executor::{build_hook_context_json, HookContextFields};

/// Fraction of the context window at which auto-compaction triggers.
pub const AUTO_COMPACT_THRESHOLD: f64 = 0.75;
/// Fraction of the context window at which a hard warning is raised.
pub const HARD_WARN_THRESHOLD: f64 = 0.90;
/// Compaction runs until the estimate is back under this fraction.
pub const COMPACTION_TARGET: f64 = 0.50;
/// Default number of trailing messages compaction never touches.
pub const DEFAULT_KEEP_RECENT_COUNT: usize = 10;
/// Minimum run length of adjacent non-error tool_results eligible for
/// coalescing.
const COALESCE_RUN_LENGTH: usize = 3;

/// Fallback input/output price per 1K tokens, matching the teacher's
/// `INPUT_RATE_PER_1K`/`OUTPUT_RATE_PER_1K` constants.
const DEFAULT_INPUT_RATE_PER_1K: f64 = 0.003;
const DEFAULT_OUTPUT_RATE_PER_1K: f64 = 0.015;

/// Per-model price, in USD per 1000 tokens. Unlisted models fall back to
/// [`DEFAULT_INPUT_RATE_PER_1K`]/[`DEFAULT_OUTPUT_RATE_PER_1K`].
#[must_use]
pub fn price_per_1k(model: &str) -> (f64, f64) {
    match model {
        "claude-3-5-haiku-20241022" | "claude-3-haiku-20240307" => (0.0008, 0.004),
        "claude-3-opus-20240229" => (0.015, 0.075),
        _ => (DEFAULT_INPUT_RATE_PER_1K, DEFAULT_OUTPUT_RATE_PER_1K),
    }
}

/// Convert tallied usage counters into a USD cost estimate for `model`.
#[must_use]
pub fn usage_to_usd(usage: Usage, model: &str) -> f64 {
    let (input_rate, output_rate) = price_per_1k(model);
    (usage.input_tokens as f64 / 1000.0) * input_rate + (usage.output_tokens as f64 / 1000.0) * output_rate
}

/// Heuristic token estimate for a span of text:
/// `max(ceil(words * 1.3), ceil(chars / 4))`. Never use for billing.
#[must_use]
pub fn estimate_text(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    let chars = text.chars().count();
    let by_words = ((words as f64) * 1.3).ceil() as u64;
    let by_chars = ((chars as f64) / 4.0).ceil() as u64;
    by_words.max(by_chars)
}

/// Heuristic token estimate for one content block, including its overhead.
#[must_use]
pub fn estimate_block(block: &ContentBlock) -> u64 {
    match block {
        ContentBlock::Text { text } | ContentBlock::Thinking { text } => estimate_text(text),
        ContentBlock::ToolUse { input, .. } => {
            let schema_len = serde_json::to_string(input).map(|s| s.len()).unwrap_or(0);
            10 + (schema_len as u64).div_ceil(4)
        },
        ContentBlock::ToolResult { content, .. } => 5 + estimate_text(content),
        ContentBlock::Image { .. } => 765,
        ContentBlock::Document { data, .. } => (data.len() as u64).div_ceil(50_000) * 1000,
    }
}

/// Heuristic token estimate for a whole message: its blocks plus the
/// message-wrapper overhead of 4.
#[must_use]
pub fn estimate_message(message: &Message) -> u64 {
    message.content.iter().map(estimate_block).sum::<u64>() + 4
}

/// Heuristic token estimate for a full transcript.
#[must_use]
pub fn estimate_conversation(messages: &[Message]) -> u64 {
    messages.iter().map(estimate_message).sum()
}

/// Token-pressure classification against a model's context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    /// Below the auto-compact threshold.
    Normal,
    /// At or above 75% of the context window.
    AutoCompact,
    /// At or above 90% of the context window.
    HardWarn,
}

/// Classify `estimate` against `context_window`.
#[must_use]
pub fn classify_pressure(estimate: u64, context_window: u64) -> Pressure {
    if context_window == 0 {
        return Pressure::Normal;
    }
    let fraction = estimate as f64 / context_window as f64;
    if fraction >= HARD_WARN_THRESHOLD {
        Pressure::HardWarn
    } else if fraction >= AUTO_COMPACT_THRESHOLD {
        Pressure::AutoCompact
    } else {
        Pressure::Normal
    }
}

/// Outcome of running `compact()`: what each step did, for logging and for
/// the `compaction` telemetry event fired after.
#[derive(Debug, Clone, Default)]
pub struct CompactionReport {
    /// Messages dropped entirely in step 1.
    pub dropped: usize,
    /// Runs of tool_results coalesced into one block in step 2.
    pub coalesced_runs: usize,
    /// Whether step 3's secondary summarisation call ran.
    pub summarized: bool,
    /// Token estimate before compaction.
    pub before_estimate: u64,
    /// Token estimate after compaction.
    pub after_estimate: u64,
}

fn is_droppable_tool_result(message: &Message) -> bool {
    message.role == Role::User
        && message.content.len() == 1
        && matches!(message.content[0], ContentBlock::ToolResult { is_error: false, .. })
}

/// Run the three-step compaction algorithm against `conversation` until its
/// estimate is under [`COMPACTION_TARGET`] of `context_window`, or until no
/// step makes further progress. Fires `PreCompact` hooks before step 1 and
/// logs a `compaction` telemetry event after.
///
/// `summarizer` is used for step 3's secondary LLM call; its `model()` and
/// `stream()` are the only methods invoked. `fields`/`trigger` feed the
/// `PreCompact` hook's context JSON (spec.md §6): `trigger` is `"auto"` or
/// `"manual"` depending on who initiated compaction.
#[allow(clippy::too_many_arguments)]
pub async fn compact(
    conversation: &mut Conversation,
    pretool_hooks: &[HookDefinition],
    async_hooks: &AsyncHookRegistry,
    summarizer: &dyn LlmProvider,
    context_window: u64,
    keep_recent_count: usize,
    fields: &HookContextFields,
    trigger: &str,
) -> CompactionReport {
    let before_estimate = estimate_conversation(conversation.messages());
    let target = (context_window as f64 * COMPACTION_TARGET) as u64;

    let context_json = build_hook_context_json(HookEvent::PreCompact, fields, json!({"trigger": trigger}));
    run_event(pretool_hooks, &context_json, None, true, async_hooks).await;

    let mut messages = conversation.messages().to_vec();
    let mut report = CompactionReport {
        before_estimate,
        ..CompactionReport::default()
    };

    // Step 1: drop low-importance historical messages. `recent_start` is
    // recomputed each pass since it shrinks as messages are removed.
    let mut idx = 0;
    while estimate_conversation(&messages) > target {
        let recent_start = messages.len().saturating_sub(keep_recent_count);
        if idx >= recent_start {
            break;
        }
        if is_droppable_tool_result(&messages[idx]) {
            messages.remove(idx);
            report.dropped += 1;
        } else {
            idx += 1;
        }
    }

    // Step 2: coalesce runs of >= 3 adjacent non-error tool_results.
    if estimate_conversation(&messages) > target {
        let mut coalesced = Vec::with_capacity(messages.len());
        let mut idx = 0;
        while idx < messages.len() {
            if is_droppable_tool_result(&messages[idx]) {
                let run_start = idx;
                while idx < messages.len() && is_droppable_tool_result(&messages[idx]) {
                    idx += 1;
                }
                let run_len = idx - run_start;
                if run_len >= COALESCE_RUN_LENGTH {
                    coalesced.push(Message::tool_result(
                        "coalesced",
                        format!("[{run_len} tool results coalesced]"),
                        false,
                    ));
                    report.coalesced_runs += 1;
                } else {
                    coalesced.extend_from_slice(&messages[run_start..idx]);
                }
            } else {
                coalesced.push(messages[idx].clone());
                idx += 1;
            }
        }
        messages = coalesced;
    }

    // Step 3: secondary LLM summarisation over the first half of history.
    if estimate_conversation(&messages) > target && messages.len() > 1 {
        let half = messages.len() / 2;
        let (to_summarize, rest) = messages.split_at(half);
        if let Ok(summary) = summarize_messages(summarizer, to_summarize).await {
            let mut new_messages = vec![Message::assistant(format!("[Earlier conversation summarized]\n{summary}"))];
            new_messages.extend_from_slice(rest);
            messages = new_messages;
            report.summarized = true;
        }
    }

    report.after_estimate = estimate_conversation(&messages);
    conversation.set_messages(messages);

    info!(
        dropped = report.dropped,
        coalesced_runs = report.coalesced_runs,
        summarized = report.summarized,
        before_estimate = report.before_estimate,
        after_estimate = report.after_estimate,
        "compaction"
    );

    report
}

async fn summarize_messages(summarizer: &dyn LlmProvider, messages: &[Message]) -> Result<String, hearth_core::HearthError> {
    let spec = RequestSpec {
        system: "Summarize the following conversation history concisely, preserving any facts or \
                 decisions a continuation would need."
            .to_string(),
        tools: Vec::new(),
    };
    let mut stream = summarizer.stream(messages, &spec).await?;
    let mut summary = String::new();
    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::TextDelta(text) => summary.push_str(&text),
            StreamEvent::Done | StreamEvent::MessageStop => break,
            _ => {},
        }
    }
    Ok(summary)
}
