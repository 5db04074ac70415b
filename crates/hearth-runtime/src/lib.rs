#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! The conversation engine (C5), token accountant and compactor (C6), and
//! agent orchestrator (C7), plus the executor that wires the hook runner
//! (C3) and tool registry (C4) together under one cancellation domain.

mod accountant;
mod config;
mod engine;
mod executor;
mod orchestrator;

pub use accountant::{
    classify_pressure, compact, estimate_block, estimate_conversation, estimate_message, estimate_text, price_per_1k,
    usage_to_usd, CompactionReport, Pressure, AUTO_COMPACT_THRESHOLD, COMPACTION_TARGET, DEFAULT_KEEP_RECENT_COUNT,
    HARD_WARN_THRESHOLD,
};
pub use config::RuntimeConfig;
pub use engine::ConversationEngine;
pub use executor::{
    ExecutingEntry, ExecutingStatus, HookContextFields, NeverPrompt, PermissionPrompt, ToolExecutor, ToolOutcome,
    DEFAULT_MAX_CONCURRENT, PERMISSION_PROMPT_TIMEOUT,
};
pub use orchestrator::{AgentLaunch, AgentOrchestrator, AgentProfile, AgentTelemetry, BUILTIN_AGENT_PROFILES};
