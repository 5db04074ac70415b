//! C7: the three built-in agent profiles, and launching an agent
//! conversation restricted to its tool whitelist.
//!
//! Grounded on the launch/builder shape of
//! `astrid-runtime::subagent_executor::SubAgentExecutor::spawn` (pool slot,
//! child session with a task-specific system prompt, timeout-vs-
//! cancellation race), replacing the teacher's capability/budget
//! inheritance with spec.md §4.7's simpler per-agent tool whitelist and
//! independent cancellation token.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use hearth_core::{Conversation, HearthResult};
use hearth_llm::ToolDefinition;
use hearth_tools::{PermissionMode, ToolContext, ToolRegistry, ToolUsePermissionContext};

use crate::engine::ConversationEngine;

/// One built-in agent profile (spec.md §4.7's literal table).
#[derive(Debug, Clone, Copy)]
pub struct AgentProfile {
    /// Profile name, matched against the `agent_type` a caller launches.
    pub name: &'static str,
    /// One-line purpose, folded into the agent's system prompt.
    pub purpose: &'static str,
    /// Tool names this agent may use; `["*"]` means every registered tool.
    pub allowed_tools: &'static [&'static str],
}

/// The three built-in agent profiles.
pub const BUILTIN_AGENT_PROFILES: &[AgentProfile] = &[
    AgentProfile {
        name: "general-purpose",
        purpose: "research, multi-step tasks",
        allowed_tools: &["*"],
    },
    AgentProfile {
        name: "output-style-setup",
        purpose: "author a markdown-with-front-matter style file",
        allowed_tools: &["read_file", "write_file", "edit_file", "glob", "grep"],
    },
    AgentProfile {
        name: "statusline-setup",
        purpose: "convert shell PS1 into a statusLine command",
        allowed_tools: &["read_file", "edit_file"],
    },
];

fn profile_by_name(name: &str) -> Option<&'static AgentProfile> {
    BUILTIN_AGENT_PROFILES.iter().find(|p| p.name == name)
}

/// Telemetry emitted on agent start/end (spec.md §4.7 "Telemetry").
#[derive(Debug, Clone)]
pub struct AgentTelemetry {
    /// The launched conversation's id.
    pub conversation_id: uuid::Uuid,
    /// The agent profile used.
    pub agent_type: String,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Total messages in the final transcript.
    pub message_count: usize,
    /// Total tool_use blocks issued.
    pub tool_use_count: usize,
    /// Aggregate token usage across the run.
    pub usage: hearth_core::Usage,
}

/// Outcome of [`AgentOrchestrator::launch`].
pub struct AgentLaunch {
    /// The agent's finished conversation.
    pub conversation: Conversation,
    /// Start/end telemetry for this run.
    pub telemetry: AgentTelemetry,
    /// The engine result: `Err` only for a non-retryable LLM failure or a
    /// `UserPromptSubmit` hook denial.
    pub result: HearthResult<()>,
}

/// Launches agent conversations restricted to their profile's tool
/// whitelist. Parallel agents share the tool registry (tools are
/// reentrant) and the hook registry, but each gets its own conversation
/// state and cancellation token (spec.md §4.7 "Parallel agents").
pub struct AgentOrchestrator {
    engine: Arc<ConversationEngine>,
    tool_registry: Arc<ToolRegistry>,
    workspace_root: PathBuf,
    active_count: AtomicUsize,
    max_concurrent: usize,
}

impl AgentOrchestrator {
    /// Build an orchestrator over a shared engine and tool registry, rooted
    /// at `workspace_root` for every agent's tool calls.
    #[must_use]
    pub fn new(engine: Arc<ConversationEngine>, tool_registry: Arc<ToolRegistry>, workspace_root: PathBuf, max_concurrent: usize) -> Self {
        Self {
            engine,
            tool_registry,
            workspace_root,
            active_count: AtomicUsize::new(0),
            max_concurrent,
        }
    }

    /// Number of agent conversations currently running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Launch `agent_type` on `task`, composing its system prompt and
    /// permission predicate, then running its conversation to completion.
    ///
    /// `context` is free-form text folded into the initial user message
    /// (e.g. the parent conversation's relevant excerpt).
    ///
    /// # Errors
    ///
    /// Returns an error immediately if `agent_type` doesn't name a known
    /// profile, or if already at `max_concurrent` active agents.
    pub async fn launch(&self, agent_type: &str, task: &str, context: Option<&str>, cancel: CancellationToken) -> Result<AgentLaunch, String> {
        let profile = profile_by_name(agent_type).ok_or_else(|| format!("unknown agent profile: {agent_type}"))?;

        if self.active_count.load(Ordering::SeqCst) >= self.max_concurrent {
            return Err(format!("max_concurrent_subagents ({}) reached", self.max_concurrent));
        }
        self.active_count.fetch_add(1, Ordering::SeqCst);

        let start = Instant::now();
        let mut conversation = Conversation::new();
        let conversation_id = conversation.id;

        let system_prompt = format!(
            "You are a focused sub-agent. Your purpose: {}\n\nComplete the given task and provide a clear, concise result.",
            profile.purpose
        );
        let initial_message = match context {
            Some(ctx) if !ctx.is_empty() => format!("{ctx}\n\n{task}"),
            _ => task.to_string(),
        };

        let permission_ctx = self.build_permission_context(profile);
        let tools = self.build_tool_definitions(profile);
        let tool_ctx = ToolContext::new(self.workspace_root.clone());

        let result = self
            .engine
            .run_turn(&mut conversation, &initial_message, &system_prompt, tools, &tool_ctx, &permission_ctx, &cancel)
            .await;

        self.active_count.fetch_sub(1, Ordering::SeqCst);

        let duration = start.elapsed();
        let message_count = conversation.messages().len();
        let tool_use_count = conversation
            .messages()
            .iter()
            .map(|m| m.tool_uses().count())
            .sum();
        let usage = conversation.token_usage();

        let telemetry = AgentTelemetry {
            conversation_id,
            agent_type: agent_type.to_string(),
            duration,
            message_count,
            tool_use_count,
            usage,
        };

        info!(
            conversation_id = %telemetry.conversation_id,
            agent_type = %telemetry.agent_type,
            duration_ms = telemetry.duration.as_millis() as u64,
            message_count = telemetry.message_count,
            tool_use_count = telemetry.tool_use_count,
            "agent run finished"
        );

        Ok(AgentLaunch { conversation, telemetry, result })
    }

    fn build_permission_context(&self, profile: &AgentProfile) -> ToolUsePermissionContext {
        if profile.allowed_tools.contains(&"*") {
            return ToolUsePermissionContext::new(PermissionMode::Allow);
        }
        // `resolve_base` only consults `always_allow_rules`/`always_deny_rules`
        // under `Ask`, so every registered tool must land in exactly one of
        // those sets for the whitelist to be load-bearing: the whitelisted
        // tools resolve to `Allow`, everything else to `Deny`, and nothing is
        // left to fall through to an interactive prompt.
        let mut ctx = ToolUsePermissionContext::new(PermissionMode::Ask);
        for name in self.tool_registry.tool_names() {
            if profile.allowed_tools.contains(&name) {
                ctx.allow_tool(name.to_string());
            } else {
                ctx.deny_tool(name.to_string());
            }
        }
        ctx
    }

    fn build_tool_definitions(&self, profile: &AgentProfile) -> Vec<ToolDefinition> {
        self.tool_registry
            .all_definitions()
            .into_iter()
            .filter(|(name, _, _)| profile.allowed_tools.contains(&"*") || profile.allowed_tools.contains(&name.as_str()))
            .map(|(name, description, input_schema)| ToolDefinition { name, description, input_schema })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_match_the_spec_table() {
        assert_eq!(BUILTIN_AGENT_PROFILES.len(), 3);
        let general = profile_by_name("general-purpose").unwrap();
        assert_eq!(general.allowed_tools, &["*"]);

        let statusline = profile_by_name("statusline-setup").unwrap();
        assert_eq!(statusline.allowed_tools, &["read_file", "edit_file"]);
    }

    #[test]
    fn unknown_profile_name_resolves_to_none() {
        assert!(profile_by_name("does-not-exist").is_none());
    }
}
