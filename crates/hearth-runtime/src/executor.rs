//! The C4 tool-executor pipeline: wires the C3 hook runner and the C4
//! tool registry/permission model together under one per-call pipeline.
//!
//! Grounded on `astrid-runtime::runtime::tool_execution.rs::execute_builtin_tool`'s
//! shape (lookup -> permission -> execute -> map -> hooks), replacing the
//! teacher's capability/security interceptor with spec.md §4.4's simpler
//! permission model built from `hearth_hooks`'s PreToolUse/PostToolUse
//! runner and `hearth_tools`'s `ToolUsePermissionContext`.
//!
//! `Tool::permission_check` (spec.md §3) and the base `permission_mode`
//! (spec.md §4.4 step 4) are wired together as follows, a synthesis the
//! spec names both halves of but never states the order of: a hook
//! decision (if any) short-circuits everything; otherwise the base mode
//! resolves to allow/deny directly, or to "ask" falls through to the
//! tool's own `permission_check` (which already reasons about workspace
//! boundaries), and only if *that* itself says "ask" does the executor
//! reach for an interactive prompt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hearth_hooks::{run_event, AsyncHookRegistry, HookEvent, HookRegistry};
use hearth_tools::{
    PermissionDecision as BasePermissionDecision, ToolContext, ToolRegistry, ToolUsePermissionContext,
    DEFAULT_TOOL_TIMEOUT,
};

/// Default max time to wait for an interactive permission prompt response.
pub const PERMISSION_PROMPT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default concurrency-gate poll interval.
const CONCURRENCY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default `max_concurrent` for non-concurrency-safe tools.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// A pluggable sink for interactive permission prompts (the `ask` →
/// `permission:request` path of spec.md §4.4 step 4). `hearth-cli` (or any
/// other frontend) implements this to surface a real prompt; headless
/// callers can use [`NeverPrompt`], which denies immediately.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    /// Ask whether `tool_name` may run with `input`. `None` means no
    /// response was given (including a timeout), which the executor
    /// treats as deny.
    async fn ask(&self, tool_name: &str, input: &Value) -> Option<BasePermissionDecision>;
}

/// Default prompt sink for headless execution: every ask is denied
/// without waiting, since there's no channel to answer it.
pub struct NeverPrompt;

#[async_trait]
impl PermissionPrompt for NeverPrompt {
    async fn ask(&self, _tool_name: &str, _input: &Value) -> Option<BasePermissionDecision> {
        None
    }
}

/// Phase of an in-flight tool call, tracked in the `executing` map (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutingStatus {
    /// Permission/validation/concurrency-gate phase.
    Checking,
    /// `Tool::execute` is running.
    Running,
}

/// Per-call bookkeeping the executor maintains while a tool is in flight.
#[derive(Debug, Clone)]
pub struct ExecutingEntry {
    /// Tool name.
    pub name: String,
    /// When this call was first registered (status = checking).
    pub start_time: Instant,
    /// Current phase.
    pub status: ExecutingStatus,
}

/// Fields common to every hook context object the executor builds (spec.md §6).
#[derive(Debug, Clone)]
pub struct HookContextFields {
    /// Conversation id, serialised as `session_id`.
    pub session_id: String,
    /// Transcript path (best-effort; empty string if none is tracked).
    pub transcript_path: String,
    /// Current working directory.
    pub cwd: String,
    /// The base permission mode in effect (`allow`/`deny`/`ask`).
    pub permission_mode: String,
}

/// Outcome of running one tool call through the full pipeline. Always
/// maps to a `tool_result` content block (spec.md §4.4 failure semantics)
/// except when `cancelled` is set, in which case the engine stops the turn.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// `tool_result.content`.
    pub content: String,
    /// `tool_result.is_error`.
    pub is_error: bool,
    /// Set when the call was aborted via its cancellation token; the
    /// engine must stop the turn rather than continue (spec.md §4.5).
    pub cancelled: bool,
    /// `additionalContext` collected from PreToolUse/PostToolUse hooks,
    /// to be injected as extra content on the next turn.
    pub additional_context: Vec<String>,
}

impl ToolOutcome {
    fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            cancelled: false,
            additional_context: Vec::new(),
        }
    }
}

fn hook_to_base(decision: hearth_hooks::PermissionDecision) -> BasePermissionDecision {
    match decision {
        hearth_hooks::PermissionDecision::Allow => BasePermissionDecision::Allow,
        hearth_hooks::PermissionDecision::Deny => BasePermissionDecision::Deny,
        hearth_hooks::PermissionDecision::Ask => BasePermissionDecision::Ask,
    }
}

/// Wires C3 (hooks) and C4 (tools) together under one cancellation domain
/// (spec.md's phrase for this component). One instance is shared across a
/// conversation's tool calls so the `executing` map and concurrency
/// counter are consistent across concurrent calls.
pub struct ToolExecutor {
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookRegistry>,
    async_hooks: Arc<AsyncHookRegistry>,
    prompt: Arc<dyn PermissionPrompt>,
    executing: DashMap<String, ExecutingEntry>,
    concurrent_count: AtomicUsize,
    max_concurrent: usize,
    shell_prefix: Option<String>,
}

impl ToolExecutor {
    /// Build an executor with the default headless prompt sink and
    /// `max_concurrent = 5`.
    #[must_use]
    pub fn new(tools: Arc<ToolRegistry>, hooks: Arc<HookRegistry>) -> Self {
        Self {
            tools,
            hooks,
            async_hooks: Arc::new(AsyncHookRegistry::new()),
            prompt: Arc::new(NeverPrompt),
            executing: DashMap::new(),
            concurrent_count: AtomicUsize::new(0),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            shell_prefix: std::env::var("CLAUDE_CODE_SHELL_PREFIX").ok(),
        }
    }

    /// Override the interactive permission-prompt sink.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn PermissionPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Override `max_concurrent` for non-concurrency-safe tools.
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Ids of calls currently in flight, for telemetry/debugging.
    #[must_use]
    pub fn executing_ids(&self) -> Vec<String> {
        self.executing.iter().map(|e| e.key().clone()).collect()
    }

    /// Forcibly clear all bookkeeping — used when a conversation is
    /// cancelled and every in-flight call has already been accounted for
    /// via the synthetic `errored_tool_use_ids` path.
    pub fn clear_executing(&self) {
        self.executing.clear();
        self.concurrent_count.store(0, Ordering::SeqCst);
    }

    /// The process-wide async-hook registry this executor's PreToolUse/
    /// PostToolUse hooks register into; the engine polls
    /// `check_async_responses()` on it periodically (spec.md §4.3).
    #[must_use]
    pub fn async_hooks(&self) -> &Arc<AsyncHookRegistry> {
        &self.async_hooks
    }

    /// Run one tool call through the full 10-step pipeline.
    #[allow(clippy::too_many_lines)]
    pub async fn execute(
        &self,
        id: &str,
        tool_name: &str,
        input: Value,
        tool_ctx: &ToolContext,
        permission_ctx: &ToolUsePermissionContext,
        fields: &HookContextFields,
        cancel: &CancellationToken,
    ) -> ToolOutcome {
        // 1. Lookup.
        let Some(tool) = self.tools.get(tool_name) else {
            return ToolOutcome::error(format!("Unknown tool: {tool_name}"));
        };

        // 2. Enabled check.
        if !tool.is_enabled() {
            return ToolOutcome::error(format!("Tool disabled: {tool_name}"));
        }

        // 3. Mark checking.
        self.executing.insert(
            id.to_string(),
            ExecutingEntry {
                name: tool_name.to_string(),
                start_time: Instant::now(),
                status: ExecutingStatus::Checking,
            },
        );

        // 4. Permission resolution.
        let pre_context = self.build_context_json(
            HookEvent::PreToolUse,
            fields,
            json!({"tool_name": tool_name, "tool_input": input}),
        );
        let pre_hooks = self.hooks.hooks_for(HookEvent::PreToolUse, tool_name);
        let pre_effect = run_event(&pre_hooks, &pre_context, self.shell_prefix.as_deref(), true, &self.async_hooks).await;

        let mut additional_context = pre_effect.additional_context.clone();

        let decision = if let Some(hook_decision) = pre_effect.permission {
            hook_to_base(hook_decision)
        } else {
            match permission_ctx.resolve_base(tool_name) {
                BasePermissionDecision::Ask => match tool.permission_check(&input, tool_ctx) {
                    BasePermissionDecision::Ask => {
                        match tokio::time::timeout(PERMISSION_PROMPT_TIMEOUT, self.prompt.ask(tool_name, &input)).await
                        {
                            Ok(Some(decision)) => decision,
                            Ok(None) | Err(_) => BasePermissionDecision::Deny,
                        }
                    },
                    other => other,
                },
                other => other,
            }
        };

        if matches!(decision, BasePermissionDecision::Deny) {
            self.executing.remove(id);
            let reason = pre_effect.reason.unwrap_or_else(|| "policy".to_string());
            return ToolOutcome {
                additional_context,
                ..ToolOutcome::error(format!("Tool use denied: {reason}"))
            };
        }

        // 5. Validation.
        if let Err(msg) = tool.validate_input(&input) {
            self.executing.remove(id);
            return ToolOutcome {
                additional_context,
                ..ToolOutcome::error(format!("Invalid input: {msg}"))
            };
        }

        // 6. Concurrency gate.
        let gated = !tool.is_concurrency_safe();
        if gated {
            loop {
                if self.concurrent_count.load(Ordering::SeqCst) < self.max_concurrent {
                    break;
                }
                if cancel.is_cancelled() {
                    self.executing.remove(id);
                    return ToolOutcome {
                        content: "cancelled".to_string(),
                        is_error: true,
                        cancelled: true,
                        additional_context,
                    };
                }
                tokio::time::sleep(CONCURRENCY_POLL_INTERVAL).await;
            }
            self.concurrent_count.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(mut entry) = self.executing.get_mut(id) {
            entry.status = ExecutingStatus::Running;
        }

        // 7. Execute with timeout, racing the conversation's cancellation token.
        let timeout = tool.timeout().unwrap_or(DEFAULT_TOOL_TIMEOUT);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            res = tokio::time::timeout(timeout, tool.execute(input, tool_ctx)) => Some(res),
        };

        if gated {
            self.concurrent_count.fetch_sub(1, Ordering::SeqCst);
        }
        self.executing.remove(id);

        let (content, is_error, cancelled) = match outcome {
            None => ("cancelled".to_string(), true, true),
            Some(Err(_)) => (format!("Tool timed out after {}s", timeout.as_secs()), true, false),
            Some(Ok(Ok(content))) => (content, false, false),
            Some(Ok(Err(err))) => (err.to_string(), true, false),
        };

        if cancelled {
            return ToolOutcome {
                content,
                is_error,
                cancelled,
                additional_context,
            };
        }

        // 10. PostToolUse hooks (best-effort; never propagated).
        let post_context = self.build_context_json(
            HookEvent::PostToolUse,
            fields,
            json!({"tool_name": tool_name, "tool_result": {"content": content, "is_error": is_error}}),
        );
        let post_hooks = self.hooks.hooks_for(HookEvent::PostToolUse, tool_name);
        let post_effect = run_event(&post_hooks, &post_context, self.shell_prefix.as_deref(), true, &self.async_hooks).await;
        additional_context.extend(post_effect.additional_context);
        if let Some(reason) = post_effect.reason {
            warn!(tool_name, reason, "PostToolUse hook flagged an issue");
        }

        info!(tool_name, is_error, "tool call completed");

        ToolOutcome {
            content,
            is_error,
            cancelled: false,
            additional_context,
        }
    }

    fn build_context_json(&self, event: HookEvent, fields: &HookContextFields, extra: Value) -> String {
        build_hook_context_json(event, fields, extra)
    }
}

/// Build the serialised event context shared by every hook event (spec.md
/// §4.3: `session_id, transcript_path, cwd, permission_mode`, plus
/// event-specific fields merged in via `extra`). Used by both
/// [`ToolExecutor`] and the conversation engine so PreToolUse/PostToolUse
/// and UserPromptSubmit/Stop hooks see the same shape.
pub(crate) fn build_hook_context_json(event: HookEvent, fields: &HookContextFields, extra: Value) -> String {
    let mut map = serde_json::Map::new();
    map.insert("event".to_string(), json!(event.to_string()));
    map.insert("session_id".to_string(), json!(fields.session_id));
    map.insert("transcript_path".to_string(), json!(fields.transcript_path));
    map.insert("cwd".to_string(), json!(fields.cwd));
    map.insert("permission_mode".to_string(), json!(fields.permission_mode));
    if let Value::Object(extra_map) = extra {
        map.extend(extra_map);
    }
    Value::Object(map).to_string()
}
