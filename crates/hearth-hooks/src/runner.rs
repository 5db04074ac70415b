//! The "Runner" half of C3: executes every hook matched for an event and
//! combines their responses into one [`HookEffect`], per spec.md §4.3's
//! effect-interpretation rules.
//!
//! Grounded on `astrid-hooks::executor::HookExecutor::{execute_all,
//! combine_results}`, collapsed from the teacher's four-handler-kind
//! dispatch and per-hook `FailAction` policy down to spec.md's two hook
//! kinds and its stated precedence (block > ask > continue-with-context).

use std::time::{Duration, Instant};

use tracing::warn;
use uuid::Uuid;

use crate::async_hook::{AsyncHook, AsyncHookRegistry};
use crate::command::{self, CommandOutcome};
use crate::definition::HookDefinition;
use crate::event::HookEvent;
use crate::response::{Decision, HookResponse, PermissionDecision};

/// A permission vote contributed by one hook response, before combining
/// across every hook matched for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
    Allow,
    Deny,
    Ask,
}

/// The combined outcome of running every hook matched for one event.
#[derive(Debug, Clone, Default)]
pub struct HookEffect {
    /// `false` if any hook returned `continue = false`.
    pub should_continue: bool,
    /// The combined permission decision, if any hook expressed one.
    /// `None` means no hook had an opinion; the caller falls back to its
    /// own base permission resolution.
    pub permission: Option<PermissionDecision>,
    /// Reason attached to a `Deny`/`Ask` permission, or to a
    /// `should_continue = false` halt.
    pub reason: Option<String>,
    /// `additionalContext` from every hook that supplied one, in
    /// execution order.
    pub additional_context: Vec<String>,
    /// `systemMessage` from every hook that supplied one, in execution
    /// order.
    pub system_messages: Vec<String>,
}

impl HookEffect {
    fn new() -> Self {
        Self {
            should_continue: true,
            ..Self::default()
        }
    }

    fn absorb(&mut self, response: &HookResponse) {
        if !response.should_continue {
            self.should_continue = false;
            if self.reason.is_none() {
                self.reason.clone_from(&response.reason);
            }
        }

        let vote = Self::vote(response);
        if let Some(vote) = vote {
            let should_replace = match (self.permission_vote(), vote) {
                (Some(Vote::Deny), _) => false,
                (_, Vote::Deny) => true,
                (Some(Vote::Ask), _) => false,
                (_, Vote::Ask) => true,
                (None, _) => true,
                _ => false,
            };
            if should_replace {
                self.permission = Some(Self::vote_to_decision(vote));
                if matches!(vote, Vote::Deny | Vote::Ask) {
                    self.reason.clone_from(&response.reason);
                }
            }
        }

        if let Some(ctx) = &response.additional_context {
            self.additional_context.push(ctx.clone());
        }
        if let Some(msg) = &response.system_message {
            self.system_messages.push(msg.clone());
        }
    }

    fn permission_vote(&self) -> Option<Vote> {
        self.permission.map(|d| match d {
            PermissionDecision::Allow => Vote::Allow,
            PermissionDecision::Deny => Vote::Deny,
            PermissionDecision::Ask => Vote::Ask,
        })
    }

    /// `hookSpecificOutput.permissionDecision` overrides the plain
    /// `decision` field; `decision = block` maps to deny, `decision =
    /// approve` maps to allow.
    fn vote(response: &HookResponse) -> Option<Vote> {
        if let Some(pd) = response.permission_decision {
            return Some(match pd {
                PermissionDecision::Allow => Vote::Allow,
                PermissionDecision::Deny => Vote::Deny,
                PermissionDecision::Ask => Vote::Ask,
            });
        }
        match response.decision {
            Some(Decision::Approve) => Some(Vote::Allow),
            Some(Decision::Block) => Some(Vote::Deny),
            None => None,
        }
    }

    fn vote_to_decision(vote: Vote) -> PermissionDecision {
        match vote {
            Vote::Allow => PermissionDecision::Allow,
            Vote::Deny => PermissionDecision::Deny,
            Vote::Ask => PermissionDecision::Ask,
        }
    }
}

/// Run every hook the registry matches for `event`/`match_value`, in
/// order, combining their responses into one [`HookEffect`].
///
/// `context_json` is the serialised event context (spec.md §4.3:
/// `session_id, transcript_path, cwd, permission_mode`, plus
/// event-specific fields), written to each command hook's stdin and
/// passed as-is to callback hooks.
pub async fn run_event(
    hooks: &[HookDefinition],
    context_json: &str,
    shell_prefix: Option<&str>,
    sandboxed: bool,
    async_registry: &AsyncHookRegistry,
) -> HookEffect {
    let mut effect = HookEffect::new();

    let context_value: serde_json::Value =
        serde_json::from_str(context_json).unwrap_or(serde_json::Value::Null);

    for hook in hooks {
        match &hook.hook_type {
            crate::definition::HookType::Command { command } => {
                let wrapped = command::apply_shell_prefix(shell_prefix, command);
                let timeout = Duration::from_secs(hook.timeout_seconds);
                match command::run(&wrapped, context_json, timeout, sandboxed).await {
                    CommandOutcome::Completed { response, stdout, exit_code } => {
                        if exit_code.is_some_and(|code| code != 0) {
                            warn!(command = %wrapped, ?exit_code, "hook command exited non-zero; using its response anyway");
                        }
                        if response.is_async {
                            async_registry.register(AsyncHook {
                                id: Uuid::new_v4(),
                                process_id: None,
                                event: hook.event,
                                tool_name: match hook.event {
                                    HookEvent::PreToolUse | HookEvent::PostToolUse => {
                                        Some(hook.matcher.clone())
                                    },
                                    _ => None,
                                },
                                command: Some(command.clone()),
                                start_time: Instant::now(),
                                timeout: response
                                    .async_timeout
                                    .map(Duration::from_millis)
                                    .unwrap_or(timeout),
                                stdout_buffer: stdout,
                                response_attachment_sent: false,
                            });
                        } else {
                            effect.absorb(&response);
                        }
                    },
                    CommandOutcome::SpawnFailed { stderr } => {
                        warn!(command = %wrapped, stderr = %stderr, "hook command failed to spawn");
                    },
                    CommandOutcome::TimedOut => {
                        warn!(command = %wrapped, timeout_seconds = hook.timeout_seconds, "hook command timed out");
                    },
                }
            },
            crate::definition::HookType::Callback(callback) => match callback(&context_value) {
                Ok(response) => effect.absorb(&response),
                Err(err) => warn!(error = %err, "callback hook failed"),
            },
        }
    }

    effect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::HookDefinition;

    fn hook(event: HookEvent, command: &str) -> HookDefinition {
        HookDefinition::command(event, "*", command)
    }

    #[tokio::test]
    async fn block_takes_precedence_over_allow() {
        let hooks = vec![
            hook(HookEvent::PreToolUse, r#"echo '{"decision": "approve"}'"#),
            hook(HookEvent::PreToolUse, r#"echo '{"decision": "block", "reason": "no"}'"#),
        ];
        let registry = AsyncHookRegistry::new();
        let effect = run_event(&hooks, "{}", None, false, &registry).await;
        assert_eq!(effect.permission, Some(PermissionDecision::Deny));
        assert_eq!(effect.reason.as_deref(), Some("no"));
    }

    #[tokio::test]
    async fn hook_specific_output_overrides_plain_decision() {
        let hooks = vec![hook(
            HookEvent::PreToolUse,
            r#"echo '{"decision": "approve", "hookSpecificOutput": {"permissionDecision": "ask"}}'"#,
        )];
        let registry = AsyncHookRegistry::new();
        let effect = run_event(&hooks, "{}", None, false, &registry).await;
        assert_eq!(effect.permission, Some(PermissionDecision::Ask));
    }

    #[tokio::test]
    async fn continue_false_halts_and_carries_reason() {
        let hooks = vec![hook(
            HookEvent::Stop,
            r#"echo '{"continue": false, "reason": "done"}'"#,
        )];
        let registry = AsyncHookRegistry::new();
        let effect = run_event(&hooks, "{}", None, false, &registry).await;
        assert!(!effect.should_continue);
        assert_eq!(effect.reason.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn additional_context_accumulates_across_hooks() {
        let hooks = vec![
            hook(HookEvent::UserPromptSubmit, r#"echo '{"additionalContext": "a"}'"#),
            hook(HookEvent::UserPromptSubmit, r#"echo '{"additionalContext": "b"}'"#),
        ];
        let registry = AsyncHookRegistry::new();
        let effect = run_event(&hooks, "{}", None, false, &registry).await;
        assert_eq!(effect.additional_context, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn async_hook_is_registered_not_absorbed() {
        let hooks = vec![hook(HookEvent::PreToolUse, r#"echo '{"async": true}'"#)];
        let registry = AsyncHookRegistry::new();
        let effect = run_event(&hooks, "{}", None, false, &registry).await;
        assert_eq!(effect.permission, None);
        assert_eq!(registry.pending_count(), 1);
    }

    #[tokio::test]
    async fn failed_hook_contributes_no_vote() {
        let hooks = vec![hook(HookEvent::PreToolUse, "exit 1")];
        let registry = AsyncHookRegistry::new();
        let effect = run_event(&hooks, "{}", None, false, &registry).await;
        assert_eq!(effect.permission, None);
        assert!(effect.should_continue);
    }
}
