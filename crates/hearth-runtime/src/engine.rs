//! C5: the conversation engine — builds requests, drives the streaming
//! protocol, weaves tool execution in inline, and enforces the
//! per-conversation cancellation cascade.
//!
//! Grounded on `astrid-runtime::runtime::execution.rs::run_loop`'s
//! stream-accumulate-execute-continue shape, adapted from the teacher's
//! batch-tools-at-turn-end model to spec.md §4.5's literal per-block
//! inline execution (only one accumulator is ever open at a time, so
//! executing a tool as its block closes is already sequential with no
//! extra bookkeeping).

use std::mem;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use hearth_core::{ContentBlock, Conversation, HearthResult, Message, Role, Usage};
use hearth_hooks::{run_event, HookEvent, HookRegistry};
use hearth_llm::{LlmProvider, RequestSpec, RetryConfig, StreamEvent, ToolDefinition};
use hearth_tools::{PermissionMode, ToolContext, ToolUsePermissionContext};

use crate::executor::{build_hook_context_json, HookContextFields, ToolExecutor};

/// Drives one or more conversations against a single provider/executor
/// pair. Cheap to share (everything it holds is already `Arc`'d); build
/// one per process, not one per conversation.
pub struct ConversationEngine {
    provider: std::sync::Arc<dyn LlmProvider>,
    tool_executor: std::sync::Arc<ToolExecutor>,
    hooks: std::sync::Arc<HookRegistry>,
    retry: RetryConfig,
}

/// Accumulator state while reading one streaming response. Only one of
/// these is ever live at a time (spec.md §9: "keep it as a raw string
/// buffer").
enum OpenBlock {
    None,
    Text(String),
    Thinking(String),
    ToolUse { id: String, name: String, buffer: String },
}

impl ConversationEngine {
    /// Build an engine over a provider and tool executor.
    #[must_use]
    pub fn new(
        provider: std::sync::Arc<dyn LlmProvider>,
        tool_executor: std::sync::Arc<ToolExecutor>,
        hooks: std::sync::Arc<HookRegistry>,
        retry: RetryConfig,
    ) -> Self {
        Self { provider, tool_executor, hooks, retry }
    }

    fn permission_mode_str(mode: PermissionMode) -> &'static str {
        match mode {
            PermissionMode::Allow => "allow",
            PermissionMode::Deny => "deny",
            PermissionMode::Ask => "ask",
        }
    }

    fn hook_fields(&self, conversation: &Conversation, tool_ctx: &ToolContext, permission_ctx: &ToolUsePermissionContext) -> HookContextFields {
        HookContextFields {
            session_id: conversation.id.to_string(),
            transcript_path: String::new(),
            cwd: tool_ctx.workspace_root.display().to_string(),
            permission_mode: Self::permission_mode_str(permission_ctx.mode).to_string(),
        }
    }

    /// Run one user-facing turn to completion: appends `input` as a user
    /// message, fires `UserPromptSubmit`, then drives the streaming
    /// recursion (spec.md §4.5 "Tool execution weave") until the assistant
    /// produces a turn with no tool_use blocks, cancellation occurs, or a
    /// hook halts the turn.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-retryable LLM failure or a
    /// `UserPromptSubmit` hook denial.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        system_prompt: &str,
        tools: Vec<ToolDefinition>,
        tool_ctx: &ToolContext,
        permission_ctx: &ToolUsePermissionContext,
        cancel: &CancellationToken,
    ) -> HearthResult<()> {
        conversation.append_message(Message::user(input));

        let fields = self.hook_fields(conversation, tool_ctx, permission_ctx);
        let prompt_hooks = self.hooks.hooks_for(HookEvent::UserPromptSubmit, "");
        let prompt_context = build_hook_context_json(
            HookEvent::UserPromptSubmit,
            &fields,
            serde_json::json!({"prompt": input}),
        );
        let prompt_effect = run_event(&prompt_hooks, &prompt_context, None, true, self.tool_executor.async_hooks()).await;
        if !prompt_effect.should_continue {
            return Err(hearth_core::HearthError::hook(
                prompt_effect.reason.unwrap_or_else(|| "UserPromptSubmit hook halted the turn".to_string()),
            ));
        }

        loop {
            if cancel.is_cancelled() {
                self.cascade_cancel(conversation);
                return Ok(());
            }

            let spec = RequestSpec {
                system: system_prompt.to_string(),
                tools: tools.clone(),
            };

            let messages_snapshot = conversation.messages().to_vec();
            let provider = &self.provider;
            let stream_result = hearth_llm::retry_with_policy(&self.retry, || cancel.is_cancelled(), || async {
                provider.stream(&messages_snapshot, &spec).await
            })
            .await;

            let mut stream = match stream_result {
                Ok(stream) => stream,
                Err(err) => return Err(err),
            };

            let mut pending_blocks: Vec<ContentBlock> = Vec::new();
            let mut pending_outcomes: Vec<(String, crate::executor::ToolOutcome)> = Vec::new();
            let mut usage = Usage::default();
            let mut thinking: Option<String> = None;
            let mut open = OpenBlock::None;
            let mut had_tool_use = false;
            let mut stream_error: Option<hearth_core::HearthError> = None;

            while let Some(event) = stream.next().await {
                if cancel.is_cancelled() {
                    break;
                }
                match event {
                    Ok(StreamEvent::TextBlockStart) => open = OpenBlock::Text(String::new()),
                    Ok(StreamEvent::ThinkingBlockStart) => open = OpenBlock::Thinking(String::new()),
                    Ok(StreamEvent::ToolUseBlockStart { id, name }) => {
                        open = OpenBlock::ToolUse { id, name, buffer: String::new() };
                    },
                    Ok(StreamEvent::TextDelta(delta)) => {
                        if let OpenBlock::Text(text) = &mut open {
                            text.push_str(&delta);
                        }
                    },
                    Ok(StreamEvent::ThinkingDelta(delta)) => {
                        if let OpenBlock::Thinking(text) = &mut open {
                            text.push_str(&delta);
                        }
                    },
                    Ok(StreamEvent::ToolUseJsonDelta { partial_json, .. }) => {
                        if let OpenBlock::ToolUse { buffer, .. } = &mut open {
                            buffer.push_str(&partial_json);
                        }
                    },
                    Ok(StreamEvent::BlockStop { tool_input }) => {
                        match mem::replace(&mut open, OpenBlock::None) {
                            OpenBlock::Text(text) => pending_blocks.push(ContentBlock::text(text)),
                            OpenBlock::Thinking(text) => {
                                thinking = Some(text.clone());
                                pending_blocks.push(ContentBlock::Thinking { text });
                            },
                            OpenBlock::ToolUse { id, name, buffer } => {
                                had_tool_use = true;
                                let input = tool_input.unwrap_or_else(|| {
                                    serde_json::from_str(&buffer).unwrap_or(serde_json::Value::String(buffer.clone()))
                                });
                                pending_blocks.push(ContentBlock::tool_use(id.clone(), name.clone(), input.clone()));

                                let outcome = self
                                    .tool_executor
                                    .execute(&id, &name, input, tool_ctx, permission_ctx, &fields, cancel)
                                    .await;
                                let cancelled = outcome.cancelled;
                                pending_outcomes.push((id, outcome));
                                if cancelled {
                                    break;
                                }
                            },
                            OpenBlock::None => {},
                        }
                    },
                    Ok(StreamEvent::UsageDelta(delta)) => usage.merge(&delta),
                    Ok(StreamEvent::MessageStop | StreamEvent::Done) => break,
                    Ok(StreamEvent::Error(err)) => {
                        stream_error = Some(err);
                        break;
                    },
                    Err(err) => {
                        stream_error = Some(err);
                        break;
                    },
                }
            }

            if let Some(err) = stream_error {
                if !err.is_retryable() {
                    return Err(err);
                }
                warn!(error = %err, "mid-stream transient error, ending turn without retry");
                return Err(err);
            }

            let assistant_message = Message {
                role: Role::Assistant,
                content: pending_blocks,
                usage: Some(usage),
                thinking,
            };
            conversation.append_assistant_message(assistant_message);

            let mut additional_context = Vec::new();
            let mut any_cancelled = false;
            for (id, outcome) in pending_outcomes {
                if outcome.cancelled {
                    any_cancelled = true;
                    continue;
                }
                conversation.append_tool_result(&id, outcome.content, outcome.is_error);
                additional_context.extend(outcome.additional_context);
            }

            if cancel.is_cancelled() || any_cancelled {
                self.cascade_cancel(conversation);
                return Ok(());
            }

            if !had_tool_use {
                let stop_hooks = self.hooks.hooks_for(HookEvent::Stop, "");
                let stop_context = build_hook_context_json(HookEvent::Stop, &fields, serde_json::json!({}));
                run_event(&stop_hooks, &stop_context, None, true, self.tool_executor.async_hooks()).await;
                return Ok(());
            }

            if !additional_context.is_empty() {
                conversation.append_message(Message::user(additional_context.join("\n\n")));
            }
        }
    }

    /// Cancellation cascade (spec.md §5): every `tool_use` still in
    /// progress gets a synthetic `is_error=true, content="cancelled"`
    /// result, and the executor's bookkeeping is cleared.
    fn cascade_cancel(&self, conversation: &mut Conversation) {
        let ids = conversation.cancel_in_progress();
        for id in ids {
            conversation.append_tool_result(&id, "cancelled", true);
        }
        self.tool_executor.clear_executing();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use hearth_core::HearthResult;
    use hearth_llm::StreamBox;
    use hearth_tools::{PermissionDecision, ToolRegistry};

    use super::*;

    struct ScriptedProvider {
        events: std::sync::Mutex<Vec<Vec<HearthResult<StreamEvent>>>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        fn model(&self) -> &str {
            "scripted-model"
        }
        async fn stream(&self, _messages: &[Message], _spec: &RequestSpec) -> HearthResult<StreamBox> {
            let mut guard = self.events.lock().unwrap();
            let batch = guard.remove(0);
            Ok(Box::pin(futures::stream::iter(batch)))
        }
        fn max_context_length(&self) -> usize {
            200_000
        }
    }

    struct EchoTool;

    #[async_trait]
    impl hearth_tools::Tool for EchoTool {
        fn name(&self) -> &'static str {
            "Bash"
        }
        fn description(&self) -> &'static str {
            "runs a command"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn is_concurrency_safe(&self) -> bool {
            false
        }
        fn permission_check(&self, _input: &serde_json::Value, _ctx: &ToolContext) -> PermissionDecision {
            PermissionDecision::Allow
        }
        async fn execute(&self, _input: serde_json::Value, _ctx: &ToolContext) -> hearth_tools::ToolResult {
            Ok("a.txt\nb.txt\n".to_string())
        }
    }

    fn turn_one_events() -> Vec<HearthResult<StreamEvent>> {
        vec![
            Ok(StreamEvent::TextBlockStart),
            Ok(StreamEvent::TextDelta("Running ls...".to_string())),
            Ok(StreamEvent::BlockStop { tool_input: None }),
            Ok(StreamEvent::ToolUseBlockStart { id: "t1".to_string(), name: "Bash".to_string() }),
            Ok(StreamEvent::ToolUseJsonDelta { id: "t1".to_string(), partial_json: r#"{"command":"ls"}"#.to_string() }),
            Ok(StreamEvent::BlockStop { tool_input: Some(json!({"command": "ls"})) }),
            Ok(StreamEvent::UsageDelta(Usage { input_tokens: 10, output_tokens: 5, ..Usage::default() })),
            Ok(StreamEvent::MessageStop),
        ]
    }

    fn turn_two_events() -> Vec<HearthResult<StreamEvent>> {
        vec![
            Ok(StreamEvent::TextBlockStart),
            Ok(StreamEvent::TextDelta("a.txt and b.txt are present.".to_string())),
            Ok(StreamEvent::BlockStop { tool_input: None }),
            Ok(StreamEvent::MessageStop),
        ]
    }

    #[tokio::test]
    async fn simple_tool_call_produces_three_messages_and_a_further_turn() {
        let provider = Arc::new(ScriptedProvider {
            events: std::sync::Mutex::new(vec![turn_one_events(), turn_two_events()]),
        });
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let tool_executor = Arc::new(ToolExecutor::new(Arc::new(registry), Arc::new(HookRegistry::new())));
        let engine = ConversationEngine::new(provider, tool_executor, Arc::new(HookRegistry::new()), RetryConfig::default());

        let mut conversation = Conversation::new();
        let tool_ctx = ToolContext::new(std::path::PathBuf::from("/tmp"));
        let permission_ctx = ToolUsePermissionContext::new(PermissionMode::Allow);
        let cancel = CancellationToken::new();

        engine
            .run_turn(&mut conversation, "run ls", "you are a helpful assistant", Vec::new(), &tool_ctx, &permission_ctx, &cancel)
            .await
            .unwrap();

        let messages = conversation.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(messages[1].tool_uses().any(|(id, name, _)| id == "t1" && name == "Bash"));
        assert_eq!(messages[2].role, Role::User);
        match &messages[2].content[0] {
            ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                assert_eq!(tool_use_id, "t1");
                assert_eq!(content, "a.txt\nb.txt\n");
                assert!(!is_error);
            },
            other => panic!("expected tool_result, got {other:?}"),
        }
        assert_eq!(messages[3].role, Role::Assistant);
        assert!(conversation.in_progress_tool_use_ids().is_empty());
        assert!(conversation.resolved_tool_use_ids().contains("t1"));
    }

    #[tokio::test]
    async fn pretooluse_deny_hook_produces_error_tool_result_without_executing() {
        let provider = Arc::new(ScriptedProvider {
            events: std::sync::Mutex::new(vec![vec![
                Ok(StreamEvent::ToolUseBlockStart { id: "t1".to_string(), name: "Bash".to_string() }),
                Ok(StreamEvent::BlockStop { tool_input: Some(json!({"command": "rm -rf /"})) }),
                Ok(StreamEvent::MessageStop),
            ]]),
        });
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let hooks = HookRegistry::new();
        hooks.load_from_config(&json!({
            "hooks": {
                "PreToolUse": [{
                    "matcher": "Bash",
                    "hooks": [{"type": "command", "command": "echo '{\"decision\": \"block\", \"reason\": \"policy\"}'"}]
                }]
            }
        }));
        let tool_executor = Arc::new(ToolExecutor::new(Arc::new(registry), Arc::new(hooks)));
        let engine = ConversationEngine::new(provider, tool_executor, Arc::new(HookRegistry::new()), RetryConfig::default());

        let mut conversation = Conversation::new();
        let tool_ctx = ToolContext::new(std::path::PathBuf::from("/tmp"));
        let permission_ctx = ToolUsePermissionContext::new(PermissionMode::Allow);
        let cancel = CancellationToken::new();

        engine
            .run_turn(&mut conversation, "delete everything", "sys", Vec::new(), &tool_ctx, &permission_ctx, &cancel)
            .await
            .unwrap();

        let messages = conversation.messages();
        match &messages[2].content[0] {
            ContentBlock::ToolResult { content, is_error, .. } => {
                assert!(*is_error);
                assert_eq!(content, "Tool use denied: policy");
            },
            other => panic!("expected tool_result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_before_turn_leaves_conversation_untouched_and_quiescent() {
        let provider = Arc::new(ScriptedProvider { events: std::sync::Mutex::new(vec![]) });
        let tool_executor = Arc::new(ToolExecutor::new(Arc::new(ToolRegistry::new()), Arc::new(HookRegistry::new())));
        let engine = ConversationEngine::new(provider, tool_executor, Arc::new(HookRegistry::new()), RetryConfig::default());

        let mut conversation = Conversation::new();
        let tool_ctx = ToolContext::new(std::path::PathBuf::from("/tmp"));
        let permission_ctx = ToolUsePermissionContext::new(PermissionMode::Allow);
        let cancel = CancellationToken::new();
        cancel.cancel();

        engine
            .run_turn(&mut conversation, "hello", "sys", Vec::new(), &tool_ctx, &permission_ctx, &cancel)
            .await
            .unwrap();

        assert!(conversation.in_progress_tool_use_ids().is_empty());
        assert_eq!(conversation.messages().len(), 1);
    }
}
