//! Interactive chat: reads lines from the terminal, drives one
//! [`hearth_runtime::ConversationEngine`] turn per line, and prints the
//! assistant's text blocks as they land in the transcript.
//!
//! Grounded on `astrid-cli::commands::chat::run_json_chat`'s readline loop
//! (minus the daemon RPC hop: everything here runs in-process).

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;

use hearth_core::{ContentBlock, Conversation, Role};
use hearth_hooks::{HookEvent, HookRegistry};
use hearth_llm::{ClaudeProvider, ProviderConfig, RetryConfig};
use hearth_runtime::{
    classify_pressure, compact, estimate_conversation, ConversationEngine, HookContextFields, Pressure, RuntimeConfig, ToolExecutor,
};
use hearth_tools::{default_registry, PermissionMode, ToolContext, ToolUsePermissionContext};

use crate::prompt::TerminalPrompt;
use crate::theme::Theme;

/// Run one interactive session rooted at `workspace_root`.
pub(crate) async fn run(workspace_root: PathBuf, api_key: String, model: String) -> anyhow::Result<()> {
    let config_resolver = hearth_config::ConfigResolver::new(workspace_root.clone());
    let merged = config_resolver.get_merged()?;

    let mut permission_ctx = ToolUsePermissionContext::new(PermissionMode::Ask);
    if let Some(allow) = merged.get("permissions").and_then(|p| p.get("allow")).and_then(|v| v.as_array()) {
        for tool in allow.iter().filter_map(|v| v.as_str()) {
            permission_ctx.allow_tool(tool.to_string());
        }
    }
    if let Some(deny) = merged.get("permissions").and_then(|p| p.get("deny")).and_then(|v| v.as_array()) {
        for tool in deny.iter().filter_map(|v| v.as_str()) {
            permission_ctx.deny_tool(tool.to_string());
        }
    }

    let hooks = Arc::new(HookRegistry::new());
    hooks.load_from_config(&merged);

    let tool_registry = Arc::new(default_registry());
    let tool_executor = Arc::new(ToolExecutor::new(tool_registry.clone(), hooks.clone()).with_prompt(Arc::new(TerminalPrompt)));

    let provider_config = ProviderConfig {
        api_key,
        model,
        max_tokens: 8192,
        temperature: 1.0,
        base_url: None,
        context_window: None,
    };
    let provider: Arc<ClaudeProvider> = Arc::new(ClaudeProvider::new(provider_config));

    let engine = ConversationEngine::new(provider.clone(), tool_executor.clone(), hooks.clone(), RetryConfig::default());

    let runtime_config = RuntimeConfig::new(workspace_root.clone());
    let tool_ctx = ToolContext::new(workspace_root);
    let tool_definitions: Vec<_> = tool_registry
        .all_definitions()
        .into_iter()
        .map(|(name, description, input_schema)| hearth_llm::ToolDefinition { name, description, input_schema })
        .collect();

    let mut conversation = Conversation::new();
    let mut editor = DefaultEditor::new()?;

    println!(
        "Conversation {} | type {} to quit\n",
        Theme::conversation_id(&conversation.id.to_string()),
        "exit".cyan()
    );

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("{}", Theme::dimmed("Goodbye!"));
                break;
            },
            Err(err) => return Err(err.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history_entry(input).ok();

        if input == "exit" || input == "quit" {
            println!("{}", Theme::dimmed("Goodbye!"));
            break;
        }

        let before = conversation.messages().len();
        let cancel = CancellationToken::new();
        let result = engine
            .run_turn(&mut conversation, input, &runtime_config.system_prompt, tool_definitions.clone(), &tool_ctx, &permission_ctx, &cancel)
            .await;

        if let Err(err) = result {
            println!("{}", Theme::error(&err.to_string()));
            continue;
        }

        print_new_assistant_text(&conversation, before);

        let estimate = estimate_conversation(conversation.messages());
        let pressure = classify_pressure(estimate, runtime_config.max_context_tokens as u64);
        if matches!(pressure, Pressure::AutoCompact | Pressure::HardWarn) {
            if runtime_config.auto_compact {
                let pretool_hooks = hooks.hooks_for(HookEvent::PreCompact, "");
                let fields = HookContextFields {
                    session_id: conversation.id.to_string(),
                    transcript_path: String::new(),
                    cwd: tool_ctx.workspace_root.display().to_string(),
                    permission_mode: permission_mode_str(permission_ctx.mode).to_string(),
                };
                let report = compact(
                    &mut conversation,
                    &pretool_hooks,
                    tool_executor.async_hooks(),
                    provider.as_ref(),
                    runtime_config.max_context_tokens as u64,
                    runtime_config.keep_recent_count,
                    &fields,
                    "auto",
                )
                .await;
                println!(
                    "{}",
                    Theme::dimmed(&format!(
                        "(compacted: dropped {}, coalesced {} runs, {} -> {} tokens)",
                        report.dropped, report.coalesced_runs, report.before_estimate, report.after_estimate
                    ))
                );
            } else {
                println!("{}", Theme::warning("context pressure high; consider /compact"));
            }
        }
    }

    Ok(())
}

fn permission_mode_str(mode: PermissionMode) -> &'static str {
    match mode {
        PermissionMode::Allow => "allow",
        PermissionMode::Deny => "deny",
        PermissionMode::Ask => "ask",
    }
}

fn print_new_assistant_text(conversation: &Conversation, before: usize) {
    for message in &conversation.messages()[before..] {
        if message.role != Role::Assistant {
            continue;
        }
        for block in &message.content {
            if let ContentBlock::Text { text } = block {
                println!("{text}");
            }
        }
    }
}
