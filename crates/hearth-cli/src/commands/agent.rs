//! `hearth agent` - launch one of the three built-in agent profiles
//! (C7) on a single task and print its transcript and telemetry.
//!
//! Grounded on the same wiring as [`crate::commands::chat::run`], minus
//! the interactive readline loop: one [`hearth_runtime::AgentOrchestrator`]
//! launch, to completion, then exit.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use hearth_core::{ContentBlock, Role};
use hearth_hooks::HookRegistry;
use hearth_llm::{ClaudeProvider, ProviderConfig, RetryConfig};
use hearth_runtime::{AgentOrchestrator, ConversationEngine, RuntimeConfig, ToolExecutor};
use hearth_tools::default_registry;

use crate::prompt::TerminalPrompt;
use crate::theme::Theme;

/// Launch `agent_type` on `task`, rooted at `workspace_root`. The agent's
/// tool permissions come entirely from its profile's whitelist
/// ([`AgentOrchestrator::launch`] builds that context itself); this
/// entrypoint only resolves hooks from the merged configuration.
pub(crate) async fn run(workspace_root: PathBuf, api_key: String, model: String, agent_type: String, task: String) -> anyhow::Result<()> {
    let config_resolver = hearth_config::ConfigResolver::new(workspace_root.clone());
    let merged = config_resolver.get_merged()?;

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

    let engine = Arc::new(ConversationEngine::new(provider, tool_executor, hooks, RetryConfig::default()));

    let runtime_config = RuntimeConfig::new(workspace_root.clone());
    let orchestrator = AgentOrchestrator::new(engine, tool_registry, workspace_root, runtime_config.max_concurrent_subagents);

    println!("{}", Theme::dimmed(&format!("launching agent '{agent_type}'...")));

    let launch = orchestrator
        .launch(&agent_type, &task, None, CancellationToken::new())
        .await
        .map_err(|err| anyhow::anyhow!(err))?;

    for message in launch.conversation.messages() {
        if message.role != Role::Assistant {
            continue;
        }
        for block in &message.content {
            if let ContentBlock::Text { text } = block {
                println!("{text}");
            }
        }
    }

    if let Err(err) = launch.result {
        println!("{}", Theme::error(&err.to_string()));
    }

    println!(
        "{}",
        Theme::dimmed(&format!(
            "(agent '{}' finished in {}ms, {} messages, {} tool calls)",
            launch.telemetry.agent_type,
            launch.telemetry.duration.as_millis(),
            launch.telemetry.message_count,
            launch.telemetry.tool_use_count,
        ))
    );

    Ok(())
}
