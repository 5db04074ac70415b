//! Runtime configuration: the knobs C5/C6/C7 need that are not part of
//! the layered configuration C1 resolves (spec.md §10.3 — model/provider
//! selection and secrets are the runtime's own concern, not a hook/
//! permission/model-selection policy document).
//!
//! Grounded on `astrid-runtime::runtime::config::RuntimeConfig`, trimmed
//! of the teacher's `spark_seed`/`spark_file` identity-injection fields
//! (out of scope) and its `WorkspaceConfig` (replaced by the plain root
//! path `hearth_tools::ToolContext` already takes).

use std::path::PathBuf;
use std::time::Duration;

use crate::accountant::DEFAULT_KEEP_RECENT_COUNT;
use crate::executor::DEFAULT_MAX_CONCURRENT;

const DEFAULT_MAX_CONTEXT_TOKENS: usize = 200_000;
const DEFAULT_MAX_CONCURRENT_SUBAGENTS: usize = 4;
const DEFAULT_MAX_SUBAGENT_DEPTH: usize = 3;
const DEFAULT_SUBAGENT_TIMEOUT_SECS: u64 = 300;

/// Configuration for one [`crate::ConversationEngine`] instance.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Workspace root every tool call is bounded to.
    pub workspace_root: PathBuf,
    /// Maximum context tokens, used by the token accountant's pressure
    /// thresholds when the provider doesn't report its own window.
    pub max_context_tokens: usize,
    /// Base system prompt text (agent identity text is composed on top of
    /// this per spec.md §4.5).
    pub system_prompt: String,
    /// Whether the engine auto-compacts on crossing the pressure
    /// threshold, or only reports pressure for the caller to act on.
    pub auto_compact: bool,
    /// Number of trailing messages compaction never touches.
    pub keep_recent_count: usize,
    /// `max_concurrent` gate for non-concurrency-safe tools.
    pub max_concurrent_tools: usize,
    /// Maximum concurrently running sub-agents (C7).
    pub max_concurrent_subagents: usize,
    /// Maximum sub-agent nesting depth (C7).
    pub max_subagent_depth: usize,
    /// Default timeout for a sub-agent's conversation if none is given.
    pub default_subagent_timeout: Duration,
}

impl RuntimeConfig {
    /// Build a config rooted at `workspace_root`, other fields defaulted.
    #[must_use]
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            system_prompt: String::new(),
            auto_compact: true,
            keep_recent_count: DEFAULT_KEEP_RECENT_COUNT,
            max_concurrent_tools: DEFAULT_MAX_CONCURRENT,
            max_concurrent_subagents: DEFAULT_MAX_CONCURRENT_SUBAGENTS,
            max_subagent_depth: DEFAULT_MAX_SUBAGENT_DEPTH,
            default_subagent_timeout: Duration::from_secs(DEFAULT_SUBAGENT_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = RuntimeConfig::new(PathBuf::from("/tmp/ws"));
        assert_eq!(config.max_concurrent_tools, 5);
        assert_eq!(config.keep_recent_count, 10);
        assert!(config.auto_compact);
    }
}
