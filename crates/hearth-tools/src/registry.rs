//! `Tool` trait, `ToolContext`, and `ToolRegistry` (spec.md §3/§4.4).
//!
//! Grounded on `astrid-tools::{BuiltinTool, ToolContext, ToolRegistry}`,
//! extended with the fields spec.md's `Tool` record names that the
//! teacher's trait doesn't surface (`timeout`, `is_concurrency_safe`,
//! `permission_check`) since the executor in `hearth-runtime` needs them
//! per-tool rather than hard-coded.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::boundary::WorkspaceBoundary;
use crate::error::ToolResult;
use crate::permission::PermissionDecision;

/// Default per-call timeout (spec.md §4.4: "executor default (120 s)").
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared context available to all built-in tool bodies.
pub struct ToolContext {
    /// Workspace root directory.
    pub workspace_root: PathBuf,
    /// Current working directory, persisted across bash invocations.
    pub cwd: Arc<RwLock<PathBuf>>,
    /// Boundary used by path-taking tools' `permission_check`.
    pub boundary: WorkspaceBoundary,
}

impl ToolContext {
    /// Create a new tool context rooted at `workspace_root`, with no
    /// additional allowed directories.
    #[must_use]
    pub fn new(workspace_root: PathBuf) -> Self {
        let cwd = Arc::new(RwLock::new(workspace_root.clone()));
        let boundary = WorkspaceBoundary::new(workspace_root.clone());
        Self { workspace_root, cwd, boundary }
    }

    /// Create a context that shares its `cwd` with another (e.g. a
    /// parallel sub-agent sharing the same shell session) and uses the
    /// given boundary (reflecting the session's permission context).
    #[must_use]
    pub fn with_shared_cwd(workspace_root: PathBuf, cwd: Arc<RwLock<PathBuf>>, boundary: WorkspaceBoundary) -> Self {
        Self { workspace_root, cwd, boundary }
    }
}

/// A registered tool (spec.md §3 `Tool` record).
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within a registry.
    fn name(&self) -> &'static str;

    /// Human-readable description for the LLM.
    fn description(&self) -> &'static str;

    /// JSON schema for the tool's input.
    fn input_schema(&self) -> Value;

    /// Per-call timeout; `None` uses the executor default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Whether this tool may run concurrently with other safe tools
    /// (read-only tools) or must be serialised (mutating tools).
    fn is_concurrency_safe(&self) -> bool;

    /// Whether the tool is currently enabled; disabled tools fail fast
    /// with `tool_disabled` before permission resolution.
    fn is_enabled(&self) -> bool {
        true
    }

    /// The tool's own judgment of whether `input` should proceed,
    /// independent of hooks or the base permission mode.
    fn permission_check(&self, input: &Value, ctx: &ToolContext) -> PermissionDecision;

    /// Structural validation of `input`, run after permission resolution.
    fn validate_input(&self, input: &Value) -> Result<(), String> {
        let _ = input;
        Ok(())
    }

    /// Execute the tool.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult;
}

/// Registry of tools for lookup and LLM schema export.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool, replacing any previous tool of the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Every registered tool's name.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Export every tool's name/description/schema for the LLM request.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<(String, String, Value)> {
        self.tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string(), t.input_schema()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::read_file::ReadFileTool;

    #[test]
    fn registry_looks_up_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ReadFileTool));

        assert!(registry.get("read_file").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn all_definitions_exports_every_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ReadFileTool));

        let defs = registry.all_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].0, "read_file");
    }
}
