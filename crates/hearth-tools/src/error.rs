//! Tool execution errors, converted to [`HearthError`] at the executor
//! boundary. Grounded on `astrid-tools::ToolError`, unchanged in shape.

use hearth_core::HearthError;

/// Errors produced while validating or executing a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Path not found.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Timeout.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// Tool name is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool is disabled.
    #[error("tool disabled: {0}")]
    ToolDisabled(String),

    /// Call was denied by permission resolution.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Call was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// Result type for tool execution bodies.
pub type ToolResult = Result<String, ToolError>;

impl From<ToolError> for HearthError {
    fn from(err: ToolError) -> Self {
        HearthError::tool(err.to_string())
    }
}
