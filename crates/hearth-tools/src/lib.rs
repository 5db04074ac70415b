#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Tool data model (`Tool`, `ToolRegistry`, `ToolUsePermissionContext`,
//! workspace boundary checking) and the six built-in tool bodies.

mod boundary;
mod error;
mod permission;
mod registry;
mod tools;

pub use boundary::{PathCheck, WorkspaceBoundary};
pub use error::{ToolError, ToolResult};
pub use permission::{PermissionDecision, PermissionMode, ToolUsePermissionContext};
pub use registry::{Tool, ToolContext, ToolRegistry, DEFAULT_TOOL_TIMEOUT};
pub use tools::bash::BashTool;
pub use tools::edit_file::EditFileTool;
pub use tools::glob::GlobTool;
pub use tools::grep::GrepTool;
pub use tools::read_file::ReadFileTool;
pub use tools::write_file::WriteFileTool;

/// Build a registry with the six built-in tools registered.
#[must_use]
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ReadFileTool));
    registry.register(Box::new(WriteFileTool));
    registry.register(Box::new(EditFileTool));
    registry.register(Box::new(GlobTool));
    registry.register(Box::new(GrepTool));
    registry.register(Box::new(BashTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_six_tools() {
        let registry = default_registry();
        for name in ["read_file", "write_file", "edit_file", "glob", "grep", "bash"] {
            assert!(registry.get(name).is_some(), "missing tool {name}");
        }
    }
}
