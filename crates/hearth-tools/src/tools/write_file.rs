//! Write file tool — writes content to a file, creating parent
//! directories as needed. Grounded on `astrid-tools::write_file::WriteFileTool`.

use serde_json::Value;

use crate::boundary::PathCheck;
use crate::error::{ToolError, ToolResult};
use crate::permission::PermissionDecision;
use crate::registry::{Tool, ToolContext};

/// Built-in tool for writing files. Mutating: not concurrency-safe.
pub struct WriteFileTool;

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Writes content to a file. Creates parent directories if they don't exist. \
         Overwrites the file if it already exists."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Absolute path to the file to write"},
                "content": {"type": "string", "description": "The content to write to the file"}
            },
            "required": ["file_path", "content"]
        })
    }

    fn is_concurrency_safe(&self) -> bool {
        false
    }

    fn permission_check(&self, input: &Value, ctx: &ToolContext) -> PermissionDecision {
        let Some(path) = input.get("file_path").and_then(Value::as_str) else {
            return PermissionDecision::Ask;
        };
        match ctx.boundary.check(std::path::Path::new(path)) {
            PathCheck::Allowed | PathCheck::AutoAllowed => PermissionDecision::Allow,
            PathCheck::NeverAllowed => PermissionDecision::Deny,
            PathCheck::RequiresApproval => PermissionDecision::Ask,
        }
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        let path = input.get("file_path").and_then(Value::as_str).ok_or("file_path is required")?;
        if input.get("content").and_then(Value::as_str).is_none() {
            return Err("content is required".to_string());
        }
        if !std::path::Path::new(path).is_absolute() {
            return Err("file_path must be an absolute path".to_string());
        }
        Ok(())
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> ToolResult {
        let file_path = input
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("file_path is required".into()))?;
        let content = input
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("content is required".into()))?;

        let path = std::path::Path::new(file_path);
        if !path.is_absolute() {
            return Err(ToolError::InvalidArguments("file_path must be an absolute path".into()));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;

        Ok(format!("Wrote {} bytes to {file_path}", content.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn writes_and_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/test.txt");

        WriteFileTool
            .execute(
                serde_json::json!({"file_path": path.to_str().unwrap(), "content": "nested"}),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "nested");
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "old").unwrap();

        WriteFileTool
            .execute(
                serde_json::json!({"file_path": path.to_str().unwrap(), "content": "new"}),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn relative_path_fails_validation() {
        let result = WriteFileTool.validate_input(&serde_json::json!({
            "file_path": "relative.txt",
            "content": "x"
        }));
        assert!(result.is_err());
    }
}
