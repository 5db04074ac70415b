//! Edit file tool — exact string replacement. Grounded on
//! `astrid-tools::edit_file::EditFileTool`.

use serde_json::Value;

use crate::boundary::PathCheck;
use crate::error::{ToolError, ToolResult};
use crate::permission::PermissionDecision;
use crate::registry::{Tool, ToolContext};

/// Built-in tool for editing files via string replacement. Mutating.
pub struct EditFileTool;

#[async_trait::async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &'static str {
        "edit_file"
    }

    fn description(&self) -> &'static str {
        "Performs exact string replacements in files. old_string must be unique in the file \
         unless replace_all is true."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string"},
                "old_string": {"type": "string"},
                "new_string": {"type": "string"},
                "replace_all": {"type": "boolean", "default": false}
            },
            "required": ["file_path", "old_string", "new_string"]
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
        input.get("file_path").and_then(Value::as_str).ok_or("file_path is required")?;
        input.get("old_string").and_then(Value::as_str).ok_or("old_string is required")?;
        input.get("new_string").and_then(Value::as_str).ok_or("new_string is required")?;
        Ok(())
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> ToolResult {
        let file_path = input
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("file_path is required".into()))?;
        let old_string = input
            .get("old_string")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("old_string is required".into()))?;
        let new_string = input
            .get("new_string")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("new_string is required".into()))?;
        let replace_all = input.get("replace_all").and_then(Value::as_bool).unwrap_or(false);

        let path = std::path::Path::new(file_path);
        if !path.exists() {
            return Err(ToolError::PathNotFound(file_path.to_string()));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let count = content.matches(old_string).count();

        if count == 0 {
            return Err(ToolError::ExecutionFailed(format!("old_string not found in {file_path}")));
        }
        if count > 1 && !replace_all {
            return Err(ToolError::ExecutionFailed(format!(
                "old_string found {count} times in {file_path} — use replace_all or provide more context"
            )));
        }

        let new_content = if replace_all {
            content.replace(old_string, new_string)
        } else {
            content.replacen(old_string, new_string, 1)
        };
        tokio::fs::write(path, &new_content).await?;

        if replace_all && count > 1 {
            Ok(format!("Replaced {count} occurrences in {file_path}"))
        } else {
            Ok(format!("Edited {file_path}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn replaces_unique_match() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "hello world").unwrap();

        let result = EditFileTool
            .execute(
                serde_json::json!({"file_path": f.path().to_str().unwrap(), "old_string": "hello", "new_string": "goodbye"}),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.contains("Edited"));
        assert_eq!(std::fs::read_to_string(f.path()).unwrap(), "goodbye world");
    }

    #[tokio::test]
    async fn non_unique_match_without_replace_all_fails() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "aaa bbb aaa").unwrap();

        let result = EditFileTool
            .execute(
                serde_json::json!({"file_path": f.path().to_str().unwrap(), "old_string": "aaa", "new_string": "ccc"}),
                &ctx(),
            )
            .await;

        assert!(result.unwrap_err().to_string().contains("2 times"));
    }

    #[tokio::test]
    async fn replace_all_replaces_every_occurrence() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "aaa bbb aaa").unwrap();

        let result = EditFileTool
            .execute(
                serde_json::json!({
                    "file_path": f.path().to_str().unwrap(),
                    "old_string": "aaa",
                    "new_string": "ccc",
                    "replace_all": true
                }),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.contains("2 occurrences"));
        assert_eq!(std::fs::read_to_string(f.path()).unwrap(), "ccc bbb ccc");
    }
}
