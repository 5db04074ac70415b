//! Read file tool — reads a file with line numbers (`cat -n` style).
//!
//! Grounded almost verbatim on `astrid-tools::read_file::ReadFileTool`.

use std::fmt::Write;

use serde_json::Value;

use crate::boundary::PathCheck;
use crate::error::{ToolError, ToolResult};
use crate::permission::PermissionDecision;
use crate::registry::{Tool, ToolContext};

const DEFAULT_LINE_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;

/// Built-in tool for reading files.
pub struct ReadFileTool;

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Reads a file from the filesystem. Returns contents with line numbers (cat -n format). \
         Default reads up to 2000 lines. Use offset and limit for large files. \
         Lines longer than 2000 characters are truncated."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Absolute path to the file to read"},
                "offset": {"type": "integer", "description": "Line number to start reading from (1-based)"},
                "limit": {"type": "integer", "description": "Number of lines to read"}
            },
            "required": ["file_path"]
        })
    }

    fn is_concurrency_safe(&self) -> bool {
        true
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
        if input.get("file_path").and_then(Value::as_str).is_none() {
            return Err("file_path is required".to_string());
        }
        Ok(())
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> ToolResult {
        let file_path = input
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("file_path is required".into()))?;

        let offset = input
            .get("offset")
            .and_then(Value::as_u64)
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX));
        let limit = input
            .get("limit")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_LINE_LIMIT, |v| usize::try_from(v).unwrap_or(usize::MAX));

        let path = std::path::Path::new(file_path);
        if !path.exists() {
            return Err(ToolError::PathNotFound(file_path.to_string()));
        }

        let raw = tokio::fs::read(path).await?;
        let check_len = raw.len().min(8192);
        if raw[..check_len].contains(&0) {
            return Err(ToolError::ExecutionFailed(format!("{file_path} appears to be a binary file")));
        }

        let content = String::from_utf8(raw)
            .map_err(|_| ToolError::ExecutionFailed(format!("{file_path} is not valid UTF-8")))?;

        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();

        let start = offset.map_or(0, |o| o.saturating_sub(1));
        let end = start.saturating_add(limit).min(total_lines);

        if start >= total_lines {
            return Ok(format!("(file has {total_lines} lines, offset {start} is past end)"));
        }

        let mut output = String::new();
        for (idx, &line) in lines[start..end].iter().enumerate() {
            #[allow(clippy::arithmetic_side_effects)]
            let line_num = start + idx + 1;
            let display_line = if line.len() > MAX_LINE_LENGTH { &line[..MAX_LINE_LENGTH] } else { line };
            let _ = writeln!(output, "{line_num:>6}\t{display_line}");
        }

        if end < total_lines {
            let _ = write!(
                output,
                "\n(showing lines {}-{} of {total_lines}; use offset/limit for more)",
                start.saturating_add(1),
                end
            );
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn reads_with_line_numbers() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "line one").unwrap();
        writeln!(f, "line two").unwrap();

        let result = ReadFileTool
            .execute(serde_json::json!({"file_path": f.path().to_str().unwrap()}), &ctx())
            .await
            .unwrap();

        assert!(result.contains("     1\tline one"));
        assert!(result.contains("     2\tline two"));
    }

    #[tokio::test]
    async fn missing_file_is_path_not_found() {
        let result = ReadFileTool
            .execute(serde_json::json!({"file_path": "/tmp/hearth_nonexistent_9912.txt"}), &ctx())
            .await;
        assert!(matches!(result.unwrap_err(), ToolError::PathNotFound(_)));
    }

    #[tokio::test]
    async fn offset_and_limit_slice_output() {
        let mut f = NamedTempFile::new().unwrap();
        for i in 1..=20 {
            writeln!(f, "line {i}").unwrap();
        }

        let result = ReadFileTool
            .execute(
                serde_json::json!({"file_path": f.path().to_str().unwrap(), "offset": 5, "limit": 3}),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.contains("line 5"));
        assert!(result.contains("line 7"));
        assert!(!result.contains("line 8"));
    }

    #[test]
    fn permission_check_allows_paths_in_workspace_root() {
        let ctx = ctx();
        let path_in_root = ctx.workspace_root.join("a.txt");
        let decision = ReadFileTool.permission_check(
            &serde_json::json!({"file_path": path_in_root.to_str().unwrap()}),
            &ctx,
        );
        assert_eq!(decision, PermissionDecision::Allow);
    }
}
