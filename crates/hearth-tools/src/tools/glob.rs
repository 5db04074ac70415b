//! Glob tool — finds files matching a glob pattern, sorted by
//! modification time. Grounded on `astrid-tools::glob::GlobTool`.

use std::fmt::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{ToolError, ToolResult};
use crate::permission::PermissionDecision;
use crate::registry::{Tool, ToolContext};

/// Built-in tool for finding files by glob pattern. Read-only.
pub struct GlobTool;

#[async_trait::async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &'static str {
        "glob"
    }

    fn description(&self) -> &'static str {
        "Finds files matching a glob pattern (e.g. \"**/*.rs\"). Returns matching paths \
         sorted by modification time, most recent first."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string", "description": "Directory to search (defaults to workspace root)"}
            },
            "required": ["pattern"]
        })
    }

    fn is_concurrency_safe(&self) -> bool {
        true
    }

    fn permission_check(&self, _input: &Value, _ctx: &ToolContext) -> PermissionDecision {
        PermissionDecision::Allow
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        input.get("pattern").and_then(Value::as_str).ok_or("pattern is required")?;
        Ok(())
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let pattern = input
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("pattern is required".into()))?;

        let search_dir = input
            .get("path")
            .and_then(Value::as_str)
            .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);

        if !search_dir.exists() {
            return Err(ToolError::PathNotFound(search_dir.display().to_string()));
        }
        let search_dir = search_dir.canonicalize()?;

        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| ToolError::InvalidArguments(format!("invalid glob pattern: {e}")))?
            .compile_matcher();

        let mut matches: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in WalkDir::new(&search_dir).follow_links(false).into_iter().filter_entry(|e| {
            e.depth() == 0 || e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
        }) {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_dir() {
                continue;
            }
            let rel_path = entry.path().strip_prefix(&search_dir).unwrap_or(entry.path());
            if glob.is_match(rel_path) {
                let mtime = entry.metadata().ok().and_then(|m| m.modified().ok()).unwrap_or(SystemTime::UNIX_EPOCH);
                matches.push((entry.path().to_path_buf(), mtime));
            }
        }
        matches.sort_by(|a, b| b.1.cmp(&a.1));

        if matches.is_empty() {
            return Ok(format!("No files matching \"{pattern}\" found"));
        }

        let mut output = String::new();
        for (path, _) in &matches {
            output.push_str(&path.display().to_string());
            output.push('\n');
        }
        let _ = write!(output, "\n({} files matched)", matches.len());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn matches_by_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let ctx = ToolContext::new(dir.path().to_path_buf());
        let result = GlobTool.execute(serde_json::json!({"pattern": "*.rs"}), &ctx).await.unwrap();

        assert!(result.contains("a.rs"));
        assert!(!result.contains("b.txt"));
        assert!(result.contains("1 files matched"));
    }

    #[tokio::test]
    async fn recursive_pattern_descends_subdirectories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/sub/lib.rs"), "").unwrap();

        let ctx = ToolContext::new(dir.path().to_path_buf());
        let result = GlobTool.execute(serde_json::json!({"pattern": "**/*.rs"}), &ctx).await.unwrap();

        assert!(result.contains("main.rs"));
        assert!(result.contains("lib.rs"));
    }

    #[tokio::test]
    async fn skips_hidden_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "").unwrap();
        std::fs::write(dir.path().join("visible.rs"), "").unwrap();

        let ctx = ToolContext::new(dir.path().to_path_buf());
        let result = GlobTool.execute(serde_json::json!({"pattern": "**/*"}), &ctx).await.unwrap();

        assert!(result.contains("visible.rs"));
        assert!(!result.contains(".git"));
    }
}
