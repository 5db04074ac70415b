//! Grep tool — searches file contents by regex. New body (no direct
//! teacher file was retrieved for this one); grounded on
//! `astrid-tools::glob::GlobTool`'s directory-walking idiom, paired with
//! the `regex` crate the workspace already carries for hook matching.

use std::fmt::Write;
use std::path::PathBuf;

use regex::Regex;
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{ToolError, ToolResult};
use crate::permission::PermissionDecision;
use crate::registry::{Tool, ToolContext};

const MAX_MATCHES: usize = 500;

/// Built-in tool for searching file contents by regex. Read-only.
pub struct GrepTool;

#[async_trait::async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Searches file contents for a regex pattern. Returns matching lines as \
         \"path:line_number:content\", capped at 500 matches."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string", "description": "Directory to search (defaults to workspace root)"},
                "glob": {"type": "string", "description": "Restrict search to files matching this glob"}
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
        let pattern = input.get("pattern").and_then(Value::as_str).ok_or("pattern is required")?;
        Regex::new(pattern).map_err(|e| format!("invalid regex: {e}"))?;
        Ok(())
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let pattern = input
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("pattern is required".into()))?;
        let regex = Regex::new(pattern).map_err(|e| ToolError::InvalidArguments(format!("invalid regex: {e}")))?;

        let search_dir = input
            .get("path")
            .and_then(Value::as_str)
            .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);
        if !search_dir.exists() {
            return Err(ToolError::PathNotFound(search_dir.display().to_string()));
        }
        let search_dir = search_dir.canonicalize()?;

        let file_glob = input
            .get("glob")
            .and_then(Value::as_str)
            .map(|p| {
                globset::GlobBuilder::new(p)
                    .literal_separator(false)
                    .build()
                    .map(|g| g.compile_matcher())
            })
            .transpose()
            .map_err(|e| ToolError::InvalidArguments(format!("invalid glob pattern: {e}")))?;

        let mut output = String::new();
        let mut matched = 0usize;

        'walk: for entry in WalkDir::new(&search_dir).follow_links(false).into_iter().filter_entry(|e| {
            e.depth() == 0 || e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
        }) {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_dir() {
                continue;
            }

            if let Some(matcher) = &file_glob {
                let rel = entry.path().strip_prefix(&search_dir).unwrap_or(entry.path());
                if !matcher.is_match(rel) {
                    continue;
                }
            }

            let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
                continue;
            };

            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    let _ = writeln!(output, "{}:{}:{}", entry.path().display(), idx.saturating_add(1), line);
                    matched = matched.saturating_add(1);
                    if matched >= MAX_MATCHES {
                        let _ = write!(output, "\n(truncated at {MAX_MATCHES} matches)");
                        break 'walk;
                    }
                }
            }
        }

        if matched == 0 {
            return Ok(format!("No matches for \"{pattern}\""));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn finds_matching_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\nstruct Foo;\n").unwrap();

        let ctx = ToolContext::new(dir.path().to_path_buf());
        let result = GrepTool.execute(serde_json::json!({"pattern": "struct \\w+"}), &ctx).await.unwrap();

        assert!(result.contains("struct Foo"));
        assert!(result.contains("a.rs:2:"));
    }

    #[tokio::test]
    async fn no_matches_reports_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();

        let ctx = ToolContext::new(dir.path().to_path_buf());
        let result = GrepTool.execute(serde_json::json!({"pattern": "nonexistent_token"}), &ctx).await.unwrap();
        assert!(result.contains("No matches"));
    }

    #[tokio::test]
    async fn glob_restricts_searched_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "needle\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "needle\n").unwrap();

        let ctx = ToolContext::new(dir.path().to_path_buf());
        let result = GrepTool
            .execute(serde_json::json!({"pattern": "needle", "glob": "*.rs"}), &ctx)
            .await
            .unwrap();

        assert!(result.contains("a.rs"));
        assert!(!result.contains("b.txt"));
    }

    #[test]
    fn invalid_regex_fails_validation() {
        let result = GrepTool.validate_input(&serde_json::json!({"pattern": "[unclosed"}));
        assert!(result.is_err());
    }
}
