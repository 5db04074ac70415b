//! Bash tool — executes shell commands with a persistent working
//! directory. Grounded on `astrid-tools::bash::BashTool`.

use std::path::PathBuf;

use serde_json::Value;
use tokio::process::Command;

use crate::error::{ToolError, ToolResult};
use crate::permission::PermissionDecision;
use crate::registry::{Tool, ToolContext};

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MAX_TIMEOUT_MS: u64 = 600_000;
const CWD_SENTINEL: &str = "__HEARTH_CWD__";

/// Built-in tool for executing shell commands. Mutating: not concurrency-safe.
pub struct BashTool;

#[async_trait::async_trait]
impl Tool for BashTool {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn description(&self) -> &'static str {
        "Executes a shell command. The working directory persists between invocations. \
         Optional timeout in milliseconds (max 600000)."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "timeout": {"type": "integer", "description": "Timeout in ms (default 120000, max 600000)"}
            },
            "required": ["command"]
        })
    }

    fn is_concurrency_safe(&self) -> bool {
        false
    }

    fn permission_check(&self, _input: &Value, _ctx: &ToolContext) -> PermissionDecision {
        // Shell access has no path to check intrinsically; defer to the
        // base permission mode and any PreToolUse hooks.
        PermissionDecision::Ask
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        input.get("command").and_then(Value::as_str).ok_or("command is required")?;
        Ok(())
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let command = input
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("command is required".into()))?;

        let timeout_ms = input.get("timeout").and_then(Value::as_u64).unwrap_or(DEFAULT_TIMEOUT_MS).min(MAX_TIMEOUT_MS);

        let cwd = ctx.cwd.read().await.clone();
        let wrapped = format!("{command}\n__HEARTH_EXIT__=$?\necho \"{CWD_SENTINEL}\"\npwd\nexit $__HEARTH_EXIT__");

        let result = tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), run_bash(&wrapped, &cwd)).await;

        match result {
            Ok(Ok((stdout, stderr, exit_code))) => {
                let (output, new_cwd) = parse_sentinel_output(&stdout);
                if let Some(new_cwd) = new_cwd {
                    *ctx.cwd.write().await = new_cwd;
                }

                let mut result_text = String::new();
                if !output.is_empty() {
                    result_text.push_str(&output);
                }
                if !stderr.is_empty() {
                    if !result_text.is_empty() {
                        result_text.push('\n');
                    }
                    result_text.push_str("STDERR:\n");
                    result_text.push_str(&stderr);
                }
                if exit_code != 0 {
                    if !result_text.is_empty() {
                        result_text.push('\n');
                    }
                    result_text.push_str(&format!("(exit code: {exit_code})"));
                }
                if result_text.is_empty() {
                    result_text.push_str("(no output)");
                }
                Ok(result_text)
            },
            Ok(Err(e)) => Err(ToolError::ExecutionFailed(e.to_string())),
            Err(_) => Err(ToolError::Timeout(timeout_ms)),
        }
    }
}

async fn run_bash(command: &str, cwd: &std::path::Path) -> std::io::Result<(String, String, i32)> {
    let output = Command::new("bash").arg("-c").arg(command).current_dir(cwd).output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);
    Ok((stdout, stderr, exit_code))
}

fn parse_sentinel_output(stdout: &str) -> (String, Option<PathBuf>) {
    if let Some(sentinel_pos) = stdout.find(CWD_SENTINEL) {
        let output = stdout[..sentinel_pos].trim_end().to_string();
        #[allow(clippy::arithmetic_side_effects)]
        let after_sentinel = &stdout[sentinel_pos + CWD_SENTINEL.len()..];
        let new_cwd = after_sentinel.lines().find(|l| !l.is_empty()).map(|l| PathBuf::from(l.trim()));
        (output, new_cwd)
    } else {
        (stdout.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn captures_stdout() {
        let result = BashTool.execute(serde_json::json!({"command": "echo hello"}), &ctx()).await.unwrap();
        assert!(result.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let result = BashTool.execute(serde_json::json!({"command": "exit 3"}), &ctx()).await.unwrap();
        assert!(result.contains("exit code: 3"));
    }

    #[tokio::test]
    async fn cwd_persists_across_invocations() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());

        BashTool.execute(serde_json::json!({"command": "cd sub"}), &ctx).await.unwrap();
        let result = BashTool.execute(serde_json::json!({"command": "pwd"}), &ctx).await.unwrap();
        assert!(result.contains("sub"));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let result = BashTool.execute(serde_json::json!({"command": "sleep 5", "timeout": 50}), &ctx()).await;
        assert!(matches!(result.unwrap_err(), ToolError::Timeout(50)));
    }
}
