//! Command hook subprocess execution: sandboxed environment, stdin-JSON
//! delivery, timeout, and the `CLAUDE_CODE_SHELL_PREFIX` insertion rule.
//!
//! Grounded closely on `astrid-hooks::handler::command::CommandHandler`:
//! `env_clear()` + allowlist re-add, restricted PATH, piping the
//! serialized context on stdin then shutting it down for EOF, and
//! `tokio::time::timeout` wrapping. Command-line splitting (this hook
//! takes a whole shell string rather than the teacher's
//! `command` + `args` pair) is new, required by spec.md's single
//! `command` string shape.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::response::HookResponse;

/// Environment variables safe to inherit into a hook subprocess.
const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "USER", "SHELL", "TERM", "LANG", "LC_ALL", "LC_CTYPE", "TMPDIR", "TMP", "TEMP",
];

#[cfg(unix)]
const SAFE_PATH_DIRS: &[&str] = &["/usr/bin", "/bin", "/usr/local/bin"];

#[cfg(windows)]
const SAFE_PATH_DIRS: &[&str] = &[r"C:\Windows\System32", r"C:\Windows"];

fn safe_path() -> String {
    SAFE_PATH_DIRS.join(if cfg!(windows) { ";" } else { ":" })
}

/// Outcome of running a command hook.
pub enum CommandOutcome {
    /// The subprocess ran to completion. Per spec.md §6 ("exit code conveys
    /// nothing; content is authoritative"), `response` is always parsed from
    /// `stdout` regardless of `exit_code` — a non-zero exit is informational
    /// only, surfaced for logging.
    Completed {
        /// The parsed response.
        response: HookResponse,
        /// Raw stdout, retained for async-hook buffering.
        stdout: String,
        /// The subprocess's exit code, if it terminated normally.
        exit_code: Option<i32>,
    },
    /// The subprocess could not be spawned at all.
    SpawnFailed {
        /// The spawn error, stringified.
        stderr: String,
    },
    /// The subprocess did not finish within `timeout_seconds`.
    TimedOut,
}

/// Apply `CLAUDE_CODE_SHELL_PREFIX` to `command` (spec.md §6, resolved
/// per DESIGN.md open question #3): split the prefix into whitespace
/// tokens; if one starts with `-`, insert `command` immediately before
/// it; otherwise append `command` to the end. With no prefix configured,
/// the command runs unwrapped.
#[must_use]
pub fn apply_shell_prefix(prefix: Option<&str>, command: &str) -> String {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return command.to_string();
    };

    let tokens: Vec<&str> = prefix.split_whitespace().collect();
    let flag_pos = tokens.iter().position(|t| t.starts_with('-'));

    let mut parts: Vec<&str> = Vec::with_capacity(tokens.len() + 1);
    match flag_pos {
        Some(pos) => {
            parts.extend_from_slice(&tokens[..pos]);
            parts.push(command);
            parts.extend_from_slice(&tokens[pos..]);
        },
        None => {
            parts.extend_from_slice(&tokens);
            parts.push(command);
        },
    }
    parts.join(" ")
}

/// Run a command hook. `context_json` is written to the child's stdin,
/// then stdin is closed so the subprocess sees EOF.
pub async fn run(
    shell_command: &str,
    context_json: &str,
    timeout_duration: Duration,
    sandboxed: bool,
) -> CommandOutcome {
    debug!(command = %shell_command, sandboxed, "executing command hook");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(shell_command);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    if sandboxed {
        cmd.env_clear();
        for var in ALLOWED_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                if *var == "PATH" {
                    cmd.env("PATH", safe_path());
                } else {
                    cmd.env(var, value);
                }
            }
        }
    }

    let context_json = context_json.to_string();
    let result = timeout(timeout_duration, async move {
        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(context_json.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }
        child.wait_with_output().await
    })
    .await;

    match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let exit_code = output.status.code();
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                warn!(?exit_code, stderr = %stderr, "command hook exited non-zero; parsing stdout anyway");
            }
            CommandOutcome::Completed {
                response: HookResponse::parse(&stdout),
                stdout,
                exit_code,
            }
        },
        Ok(Err(err)) => {
            warn!(error = %err, "failed to spawn command hook");
            CommandOutcome::SpawnFailed { stderr: err.to_string() }
        },
        Err(_) => CommandOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_prefix_inserts_before_flags() {
        let out = apply_shell_prefix(Some("firejail --quiet"), "/bin/check.sh");
        assert_eq!(out, "firejail /bin/check.sh --quiet");
    }

    #[test]
    fn shell_prefix_appends_when_no_flag_token() {
        let out = apply_shell_prefix(Some("sandbox-exec"), "/bin/check.sh");
        assert_eq!(out, "sandbox-exec /bin/check.sh");
    }

    #[test]
    fn no_prefix_returns_command_unwrapped() {
        assert_eq!(apply_shell_prefix(None, "/bin/check.sh"), "/bin/check.sh");
        assert_eq!(apply_shell_prefix(Some(""), "/bin/check.sh"), "/bin/check.sh");
    }

    #[tokio::test]
    async fn completed_hook_parses_stdout() {
        let outcome = run("echo '{\"continue\": true}'", "{}", Duration::from_secs(5), true).await;
        match outcome {
            CommandOutcome::Completed { response, .. } => assert!(response.should_continue),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_still_parses_stdout() {
        let outcome = run("echo '{\"decision\": \"block\"}'; exit 1", "{}", Duration::from_secs(5), true).await;
        match outcome {
            CommandOutcome::Completed { response, exit_code, .. } => {
                assert_eq!(response.decision, Some(crate::response::Decision::Block));
                assert_eq!(exit_code, Some(1));
            },
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_hook_times_out() {
        let outcome = run("sleep 10", "{}", Duration::from_millis(50), true).await;
        assert!(matches!(outcome, CommandOutcome::TimedOut));
    }

    #[tokio::test]
    async fn stdin_context_reaches_subprocess() {
        let outcome = run(
            r#"INPUT=$(cat); echo "$INPUT""#,
            r#"{"event":"PreToolUse"}"#,
            Duration::from_secs(5),
            true,
        )
        .await;
        match outcome {
            CommandOutcome::Completed { stdout, .. } => {
                assert!(stdout.contains("PreToolUse"));
            },
            other => panic!("expected Completed, got {other:?}"),
        }
    }
}

impl std::fmt::Debug for CommandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed { stdout, exit_code, .. } => f
                .debug_struct("Completed")
                .field("stdout", stdout)
                .field("exit_code", exit_code)
                .finish(),
            Self::SpawnFailed { stderr } => f.debug_struct("SpawnFailed").field("stderr", stderr).finish(),
            Self::TimedOut => f.write_str("TimedOut"),
        }
    }
}
