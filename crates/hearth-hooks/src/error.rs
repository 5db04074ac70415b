//! Crate-local error type, converted into the unified [`HearthError`]
//! taxonomy at the boundary. Mirrors `hearth-config::error::ConfigError`'s
//! shape.

use hearth_core::HearthError;
use thiserror::Error;

/// Errors produced while registering or running hooks.
#[derive(Debug, Error)]
pub enum HookError {
    /// A command hook's subprocess could not be spawned.
    #[error("failed to spawn hook command `{command}`: {source}")]
    Spawn {
        /// The shell command that failed to spawn.
        command: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A command hook timed out.
    #[error("hook command `{command}` timed out after {timeout_seconds}s")]
    Timeout {
        /// The shell command that timed out.
        command: String,
        /// The configured timeout.
        timeout_seconds: u64,
    },

    /// A command hook exited non-zero.
    #[error("hook command `{command}` exited with code {exit_code:?}: {stderr}")]
    NonZeroExit {
        /// The shell command that failed.
        command: String,
        /// Its exit code, if the process terminated normally.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },
}

impl From<HookError> for HearthError {
    fn from(err: HookError) -> Self {
        HearthError::hook(err.to_string())
    }
}
