//! `HookDefinition`: the static, configuration-sourced description of one
//! hook (spec.md §3). Grounded on `astrid-hooks::hook::Hook`, trimmed down
//! from the teacher's five-handler-kind (`Command`/`Http`/`Wasm`/`Agent`)
//! shape to spec.md's two (`command`/`callback`).

use std::sync::Arc;

use hearth_core::HearthResult;

use crate::response::HookResponse;

/// A user-supplied in-process hook, invoked directly rather than spawned
/// as a subprocess. Not configuration-sourced; registered programmatically
/// (e.g. by `hearth-cli` or an embedding application).
pub type CallbackHook = Arc<dyn Fn(&serde_json::Value) -> HearthResult<HookResponse> + Send + Sync>;

/// How a hook is invoked.
#[derive(Clone)]
pub enum HookType {
    /// Spawn `command` as a shell subprocess.
    Command {
        /// The shell command string.
        command: String,
    },
    /// Invoke an in-process callback.
    Callback(CallbackHook),
}

impl std::fmt::Debug for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command { command } => f.debug_struct("Command").field("command", command).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Default hook timeout, per spec.md §3/§5.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// One hook's static definition.
#[derive(Debug, Clone)]
pub struct HookDefinition {
    /// The lifecycle event this hook listens for.
    pub event: crate::event::HookEvent,
    /// Matcher string (see `crate::matcher`).
    pub matcher: String,
    /// How to invoke it.
    pub hook_type: HookType,
    /// Timeout in seconds before the hook is considered failed/timed out.
    pub timeout_seconds: u64,
}

impl HookDefinition {
    /// Build a command hook with the default timeout.
    #[must_use]
    pub fn command(
        event: crate::event::HookEvent,
        matcher: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            event,
            matcher: matcher.into(),
            hook_type: HookType::Command {
                command: command.into(),
            },
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Build a callback hook with the default timeout.
    #[must_use]
    pub fn callback(event: crate::event::HookEvent, matcher: impl Into<String>, callback: CallbackHook) -> Self {
        Self {
            event,
            matcher: matcher.into(),
            hook_type: HookType::Callback(callback),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Override the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// The subprocess command string, if this is a command hook.
    #[must_use]
    pub fn command_str(&self) -> Option<&str> {
        match &self.hook_type {
            HookType::Command { command } => Some(command),
            HookType::Callback(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HookEvent;

    #[test]
    fn command_hook_defaults_to_sixty_second_timeout() {
        let hook = HookDefinition::command(HookEvent::PreToolUse, "Bash", "/usr/local/bin/check.sh");
        assert_eq!(hook.timeout_seconds, 60);
        assert_eq!(hook.command_str(), Some("/usr/local/bin/check.sh"));
    }

    #[test]
    fn with_timeout_overrides_default() {
        let hook = HookDefinition::command(HookEvent::PreToolUse, "*", "echo").with_timeout(5);
        assert_eq!(hook.timeout_seconds, 5);
    }
}
