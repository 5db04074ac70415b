//! In-flight tracking for hooks that returned `{async: true}`.
//!
//! New bookkeeping structure (the teacher has no async-hook concept); the
//! process-wide, mutex-guarded map pattern is grounded on
//! `astrid-runtime`'s shared-registry style (see `hearth-core::Conversation`
//! for the same guarded-map idiom applied to tool-use ids).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::event::HookEvent;
use crate::response::HookResponse;

/// An in-flight async hook record.
#[derive(Debug, Clone)]
pub struct AsyncHook {
    /// The hook invocation's id.
    pub id: Uuid,
    /// The subprocess's OS process id, if this was a command hook.
    pub process_id: Option<u32>,
    /// The originating event.
    pub event: HookEvent,
    /// The tool name, for `PreToolUse`/`PostToolUse`.
    pub tool_name: Option<String>,
    /// The shell command string, for command hooks.
    pub command: Option<String>,
    /// When the hook was registered.
    pub start_time: Instant,
    /// Its timeout.
    pub timeout: Duration,
    /// Stdout accumulated since registration.
    pub stdout_buffer: String,
    /// Whether a final response has already been delivered.
    pub response_attachment_sent: bool,
}

/// Process-wide registry of pending async hooks.
#[derive(Default)]
pub struct AsyncHookRegistry {
    pending: DashMap<Uuid, AsyncHook>,
}

impl AsyncHookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly-started async hook.
    pub fn register(&self, hook: AsyncHook) {
        self.pending.insert(hook.id, hook);
    }

    /// Append to a pending hook's stdout buffer (called as new output
    /// arrives from its subprocess).
    pub fn append_stdout(&self, id: Uuid, chunk: &str) {
        if let Some(mut hook) = self.pending.get_mut(&id) {
            hook.stdout_buffer.push_str(chunk);
        }
    }

    /// Scan every pending hook: for each JSON-parseable line in its
    /// buffer that is not itself an async marker, attach it as the
    /// delivered response. Hooks past their timeout are marked delivered
    /// with an empty result and no response is synthesized (DESIGN.md
    /// open question #2).
    pub fn check_async_responses(&self) -> Vec<(Uuid, Option<HookResponse>)> {
        let mut delivered = Vec::new();

        for mut entry in self.pending.iter_mut() {
            if entry.response_attachment_sent {
                continue;
            }

            let mut found = None;
            for line in entry.stdout_buffer.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || HookResponse::is_async_marker(trimmed) {
                    continue;
                }
                found = Some(HookResponse::parse(trimmed));
                break;
            }

            if let Some(response) = found {
                entry.response_attachment_sent = true;
                delivered.push((entry.id, Some(response)));
            } else if entry.start_time.elapsed() >= entry.timeout {
                entry.response_attachment_sent = true;
                delivered.push((entry.id, None));
            }
        }

        for (id, _) in &delivered {
            self.pending.remove(id);
        }
        delivered
    }

    /// Number of hooks still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(id: Uuid, timeout: Duration) -> AsyncHook {
        AsyncHook {
            id,
            process_id: None,
            event: HookEvent::PreToolUse,
            tool_name: Some("Bash".to_string()),
            command: Some("check.sh".to_string()),
            start_time: Instant::now(),
            timeout,
            stdout_buffer: String::new(),
            response_attachment_sent: false,
        }
    }

    #[test]
    fn delivers_first_non_async_marker_line() {
        let registry = AsyncHookRegistry::new();
        let id = Uuid::new_v4();
        registry.register(hook(id, Duration::from_secs(60)));
        registry.append_stdout(id, "{\"async\": true}\n{\"decision\": \"approve\"}\n");

        let delivered = registry.check_async_responses();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, id);
        assert!(delivered[0].1.is_some());
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn timed_out_hook_delivers_empty_result() {
        let registry = AsyncHookRegistry::new();
        let id = Uuid::new_v4();
        registry.register(hook(id, Duration::from_millis(0)));

        let delivered = registry.check_async_responses();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].1.is_none());
    }

    #[test]
    fn still_pending_hook_is_left_untouched() {
        let registry = AsyncHookRegistry::new();
        let id = Uuid::new_v4();
        registry.register(hook(id, Duration::from_secs(60)));

        let delivered = registry.check_async_responses();
        assert!(delivered.is_empty());
        assert_eq!(registry.pending_count(), 1);
    }
}
