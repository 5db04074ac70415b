//! Hook registry: loads `hooks.<EventName>` from merged configuration,
//! matches hooks against an event's match value, and tracks configuration
//! reloads for `SessionStart`.
//!
//! Grounded on `astrid-hooks::executor`'s registration/lookup shape,
//! simplified from the teacher's capability-gated, capsule-scoped registry
//! down to spec.md's single process-wide table.

use std::sync::RwLock;

use serde_json::Value;
use tracing::warn;

use crate::definition::{HookDefinition, HookType};
use crate::event::HookEvent;
use crate::matcher;

/// Holds every registered hook, grouped by event, plus the raw
/// configuration snapshot used to detect reloads.
pub struct HookRegistry {
    hooks: RwLock<Vec<HookDefinition>>,
    last_config: RwLock<Value>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
            last_config: RwLock::new(Value::Null),
        }
    }
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry's command hooks with those parsed from
    /// `config`'s `hooks.<EventName>` arrays. Callback hooks registered
    /// via [`HookRegistry::register`] are preserved.
    pub fn load_from_config(&self, config: &Value) {
        let mut parsed = Vec::new();
        if let Some(hooks_section) = config.get("hooks").and_then(Value::as_object) {
            for (event_name, matchers) in hooks_section {
                let Some(event) = parse_event_name(event_name) else {
                    warn!(event = event_name, "unknown hook event in configuration, skipping");
                    continue;
                };
                let Some(matchers) = matchers.as_array() else {
                    continue;
                };
                for entry in matchers {
                    let matcher = entry
                        .get("matcher")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string();
                    let Some(hook_list) = entry.get("hooks").and_then(Value::as_array) else {
                        continue;
                    };
                    for hook_spec in hook_list {
                        let Some("command") = hook_spec.get("type").and_then(Value::as_str) else {
                            continue;
                        };
                        let Some(command) = hook_spec.get("command").and_then(Value::as_str) else {
                            continue;
                        };
                        let mut definition = HookDefinition::command(event, matcher.clone(), command);
                        if let Some(timeout) = hook_spec.get("timeout").and_then(Value::as_u64) {
                            definition = definition.with_timeout(timeout);
                        }
                        parsed.push(definition);
                    }
                }
            }
        }

        let mut hooks = self.hooks.write().unwrap();
        hooks.retain(|h| matches!(h.hook_type, HookType::Callback(_)));
        hooks.extend(parsed);

        *self.last_config.write().unwrap() = config.clone();
    }

    /// Register a programmatic callback hook.
    pub fn register(&self, hook: HookDefinition) {
        self.hooks.write().unwrap().push(hook);
    }

    /// Every hook whose event matches `event` and whose matcher matches
    /// `match_value`, with command hooks deduplicated by command string
    /// and callback hooks concatenated unchanged.
    #[must_use]
    pub fn hooks_for(&self, event: HookEvent, match_value: &str) -> Vec<HookDefinition> {
        let hooks = self.hooks.read().unwrap();
        let mut seen_commands = std::collections::HashSet::new();
        let mut result = Vec::new();

        for hook in hooks.iter() {
            if hook.event != event || !matcher::matches(&hook.matcher, match_value) {
                continue;
            }
            match &hook.hook_type {
                HookType::Command { command } => {
                    if seen_commands.insert(command.clone()) {
                        result.push(hook.clone());
                    }
                },
                HookType::Callback(_) => result.push(hook.clone()),
            }
        }
        result
    }

    /// Human-readable diff between the last-loaded configuration and
    /// `current`, restricted to the `hooks.*` keys. Used by `SessionStart`
    /// to detect reloads.
    #[must_use]
    pub fn get_configuration_changes(&self, current: &Value) -> Vec<String> {
        let previous = self.last_config.read().unwrap();
        let prev_hooks = previous.get("hooks");
        let curr_hooks = current.get("hooks");

        match (prev_hooks, curr_hooks) {
            (None, None) => Vec::new(),
            (None, Some(_)) => vec!["hooks configuration added".to_string()],
            (Some(_), None) => vec!["hooks configuration removed".to_string()],
            (Some(prev), Some(curr)) => {
                let mut changes = Vec::new();
                let prev_obj = prev.as_object().cloned().unwrap_or_default();
                let curr_obj = curr.as_object().cloned().unwrap_or_default();

                for key in prev_obj.keys().chain(curr_obj.keys()).collect::<std::collections::HashSet<_>>() {
                    match (prev_obj.get(key), curr_obj.get(key)) {
                        (Some(p), Some(c)) if p != c => {
                            changes.push(format!("hooks.{key} changed"));
                        },
                        (Some(_), None) => changes.push(format!("hooks.{key} removed")),
                        (None, Some(_)) => changes.push(format!("hooks.{key} added")),
                        _ => {},
                    }
                }
                changes.sort();
                changes
            },
        }
    }
}

fn parse_event_name(name: &str) -> Option<HookEvent> {
    match name {
        "PreToolUse" => Some(HookEvent::PreToolUse),
        "PostToolUse" => Some(HookEvent::PostToolUse),
        "UserPromptSubmit" => Some(HookEvent::UserPromptSubmit),
        "SessionStart" => Some(HookEvent::SessionStart),
        "SessionEnd" => Some(HookEvent::SessionEnd),
        "PreCompact" => Some(HookEvent::PreCompact),
        "Notification" => Some(HookEvent::Notification),
        "Stop" => Some(HookEvent::Stop),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> Value {
        json!({
            "hooks": {
                "PreToolUse": [{
                    "matcher": "Bash",
                    "hooks": [{"type": "command", "command": "/bin/check.sh"}],
                }]
            }
        })
    }

    #[test]
    fn loads_command_hooks_from_config() {
        let registry = HookRegistry::new();
        registry.load_from_config(&sample_config());

        let matched = registry.hooks_for(HookEvent::PreToolUse, "Bash");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].command_str(), Some("/bin/check.sh"));

        assert!(registry.hooks_for(HookEvent::PreToolUse, "Read").is_empty());
    }

    #[test]
    fn duplicate_commands_are_deduplicated() {
        let config = json!({
            "hooks": {
                "PreToolUse": [
                    {"matcher": "*", "hooks": [{"type": "command", "command": "same.sh"}]},
                    {"matcher": "*", "hooks": [{"type": "command", "command": "same.sh"}]},
                ]
            }
        });
        let registry = HookRegistry::new();
        registry.load_from_config(&config);
        assert_eq!(registry.hooks_for(HookEvent::PreToolUse, "Bash").len(), 1);
    }

    #[test]
    fn reloading_preserves_callback_hooks() {
        let registry = HookRegistry::new();
        registry.register(HookDefinition::callback(
            HookEvent::SessionStart,
            "*",
            std::sync::Arc::new(|_| Ok(crate::response::HookResponse::default())),
        ));
        registry.load_from_config(&sample_config());

        assert_eq!(registry.hooks_for(HookEvent::SessionStart, "startup").len(), 1);
        assert_eq!(registry.hooks_for(HookEvent::PreToolUse, "Bash").len(), 1);
    }

    #[test]
    fn get_configuration_changes_reports_added_hook_events() {
        let registry = HookRegistry::new();
        let changes = registry.get_configuration_changes(&sample_config());
        assert_eq!(changes, vec!["hooks.PreToolUse added".to_string()]);
    }
}
