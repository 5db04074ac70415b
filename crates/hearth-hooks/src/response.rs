//! `HookResponse` parsing: either an async marker or a sync response
//! carrying optional effect fields, per spec.md §3/§4.3.
//!
//! Grounded on `astrid-hooks::result::HookResult`'s tagged-enum shape,
//! generalized to the flat, all-fields-optional object the spec
//! describes (a single JSON object that may carry any subset of
//! `continue`/`decision`/`reason`/... rather than a closed tagged enum).

use serde::Deserialize;
use serde_json::Value;

/// A decision carried by `decision` or `hookSpecificOutput.permissionDecision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// `decision = "approve"`.
    Approve,
    /// `decision = "block"`.
    Block,
}

/// `hookSpecificOutput.permissionDecision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Proceed with the tool call.
    Allow,
    /// Deny the tool call.
    Deny,
    /// Fall through to the base permission-resolution flow.
    Ask,
}

#[derive(Debug, Deserialize)]
struct HookSpecificOutput {
    #[serde(rename = "permissionDecision")]
    permission_decision: Option<PermissionDecision>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHookResponse {
    #[serde(rename = "async")]
    is_async: Option<bool>,
    #[serde(rename = "asyncTimeout")]
    async_timeout: Option<u64>,
    #[serde(rename = "continue")]
    should_continue: Option<bool>,
    #[serde(rename = "suppressOutput")]
    suppress_output: Option<bool>,
    decision: Option<Decision>,
    reason: Option<String>,
    #[serde(rename = "systemMessage")]
    system_message: Option<String>,
    #[serde(rename = "additionalContext")]
    additional_context: Option<String>,
    #[serde(rename = "hookSpecificOutput")]
    hook_specific_output: Option<HookSpecificOutput>,
}

/// A parsed hook response: either a deferred async marker or a sync
/// response carrying zero or more effect fields.
#[derive(Debug, Clone, Default)]
pub struct HookResponse {
    /// Set when the hook returned `{async: true}`.
    pub is_async: bool,
    /// `asyncTimeout`, if the hook is async and specified one.
    pub async_timeout: Option<u64>,
    /// `continue = false` halts the current iteration.
    pub should_continue: bool,
    /// Whether to suppress the hook's own output from the transcript.
    pub suppress_output: bool,
    /// `decision`, approve/block.
    pub decision: Option<Decision>,
    /// `hookSpecificOutput.permissionDecision` — for `PreToolUse`,
    /// overrides `decision`.
    pub permission_decision: Option<PermissionDecision>,
    /// Human-readable reason, from `reason` or `hookSpecificOutput.reason`.
    pub reason: Option<String>,
    /// Surfaced to the UI as-is.
    pub system_message: Option<String>,
    /// Injected as extra system/user content on the next turn.
    pub additional_context: Option<String>,
}

impl HookResponse {
    /// Parse one hook's stdout. If it doesn't start with `{`, it is
    /// treated as plain additional context rather than a structured
    /// response (spec.md §6, hook subprocess protocol).
    #[must_use]
    pub fn parse(stdout: &str) -> Self {
        let trimmed = stdout.trim();
        if !trimmed.starts_with('{') {
            return Self {
                should_continue: true,
                additional_context: if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                },
                ..Self::default()
            };
        }

        let Ok(raw) = serde_json::from_str::<RawHookResponse>(trimmed) else {
            return Self {
                should_continue: true,
                ..Self::default()
            };
        };

        let (permission_decision, hook_specific_reason) = raw
            .hook_specific_output
            .map(|out| (out.permission_decision, out.reason))
            .unwrap_or((None, None));

        Self {
            is_async: raw.is_async.unwrap_or(false),
            async_timeout: raw.async_timeout,
            should_continue: raw.should_continue.unwrap_or(true),
            suppress_output: raw.suppress_output.unwrap_or(false),
            decision: raw.decision,
            permission_decision,
            reason: raw.reason.or(hook_specific_reason),
            system_message: raw.system_message,
            additional_context: raw.additional_context,
        }
    }

    /// `true` if this line, parsed standalone, is itself an async marker
    /// (used by `check_async_responses` to distinguish buffered progress
    /// lines from a delivered final response).
    #[must_use]
    pub fn is_async_marker(line: &str) -> bool {
        serde_json::from_str::<Value>(line.trim())
            .ok()
            .and_then(|v| v.get("async").and_then(Value::as_bool))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_stdout_becomes_additional_context() {
        let resp = HookResponse::parse("just some log output");
        assert!(resp.should_continue);
        assert_eq!(resp.additional_context.as_deref(), Some("just some log output"));
    }

    #[test]
    fn async_marker_is_recognized() {
        let resp = HookResponse::parse(r#"{"async": true, "asyncTimeout": 5000}"#);
        assert!(resp.is_async);
        assert_eq!(resp.async_timeout, Some(5000));
    }

    #[test]
    fn block_decision_carries_reason() {
        let resp = HookResponse::parse(r#"{"decision": "block", "reason": "policy"}"#);
        assert_eq!(resp.decision, Some(Decision::Block));
        assert_eq!(resp.reason.as_deref(), Some("policy"));
    }

    #[test]
    fn hook_specific_output_permission_decision_overrides() {
        let resp = HookResponse::parse(
            r#"{"hookSpecificOutput": {"permissionDecision": "deny", "reason": "no"}}"#,
        );
        assert_eq!(resp.permission_decision, Some(PermissionDecision::Deny));
        assert_eq!(resp.reason.as_deref(), Some("no"));
    }

    #[test]
    fn continue_false_is_respected() {
        let resp = HookResponse::parse(r#"{"continue": false, "reason": "stop here"}"#);
        assert!(!resp.should_continue);
    }

    #[test]
    fn malformed_json_defaults_to_continue() {
        let resp = HookResponse::parse("{not valid json");
        assert!(resp.should_continue);
    }
}
