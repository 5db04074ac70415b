//! Post-merge migrations for deprecated configuration keys (spec.md §4.1).

use serde_json::{Value, json};

/// Apply the two named migrations in place, after all five sources have
/// been merged:
///
/// - `allowedTools` present and `permissions` absent ⇒ moved to
///   `permissions.allow`.
/// - `ignorePatterns` present and `permissions` exists ⇒ appended to
///   `permissions.deny`.
pub fn apply_migrations(config: &mut Value) {
    let Value::Object(map) = config else { return };

    let allowed_tools = map.remove("allowedTools");
    let ignore_patterns = map.remove("ignorePatterns");

    let permissions_absent_before = !map.contains_key("permissions");

    if let Some(allowed_tools) = allowed_tools
        && permissions_absent_before
    {
        map.insert(
            "permissions".to_string(),
            json!({ "allow": allowed_tools }),
        );
    }

    if let Some(Value::Array(patterns)) = ignore_patterns
        && let Some(Value::Object(permissions)) = map.get_mut("permissions")
    {
        let deny = permissions
            .entry("deny")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(deny_arr) = deny {
            for pattern in patterns {
                if !deny_arr.contains(&pattern) {
                    deny_arr.push(pattern);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_tools_migrates_when_permissions_absent() {
        let mut config = json!({"allowedTools": ["Bash", "Read"]});
        apply_migrations(&mut config);
        assert_eq!(config["permissions"]["allow"], json!(["Bash", "Read"]));
        assert!(config.get("allowedTools").is_none());
    }

    #[test]
    fn allowed_tools_does_not_override_existing_permissions() {
        let mut config = json!({
            "allowedTools": ["Bash"],
            "permissions": {"allow": ["Read"]},
        });
        apply_migrations(&mut config);
        assert_eq!(config["permissions"]["allow"], json!(["Read"]));
    }

    #[test]
    fn ignore_patterns_appends_to_deny_when_permissions_exists() {
        let mut config = json!({
            "ignorePatterns": ["*.log"],
            "permissions": {"deny": ["/etc"]},
        });
        apply_migrations(&mut config);
        assert_eq!(config["permissions"]["deny"], json!(["/etc", "*.log"]));
        assert!(config.get("ignorePatterns").is_none());
    }

    #[test]
    fn ignore_patterns_dropped_when_permissions_absent() {
        let mut config = json!({"ignorePatterns": ["*.log"]});
        apply_migrations(&mut config);
        assert!(config.get("permissions").is_none());
    }
}
