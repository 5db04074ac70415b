//! Deep-merge algorithm used to fold the five configuration sources into
//! one accumulator, lowest-precedence first.
//!
//! Rules (spec.md §3, §4.1): arrays deduplicate-union, objects recurse,
//! `null` deletes the key (the nearest JSON equivalent of the source
//! system's `undefined`-deletes rule — JSON has no `undefined`), and
//! primitives override.

use serde_json::Value;

/// Merge `overlay` into `base` in place, `overlay` taking precedence.
pub fn merge_into(base: &mut Value, overlay: &Value) {
    let Value::Object(overlay_map) = overlay else {
        // A non-object overlay at this position simply replaces base,
        // matching the "primitives override" rule for the case where an
        // entire source is itself an array or scalar (malformed but not
        // our job to reject here).
        *base = overlay.clone();
        return;
    };

    let Value::Object(base_map) = base else {
        *base = overlay.clone();
        return;
    };

    for (key, overlay_value) in overlay_map {
        if overlay_value.is_null() {
            base_map.remove(key);
            continue;
        }

        match base_map.get_mut(key) {
            Some(existing) => match (existing.is_array(), overlay_value.is_array()) {
                (true, true) => merge_arrays(existing, overlay_value),
                _ => match (existing.is_object(), overlay_value.is_object()) {
                    (true, true) => merge_into(existing, overlay_value),
                    _ => *existing = overlay_value.clone(),
                },
            },
            None => {
                base_map.insert(key.clone(), overlay_value.clone());
            },
        }
    }
}

fn merge_arrays(existing: &mut Value, overlay: &Value) {
    let (Value::Array(existing_arr), Value::Array(overlay_arr)) = (existing, overlay) else {
        unreachable!("merge_arrays called with non-array argument");
    };
    for item in overlay_arr {
        if !existing_arr.contains(item) {
            existing_arr.push(item.clone());
        }
    }
}

/// Fold `sources` (already lowest-precedence-first) into a single merged
/// value, starting from an empty object.
#[must_use]
pub fn merge_all(sources: &[Value]) -> Value {
    let mut acc = Value::Object(serde_json::Map::new());
    for source in sources {
        merge_into(&mut acc, source);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arrays_dedupe_union_in_order() {
        let mut acc = json!({});
        merge_into(&mut acc, &json!({"permissions": {"allow": ["X"]}}));
        merge_into(&mut acc, &json!({"permissions": {"allow": ["Y"]}}));
        merge_into(&mut acc, &json!({"permissions": {"allow": ["Z"]}}));
        assert_eq!(acc["permissions"]["allow"], json!(["X", "Y", "Z"]));
    }

    #[test]
    fn duplicate_array_entries_do_not_repeat() {
        let mut acc = json!({"tags": ["a", "b"]});
        merge_into(&mut acc, &json!({"tags": ["b", "c"]}));
        assert_eq!(acc["tags"], json!(["a", "b", "c"]));
    }

    #[test]
    fn null_deletes_key() {
        let mut acc = json!({"mainLoopModel": "claude-3"});
        merge_into(&mut acc, &json!({"mainLoopModel": null}));
        assert!(acc.get("mainLoopModel").is_none());
    }

    #[test]
    fn objects_recurse() {
        let mut acc = json!({"permissions": {"allow": ["X"], "deny": ["A"]}});
        merge_into(&mut acc, &json!({"permissions": {"deny": ["B"]}}));
        assert_eq!(acc["permissions"]["allow"], json!(["X"]));
        assert_eq!(acc["permissions"]["deny"], json!(["A", "B"]));
    }

    #[test]
    fn primitives_override() {
        let mut acc = json!({"maxThinkingTokens": 1000});
        merge_into(&mut acc, &json!({"maxThinkingTokens": 2000}));
        assert_eq!(acc["maxThinkingTokens"], json!(2000));
    }

    #[test]
    fn merge_is_idempotent() {
        let a = json!({"permissions": {"allow": ["X"]}, "mainLoopModel": "m1"});
        let b = json!({"permissions": {"allow": ["Y"]}, "mainLoopModel": "m2"});

        let mut once = a.clone();
        merge_into(&mut once, &b);

        let mut twice = once.clone();
        merge_into(&mut twice, &b);

        assert_eq!(once, twice);
    }

    #[test]
    fn merge_all_applies_sources_lowest_first() {
        let merged = merge_all(&[
            json!({"permissions": {"allow": ["X"]}}),
            json!({"permissions": {"allow": ["Y"]}}),
            json!({"permissions": {"allow": ["Z"]}}),
        ]);
        assert_eq!(merged["permissions"]["allow"], json!(["X", "Y", "Z"]));
    }
}
