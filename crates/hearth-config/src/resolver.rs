//! Layered configuration resolution, caching, and change notification.
//!
//! Grounded on `astrid-config::loader::load` for the read-parse-merge
//! pipeline and TOCTOU-safe file reads, generalized from a TOML
//! defaults+system+user+workspace stack to the five JSON sources named in
//! `ConfigSource`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use hearth_core::HearthResult;

use crate::error::ConfigError;
use crate::merge;
use crate::migrate;
use crate::source::ConfigSource;

/// 1 MB, matching the teacher's config-file size limit.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Resolves the five configuration sources into one merged, migrated
/// document, caching the result until invalidated by [`ConfigResolver::save`]
/// or a file-change notification from [`ConfigResolver::watch`].
pub struct ConfigResolver {
    cwd: PathBuf,
    cache: Mutex<Option<Value>>,
}

impl ConfigResolver {
    /// Create a resolver rooted at `cwd` (used to locate `projectSettings`
    /// and `localSettings`).
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            cache: Mutex::new(None),
        }
    }

    /// Return the merged, migrated configuration, computing and caching it
    /// on first call.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a present file cannot be read or fails
    /// to parse as JSON. A *missing* file is not an error: it contributes
    /// an empty overlay.
    pub fn get_merged(&self) -> HearthResult<Value> {
        if let Some(cached) = self.cache.lock().unwrap().clone() {
            return Ok(cached);
        }

        let mut overlays = Vec::new();
        let mut seen_paths = Vec::new();
        for source in ConfigSource::priority_order() {
            let Some(path) = source.path(&self.cwd) else {
                continue;
            };
            let Ok(canonical) = path.canonicalize() else {
                // Missing file: empty overlay, not an error.
                continue;
            };
            if seen_paths.contains(&canonical) {
                continue;
            }
            seen_paths.push(canonical);

            match try_load_file(&path) {
                Ok(Some(value)) => overlays.push(value),
                Ok(None) => {},
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable configuration source");
                },
            }
        }

        let mut merged = merge::merge_all(&overlays);
        migrate::apply_migrations(&mut merged);

        *self.cache.lock().unwrap() = Some(merged.clone());
        Ok(merged)
    }

    /// Persist `config` to `source`, failing if the source is read-only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadOnlySource`] for `policySettings` or
    /// `flagSettings`, [`ConfigError::NoLocation`] if the source has no
    /// filesystem location, and an IO error if the write fails.
    pub fn save(&self, source: ConfigSource, config: &Value) -> HearthResult<()> {
        if !source.is_writable() {
            return Err(ConfigError::ReadOnlySource(source).into());
        }
        let path = source
            .path(&self.cwd)
            .ok_or(ConfigError::NoLocation(source))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        }

        let serialized = serde_json::to_vec_pretty(config).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        std::fs::write(&path, serialized).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        self.clear_cache();
        debug!(path = %path.display(), ?source, "saved configuration source");
        Ok(())
    }

    /// Drop the cached merged configuration, forcing the next
    /// [`ConfigResolver::get_merged`] call to recompute it from disk.
    pub fn clear_cache(&self) {
        *self.cache.lock().unwrap() = None;
    }

    /// Diff the currently cached merged configuration against a freshly
    /// recomputed one, returning the set of top-level keys whose value
    /// changed, was added, or was removed. Does not mutate the cache.
    ///
    /// Supplements the named sources with a bookkeeping operation in the
    /// spirit of the teacher's `FieldSources` provenance tracking, adapted
    /// to report *what changed* rather than *which layer owns each field*.
    ///
    /// # Errors
    ///
    /// Propagates any error from recomputing the merged configuration.
    pub fn get_configuration_changes(&self) -> HearthResult<Vec<String>> {
        let before = self.cache.lock().unwrap().clone();
        self.clear_cache();
        let after = self.get_merged()?;

        let Some(Value::Object(before_map)) = before else {
            let Value::Object(after_map) = &after else {
                return Ok(Vec::new());
            };
            return Ok(after_map.keys().cloned().collect());
        };
        let Value::Object(after_map) = &after else {
            return Ok(before_map.keys().cloned().collect());
        };

        let mut changed: Vec<String> = before_map
            .iter()
            .filter(|(key, value)| after_map.get(*key) != Some(value))
            .map(|(key, _)| key.clone())
            .chain(
                after_map
                    .keys()
                    .filter(|key| !before_map.contains_key(*key))
                    .cloned(),
            )
            .collect();
        changed.sort();
        changed.dedup();
        Ok(changed)
    }
}

/// Try to load a file, returning `None` if it doesn't exist. Reads before
/// checking size to avoid a TOCTOU race between `stat` and `read`.
fn try_load_file(path: &Path) -> Result<Option<Value>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "configuration source not present");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.display().to_string(),
            size: content.len() as u64,
        });
    }

    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_sources_yield_empty_merged_config() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path().to_path_buf());
        let merged = resolver.get_merged().unwrap();
        assert_eq!(merged, json!({}));
    }

    #[test]
    fn project_settings_are_read_and_merged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".claude.json"),
            json!({"mainLoopModel": "claude-x"}).to_string(),
        )
        .unwrap();

        let resolver = ConfigResolver::new(dir.path().to_path_buf());
        let merged = resolver.get_merged().unwrap();
        assert_eq!(merged["mainLoopModel"], json!("claude-x"));
    }

    #[test]
    fn get_merged_is_cached_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path().to_path_buf());
        assert_eq!(resolver.get_merged().unwrap(), json!({}));

        std::fs::write(
            dir.path().join(".claude.json"),
            json!({"mainLoopModel": "claude-x"}).to_string(),
        )
        .unwrap();
        assert_eq!(resolver.get_merged().unwrap(), json!({}));

        resolver.clear_cache();
        assert_eq!(resolver.get_merged().unwrap()["mainLoopModel"], json!("claude-x"));
    }

    #[test]
    fn save_refuses_read_only_sources() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path().to_path_buf());
        let err = resolver
            .save(ConfigSource::PolicySettings, &json!({}))
            .unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn save_writes_and_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path().to_path_buf());
        resolver.get_merged().unwrap();

        resolver
            .save(ConfigSource::ProjectSettings, &json!({"mainLoopModel": "claude-y"}))
            .unwrap();

        assert_eq!(
            resolver.get_merged().unwrap()["mainLoopModel"],
            json!("claude-y")
        );
    }

    #[test]
    fn get_configuration_changes_reports_added_and_changed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path().to_path_buf());
        resolver.get_merged().unwrap();

        std::fs::write(
            dir.path().join(".claude.json"),
            json!({"mainLoopModel": "claude-x"}).to_string(),
        )
        .unwrap();

        let changes = resolver.get_configuration_changes().unwrap();
        assert_eq!(changes, vec!["mainLoopModel".to_string()]);
    }
}
