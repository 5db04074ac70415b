//! Debounced filesystem watching over the five configuration sources.

use std::path::PathBuf;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use hearth_core::{HearthError, HearthResult};

use crate::source::ConfigSource;

/// Debounce window for coalescing bursts of filesystem events (editors
/// frequently emit several writes per save) into a single notification.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watch every resolvable source location for changes, invoking `on_change`
/// (debounced) whenever any of them are modified. Runs until the returned
/// handle is dropped.
///
/// # Errors
///
/// Returns a [`HearthError`] if the underlying OS watcher cannot be
/// installed.
pub fn watch(
    cwd: &std::path::Path,
    mut on_change: impl FnMut() + Send + 'static,
) -> HearthResult<WatchHandle> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |event| {
        if let Ok(event) = event {
            let _ = tx.send(event);
        }
    })
    .map_err(|e| HearthError::config(format!("failed to install config watcher: {e}")))?;

    let mut watched_dirs: Vec<PathBuf> = Vec::new();
    for source in ConfigSource::priority_order() {
        let Some(path) = source.path(cwd) else {
            continue;
        };
        let Some(dir) = path.parent() else { continue };
        if watched_dirs.iter().any(|w| w == dir) || !dir.exists() {
            continue;
        }
        if watcher.watch(dir, RecursiveMode::NonRecursive).is_ok() {
            watched_dirs.push(dir.to_path_buf());
        } else {
            warn!(path = %dir.display(), "could not watch configuration directory");
        }
    }

    let handle = tokio::spawn(async move {
        loop {
            let Some(_first) = rx.recv().await else {
                return;
            };
            // Drain any further events that arrive inside the debounce
            // window so a burst of writes collapses into one callback.
            tokio::time::sleep(DEBOUNCE).await;
            while rx.try_recv().is_ok() {}
            on_change();
        }
    });

    Ok(WatchHandle {
        _watcher: watcher,
        task: handle,
    })
}

/// Keeps the underlying OS watcher and debounce task alive. Dropping it
/// stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watch_notifies_on_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".claude.json");
        std::fs::write(&path, "{}").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let _handle = watch(dir.path(), move || {
            let _ = tx.send(());
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, r#"{"mainLoopModel":"claude-x"}"#).unwrap();

        let notified = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(notified.is_ok());
    }
}
