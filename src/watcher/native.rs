//! OS-backed directory watcher built on the `notify` crate.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::ChangeWatcher;

/// Watches one keystore directory through the platform's native
/// notification mechanism (inotify, FSEvents, ReadDirectoryChangesW) and
/// invokes a callback on every relevant event.
///
/// The callback runs on the notification backend's thread; it is expected
/// to trigger a cache reload and must therefore be cheap to call
/// repeatedly and safe to call concurrently with cache lookups.
pub struct NotifyWatcher {
    root: PathBuf,
    on_change: Arc<dyn Fn() + Send + Sync>,
    inner: Option<RecommendedWatcher>,
}

impl NotifyWatcher {
    /// A stopped watcher for `root`. Nothing happens until `start`.
    pub fn new(root: impl Into<PathBuf>, on_change: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            root: root.into(),
            on_change: Arc::new(on_change),
            inner: None,
        }
    }
}

impl ChangeWatcher for NotifyWatcher {
    fn start(&mut self) {
        if self.inner.is_some() {
            return;
        }
        let on_change = Arc::clone(&self.on_change);
        let mut watcher = match recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    // Reads don't change the directory contents.
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    on_change();
                }
                Err(err) => log::debug!("keystore watch error: {err}"),
            }
        }) {
            Ok(watcher) => watcher,
            Err(err) => {
                log::debug!("failed to create keystore watcher: {err}");
                return;
            }
        };
        // Fails while the keystore directory does not exist yet; the cache
        // retries on its reload schedule.
        if let Err(err) = watcher.watch(&self.root, RecursiveMode::NonRecursive) {
            log::debug!("failed to watch {}: {err}", self.root.display());
            return;
        }
        log::trace!("started watching {}", self.root.display());
        self.inner = Some(watcher);
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            log::trace!("stopped watching {}", self.root.display());
        }
    }

    fn is_running(&self) -> bool {
        self.inner.is_some()
    }
}

impl fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("root", &self.root)
            .field("running", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_start_against_missing_directory_stays_stopped() {
        let mut watcher = NotifyWatcher::new("/no/such/directory", || {});
        watcher.start();
        assert!(!watcher.is_running());
    }

    #[test]
    fn test_start_is_idempotent_and_close_stops() {
        let dir = TempDir::new().unwrap();
        let mut watcher = NotifyWatcher::new(dir.path(), || {});
        watcher.start();
        assert!(watcher.is_running());
        watcher.start();
        assert!(watcher.is_running());
        watcher.close();
        assert!(!watcher.is_running());
        watcher.close();
        assert!(!watcher.is_running());
    }

    #[test]
    fn test_change_events_reach_the_callback() {
        let dir = TempDir::new().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut watcher = NotifyWatcher::new(dir.path(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        watcher.start();
        assert!(watcher.is_running());

        std::fs::write(dir.path().join("key"), b"{}").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(hits.load(Ordering::SeqCst) > 0, "no change event within 10s");
    }
}
