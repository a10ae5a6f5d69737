//! `AccountCache`: reload policy, locking and change notification around
//! the in-memory index.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::account::{Account, AccountQuery, Address};
use crate::cache::index::AccountIndex;
use crate::error::LookupError;
use crate::keyfile::{JsonKeyDecoder, KeyDecoder};
use crate::scanner::{FileScanner, ScanError};
use crate::watcher::{ChangeWatcher, NotifyWatcher, NullWatcher};

/// Minimum amount of time between polled cache reloads. This limit applies
/// when the platform delivers no change notifications. It also bounds how
/// often a failed watcher is restarted, which covers the case where the
/// keystore directory does not exist yet.
const MIN_RELOAD_INTERVAL: Duration = Duration::from_secs(2);

/// Everything guarded by the cache's state lock.
struct CacheState {
    index: AccountIndex,
    /// Earliest moment the next polled reload may run.
    throttle: Option<Instant>,
    watcher: Box<dyn ChangeWatcher>,
    /// Dropped exactly once by `close`; a `None` here means closed.
    notify: Option<Sender<()>>,
    closed: bool,
}

/// A live index of all accounts in one keystore directory.
///
/// The cache is bound to a single directory at construction and populated
/// lazily on first access (or eagerly via [`reload`](Self::reload)). It is
/// kept consistent with out-of-band filesystem changes: by watcher events
/// when a watcher is running, by throttled polling from the lookup paths
/// otherwise. Lookups never read key files; only the reload path does.
///
/// All operations are safe to call from multiple threads. Mutations are
/// totally ordered by an internal mutex; the mutex is never held across
/// directory or file I/O.
pub struct AccountCache {
    keydir: PathBuf,
    decoder: Box<dyn KeyDecoder>,
    state: Mutex<CacheState>,
    files: Mutex<FileScanner>,
}

impl AccountCache {
    /// A cache over `keydir` with the native directory watcher and the
    /// standard JSON key decoder.
    ///
    /// Returns the cache and the receiving side of its notification
    /// channel. The channel has capacity one and carries no payload: a
    /// receive means "something changed, re-query", not one message per
    /// change. It disconnects when the cache is closed.
    pub fn new(keydir: impl Into<PathBuf>) -> (Arc<Self>, Receiver<()>) {
        let (cache, receiver) = Self::with_watcher(keydir, Box::new(NullWatcher));
        let weak = Arc::downgrade(&cache);
        let watcher = NotifyWatcher::new(cache.keydir.clone(), move || {
            let Some(cache) = weak.upgrade() else { return };
            if let Err(err) = cache.scan_and_apply() {
                log::debug!("failed to reload keystore after change event: {err}");
            }
        });
        cache.state.lock().unwrap().watcher = Box::new(watcher);
        (cache, receiver)
    }

    /// A cache with a caller-supplied watcher and the standard decoder.
    pub fn with_watcher(
        keydir: impl Into<PathBuf>,
        watcher: Box<dyn ChangeWatcher>,
    ) -> (Arc<Self>, Receiver<()>) {
        Self::with_decoder(keydir, watcher, Box::new(JsonKeyDecoder))
    }

    /// A cache with both collaborators supplied by the caller.
    pub fn with_decoder(
        keydir: impl Into<PathBuf>,
        watcher: Box<dyn ChangeWatcher>,
        decoder: Box<dyn KeyDecoder>,
    ) -> (Arc<Self>, Receiver<()>) {
        let (sender, receiver) = bounded(1);
        let cache = Arc::new(Self {
            keydir: keydir.into(),
            decoder,
            state: Mutex::new(CacheState {
                index: AccountIndex::new(),
                throttle: None,
                watcher,
                notify: Some(sender),
                closed: false,
            }),
            files: Mutex::new(FileScanner::new()),
        });
        (cache, receiver)
    }

    /// The directory this cache indexes.
    #[must_use]
    pub fn keydir(&self) -> &Path {
        &self.keydir
    }

    /// All indexed accounts in URL order, freshened first if a reload is
    /// due. The returned copy is the caller's to keep.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.maybe_reload();
        self.state.lock().unwrap().index.accounts()
    }

    /// Whether any key file encodes `address`, freshened first if a reload
    /// is due.
    #[must_use]
    pub fn has_address(&self, address: &Address) -> bool {
        self.maybe_reload();
        self.state.lock().unwrap().index.has_address(address)
    }

    /// Resolve `query` against the in-memory index. Never touches disk;
    /// see [`AccountIndex::find`] for the resolution rules.
    pub fn find(&self, query: &AccountQuery) -> Result<Account, LookupError> {
        self.state.lock().unwrap().index.find(&self.keydir, query)
    }

    /// Insert an account into the index, keeping it sorted. Idempotent.
    pub fn add(&self, account: Account) {
        self.state.lock().unwrap().index.add(account);
    }

    /// Remove the exact account from the index.
    pub fn delete(&self, account: &Account) {
        self.state.lock().unwrap().index.delete(account);
    }

    /// Remove whichever account is backed by the key file at `path`.
    pub fn delete_by_path(&self, path: &Path) {
        self.state.lock().unwrap().index.delete_by_path(path);
    }

    /// Synchronously rescan the keystore directory, bypassing the reload
    /// throttle (the throttle is still reset, so the next polled reload is
    /// pushed out by one interval).
    pub fn reload(&self) -> Result<(), ScanError> {
        self.state.lock().unwrap().throttle = Some(Instant::now() + MIN_RELOAD_INTERVAL);
        self.scan_and_apply()
    }

    /// Tear the cache down: stop the watcher and disconnect the
    /// notification channel. Safe to call more than once; lookups keep
    /// answering from the last indexed state afterwards.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.watcher.close();
        state.throttle = None;
        // Dropping the sender disconnects the receiver; taking it out of
        // the Option makes a second close a no-op.
        state.notify.take();
        state.closed = true;
    }

    /// The freshness gate in front of every lookup.
    ///
    /// A running watcher is trusted to keep the cache up to date, so
    /// nothing happens. Otherwise a reload runs unless one already ran
    /// within the minimum interval; the watcher is also given another
    /// chance to start. The decision is made under the lock, the scan runs
    /// outside it.
    fn maybe_reload(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.closed || state.watcher.is_running() {
                return;
            }
            if let Some(deadline) = state.throttle {
                if Instant::now() < deadline {
                    // The cache was reloaded recently.
                    return;
                }
            }
            state.watcher.start();
            state.throttle = Some(Instant::now() + MIN_RELOAD_INTERVAL);
        }
        if let Err(err) = self.scan_and_apply() {
            log::debug!("failed to reload keystore contents: {err}");
        }
    }

    /// Scan the keystore directory and fold the resulting diff into the
    /// index.
    ///
    /// A scan failure abandons the whole cycle (the index is untouched and
    /// the error is returned; a later reload retries). An empty diff
    /// returns without mutating anything and without signalling. Updated
    /// files are treated as delete-then-recreate. Each individual
    /// add/delete takes the state lock on its own, so readers interleave
    /// with the application of a large diff but never observe a torn
    /// entry.
    fn scan_and_apply(&self) -> Result<(), ScanError> {
        let diff = self.files.lock().unwrap().scan(&self.keydir)?;
        if diff.is_empty() {
            return Ok(());
        }
        let started = Instant::now();

        for path in &diff.created {
            if let Some(account) = self.decoder.decode(path) {
                self.add(account);
            }
        }
        for path in &diff.deleted {
            self.delete_by_path(path);
        }
        for path in &diff.updated {
            self.delete_by_path(path);
            if let Some(account) = self.decoder.decode(path) {
                self.add(account);
            }
        }

        // Capacity-one, non-blocking: a pending signal already says
        // everything this one would.
        let state = self.state.lock().unwrap();
        if let Some(notify) = &state.notify {
            let _ = notify.try_send(());
        }
        log::trace!(
            "handled keystore changes ({} created, {} deleted, {} updated) in {:?}",
            diff.created.len(),
            diff.deleted.len(),
            diff.updated.len(),
            started.elapsed()
        );
        Ok(())
    }
}

impl std::fmt::Debug for AccountCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCache")
            .field("keydir", &self.keydir)
            .finish_non_exhaustive()
    }
}
