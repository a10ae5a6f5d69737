//! Keystore directory scanning.
//!
//! The scanner turns one directory listing into a diff against its own
//! previous snapshot: which key files appeared, disappeared, or were
//! modified since the last scan. It reads metadata only, never file
//! contents, so a scan stays cheap even when nothing changed.
//!
//! Non-key entries are filtered before diffing: editor backups (trailing
//! `~`), hidden files (leading `.`), directories and anything that is not
//! a regular file (symlinks, devices).

pub mod diff;

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

pub use diff::FileScanner;

/// The three change sets produced by one scan, relative to the previous one.
#[derive(Debug, Clone, Default)]
pub struct ScanDiff {
    /// Key files present now that were absent from the previous snapshot.
    pub created: HashSet<PathBuf>,
    /// Key files present in the previous snapshot but gone now.
    pub deleted: HashSet<PathBuf>,
    /// Surviving key files whose modification time moved past the previous
    /// watermark. Never overlaps `created`.
    pub updated: HashSet<PathBuf>,
}

impl ScanDiff {
    /// True when the scan found no changes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }
}

/// Errors that abort a directory scan.
///
/// A failed scan produces no partial result; the previous snapshot is left
/// untouched so the next attempt diffs against the same baseline.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Listing the keystore directory failed.
    #[error("failed to list keystore directory {path}: {source}")]
    List {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}
