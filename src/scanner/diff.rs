//! Stateful snapshot-and-diff engine over one keystore directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{ScanDiff, ScanError};

/// Tracks the set of key files seen by the previous scan, plus the newest
/// modification time observed, and classifies the next scan against them.
///
/// The scanner holds no reference to the directory it scans; the caller
/// passes the path on every call and owns any locking around it.
#[derive(Debug)]
pub struct FileScanner {
    /// Key file paths found by the previous scan.
    known: HashSet<PathBuf>,
    /// Newest modification time seen by the previous scan.
    last_mod: SystemTime,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FileScanner {
    /// A scanner with an empty snapshot: the first scan reports every key
    /// file as created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known: HashSet::new(),
            last_mod: SystemTime::UNIX_EPOCH,
        }
    }

    /// Scan `dir` and return the change sets relative to the previous scan.
    ///
    /// On success the internal snapshot and watermark are replaced with this
    /// scan's values, so the diff is always relative to the immediately
    /// preceding successful scan. On error nothing is updated.
    ///
    /// A file whose modification time is strictly newer than the watermark
    /// counts as modified; freshly created files are reported only in
    /// `created`.
    pub fn scan(&mut self, dir: &Path) -> Result<ScanDiff, ScanError> {
        let entries = fs::read_dir(dir).map_err(|source| ScanError::List {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut current = HashSet::new();
        let mut modified = HashSet::new();
        let mut new_last_mod = SystemTime::UNIX_EPOCH;

        for entry in entries {
            let entry = entry.map_err(|source| ScanError::List {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();

            if is_non_key_entry(&entry) {
                log::trace!("ignoring non-key file {}", path.display());
                continue;
            }
            // The file may vanish between listing and stat; treat it as if
            // it was never listed.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    log::trace!("failed to stat {}: {err}", path.display());
                    continue;
                }
            };

            let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            current.insert(path.clone());
            if mtime > self.last_mod {
                modified.insert(path);
            }
            if mtime > new_last_mod {
                new_last_mod = mtime;
            }
        }

        let created = &current - &self.known;
        let deleted = &self.known - &current;
        let updated = &modified - &created;

        self.known = current;
        self.last_mod = new_last_mod;

        Ok(ScanDiff {
            created,
            deleted,
            updated,
        })
    }
}

/// Entries that never represent key files: editor backups, hidden files,
/// directories and special files (symlinks included).
fn is_non_key_entry(entry: &fs::DirEntry) -> bool {
    let name = entry.file_name();
    let name = name.to_string_lossy();
    if name.ends_with('~') || name.starts_with('.') {
        return true;
    }
    match entry.file_type() {
        Ok(file_type) => !file_type.is_file(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "content of {name}").unwrap();
        path
    }

    fn bump_mtime(path: &Path, ahead: Duration) {
        let future = SystemTime::now() + ahead;
        filetime::set_file_mtime(path, FileTime::from_system_time(future)).unwrap();
    }

    #[test]
    fn test_first_scan_reports_everything_created() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a");
        let b = touch(dir.path(), "b");

        let mut scanner = FileScanner::new();
        let diff = scanner.scan(dir.path()).unwrap();

        assert_eq!(diff.created, HashSet::from([a, b]));
        assert!(diff.deleted.is_empty());
        assert!(diff.updated.is_empty());
    }

    #[test]
    fn test_unchanged_directory_yields_empty_diff() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a");

        let mut scanner = FileScanner::new();
        scanner.scan(dir.path()).unwrap();
        let diff = scanner.scan(dir.path()).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_create_delete_update_classification() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a");
        let b = touch(dir.path(), "b");
        touch(dir.path(), "c");

        let mut scanner = FileScanner::new();
        scanner.scan(dir.path()).unwrap();

        // a removed, d added, b rewritten past the watermark, c untouched.
        fs::remove_file(&a).unwrap();
        let d = touch(dir.path(), "d");
        bump_mtime(&b, Duration::from_secs(10));

        let diff = scanner.scan(dir.path()).unwrap();
        assert_eq!(diff.created, HashSet::from([d]));
        assert_eq!(diff.deleted, HashSet::from([a]));
        assert_eq!(diff.updated, HashSet::from([b]));
    }

    #[test]
    fn test_update_never_overlaps_create() {
        let dir = TempDir::new().unwrap();
        let mut scanner = FileScanner::new();
        scanner.scan(dir.path()).unwrap();

        // A brand-new file is always newer than the watermark, but must be
        // reported as created only.
        let fresh = touch(dir.path(), "fresh");
        bump_mtime(&fresh, Duration::from_secs(10));

        let diff = scanner.scan(dir.path()).unwrap();
        assert_eq!(diff.created, HashSet::from([fresh]));
        assert!(diff.updated.is_empty());
    }

    #[test]
    fn test_non_key_entries_are_invisible() {
        let dir = TempDir::new().unwrap();
        let real = touch(dir.path(), "real-key");
        touch(dir.path(), ".hidden");
        touch(dir.path(), "backup~");
        fs::create_dir(dir.path().join("subdir")).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

        let mut scanner = FileScanner::new();
        let diff = scanner.scan(dir.path()).unwrap();
        assert_eq!(diff.created, HashSet::from([real]));

        // Deleting the noise must not surface either.
        fs::remove_file(dir.path().join(".hidden")).unwrap();
        fs::remove_file(dir.path().join("backup~")).unwrap();
        let diff = scanner.scan(dir.path()).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_listing_failure_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a");

        let mut scanner = FileScanner::new();
        scanner.scan(dir.path()).unwrap();

        let err = scanner.scan(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ScanError::List { .. }));

        // The failed scan must not have replaced the snapshot: deleting a
        // is still detected against the old baseline.
        fs::remove_file(&a).unwrap();
        let diff = scanner.scan(dir.path()).unwrap();
        assert_eq!(diff.deleted, HashSet::from([a]));
    }
}
