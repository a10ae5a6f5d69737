//! keydex - a live index of encrypted account key files.
//!
//! keydex binds to one keystore directory and maintains an in-memory,
//! queryable cache of the accounts encoded by its key files. The cache is
//! kept consistent with filesystem changes made by anyone (this process, a
//! key-issuance tool, the user's editor): a native directory watcher drives
//! reloads when the platform supports one, and throttled polling from the
//! lookup paths covers every platform that does not. Lookups answer from
//! memory; only reloads touch the disk.

pub mod account;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod keyfile;
pub mod logging;
pub mod scanner;
pub mod watcher;

pub use account::{Account, AccountQuery, Address, KeyUrl, KEYSTORE_SCHEME};
pub use cache::{AccountCache, AccountIndex};
pub use error::LookupError;
pub use keyfile::{JsonKeyDecoder, KeyDecoder};
pub use scanner::{FileScanner, ScanDiff, ScanError};
pub use watcher::{ChangeWatcher, NotifyWatcher, NullWatcher};
