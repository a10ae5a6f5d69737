//! The live account cache.
//!
//! This module is the centerpiece of the crate. It is split into two
//! layers:
//!
//! * [`index`]: `AccountIndex`, the pure in-memory data structure: a
//!   URL-sorted sequence of accounts plus a per-address secondary index,
//!   with the full lookup resolution algorithm. No I/O, no locking.
//! * [`accounts`]: `AccountCache`, which wraps the index in a mutex and
//!   adds everything stateful: reload throttling, watcher supervision,
//!   scan-and-apply, and change notification.
//!
//! # Consistency model
//!
//! The filesystem is ground truth; the cache is a derived, eventually
//! consistent view. With a running watcher, changes land as events arrive.
//! Without one, lookups trigger a rescan at most once per reload interval,
//! so freshness is bounded but never guaranteed to be real-time.

pub mod accounts;
pub mod index;

pub use accounts::AccountCache;
pub use index::AccountIndex;
