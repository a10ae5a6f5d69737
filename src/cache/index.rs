//! The in-memory account index: a URL-sorted sequence plus an address map.

use std::collections::HashMap;
use std::path::Path;

use crate::account::{resolve_query_path, Account, AccountQuery, Address};
use crate::error::LookupError;

/// Index of all known accounts, kept sorted by URL, with a secondary index
/// by address.
///
/// Invariants, maintained by every mutation:
///
/// * `all` is strictly sorted by URL and holds no two entries with the
///   same URL.
/// * every account in `all` appears exactly once in its `by_addr` bucket
///   and vice versa; empty buckets are removed.
///
/// Multiple accounts may share an address (several key files can encrypt
/// keys for the same address); lookups over such an address are ambiguous
/// unless narrowed by path.
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    all: Vec<Account>,
    by_addr: HashMap<Address, Vec<Account>>,
}

impl AccountIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// True when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// All accounts in URL order, as an owned copy.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.all.clone()
    }

    /// Whether at least one key file encodes `address`.
    #[must_use]
    pub fn has_address(&self, address: &Address) -> bool {
        self.by_addr.get(address).is_some_and(|bucket| !bucket.is_empty())
    }

    /// Insert `account` at its sorted position. Inserting an account that
    /// is already present (same URL and same address) is a no-op.
    pub fn add(&mut self, account: Account) {
        let i = self.all.partition_point(|a| a.url < account.url);
        if self.all.get(i) == Some(&account) {
            return;
        }
        self.all.insert(i, account.clone());
        self.by_addr.entry(account.address).or_default().push(account);
    }

    /// Remove the exact account (address and URL both matching). Unknown
    /// accounts are ignored.
    pub fn delete(&mut self, account: &Account) {
        if let Some(i) = self.all.iter().position(|a| a == account) {
            self.all.remove(i);
        }
        self.remove_from_bucket(account);
    }

    /// Remove whichever account is backed by the key file at `path`.
    pub fn delete_by_path(&mut self, path: &Path) {
        let i = self.all.partition_point(|a| a.url.path.as_path() < path);
        if i < self.all.len() && self.all[i].url.path == path {
            let removed = self.all.remove(i);
            self.remove_from_bucket(&removed);
        }
    }

    fn remove_from_bucket(&mut self, account: &Account) {
        if let Some(bucket) = self.by_addr.get_mut(&account.address) {
            if let Some(i) = bucket.iter().position(|a| a == account) {
                bucket.remove(i);
            }
            if bucket.is_empty() {
                self.by_addr.remove(&account.address);
            }
        }
    }

    /// Resolve `query` to a single account.
    ///
    /// Resolution order:
    ///
    /// 1. With an address set, candidates are that address's bucket;
    ///    otherwise every account is a candidate.
    /// 2. With a path set, it is resolved against `keydir` (relative paths
    ///    only) and matched exactly. A hit wins outright. A miss fails with
    ///    [`LookupError::NoMatch`] unless an address was also given, in
    ///    which case resolution falls through to the address pass. Callers
    ///    rely on this asymmetry; it is deliberate.
    /// 3. Candidates matching the address exactly: one is returned, none
    ///    is [`LookupError::NoMatch`], several is
    ///    [`LookupError::Ambiguous`] with the matches sorted by URL.
    pub fn find(&self, keydir: &Path, query: &AccountQuery) -> Result<Account, LookupError> {
        let candidates: Vec<&Account> = match query.address {
            Some(ref address) => self
                .by_addr
                .get(address)
                .map(|bucket| bucket.iter().collect())
                .unwrap_or_default(),
            None => self.all.iter().collect(),
        };

        if let Some(ref path) = query.path {
            let resolved = resolve_query_path(keydir, path);
            if let Some(hit) = candidates.iter().find(|a| a.url.path == resolved) {
                return Ok((*hit).clone());
            }
            if query.address.is_none() {
                return Err(LookupError::NoMatch);
            }
        }

        let Some(address) = query.address else {
            return Err(LookupError::NoMatch);
        };
        let mut matches: Vec<Account> = candidates
            .into_iter()
            .filter(|a| a.address == address)
            .cloned()
            .collect();
        match matches.len() {
            0 => Err(LookupError::NoMatch),
            1 => Ok(matches.remove(0)),
            _ => {
                matches.sort_by(|a, b| a.url.cmp(&b.url));
                Err(LookupError::Ambiguous { address, matches })
            }
        }
    }
}
