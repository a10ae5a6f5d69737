//! Lookup error taxonomy.
//!
//! `NoMatch` and `Ambiguous` are expected, recoverable outcomes of a cache
//! query, not internal faults. Callers are expected to branch on them: a
//! no-match usually means the key file is missing, an ambiguous match means
//! the user must pick one of several files holding keys for the same
//! address.

use crate::account::{Account, Address};

/// Outcome of a failed account lookup.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No indexed key file matches the query.
    #[error("no key matches the requested account")]
    NoMatch,

    /// More than one key file holds a key for the queried address.
    ///
    /// `matches` enumerates every candidate, sorted by URL, so the caller
    /// can disambiguate by path.
    #[error("multiple keys match address {address} ({})", candidate_paths(.matches))]
    Ambiguous {
        /// The address that matched more than once.
        address: Address,
        /// All matching accounts, sorted by URL.
        matches: Vec<Account>,
    },
}

fn candidate_paths(matches: &[Account]) -> String {
    matches
        .iter()
        .map(|account| account.url.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ADDRESS_LENGTH;

    #[test]
    fn test_ambiguous_display_lists_paths() {
        let address = Address::new([0xab; ADDRESS_LENGTH]);
        let err = LookupError::Ambiguous {
            address,
            matches: vec![
                Account::new(address, "/keys/1"),
                Account::new(address, "/keys/2"),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("/keys/1, /keys/2"), "got: {rendered}");
        assert!(rendered.contains(&address.to_string()));
    }

    #[test]
    fn test_no_match_display() {
        assert_eq!(
            LookupError::NoMatch.to_string(),
            "no key matches the requested account"
        );
    }
}
