//! Core value types: addresses, key file URLs and accounts.
//!
//! An [`Account`] pairs a 20-byte [`Address`] with the [`KeyUrl`] of the
//! key file that encodes it. Accounts are plain immutable values; two
//! accounts are equal only when both fields are equal.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// URL scheme attached to every key file indexed from disk.
pub const KEYSTORE_SCHEME: &str = "keystore";

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// A 20-byte account identifier.
///
/// Addresses are parsed from hex (with or without a `0x` prefix) and
/// displayed as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Create an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the address.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Whether every byte is zero. The all-zero address is not a valid
    /// account identifier and is rejected by the key file decoder.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Hex encoding without the `0x` prefix, as used in key file names.
    #[must_use]
    pub fn to_plain_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        let bytes: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| AddressParseError::InvalidLength(v.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Errors produced when parsing an [`Address`] from hex.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AddressParseError {
    /// The string contained non-hex characters or an odd digit count.
    #[error("invalid hex in address: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded byte count was not [`ADDRESS_LENGTH`].
    #[error("address must be {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// Location of a key file, as a scheme plus a filesystem path.
///
/// Ordering is scheme-aware and then lexicographic on the path. The sorted
/// account index and ambiguous-match reporting both rely on this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyUrl {
    /// URL scheme, [`KEYSTORE_SCHEME`] for everything indexed from disk.
    pub scheme: String,
    /// Filesystem path of the key file.
    pub path: PathBuf,
}

impl KeyUrl {
    /// A `keystore://` URL for the given path.
    #[must_use]
    pub fn keystore(path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: KEYSTORE_SCHEME.to_string(),
            path: path.into(),
        }
    }
}

impl Ord for KeyUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scheme
            .cmp(&other.scheme)
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for KeyUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path.display())
    }
}

/// An address paired with the location of the key file encoding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    /// Account address derived from the key.
    pub address: Address,
    /// Location of the key file.
    pub url: KeyUrl,
}

impl Account {
    /// An account backed by a key file at `path`.
    #[must_use]
    pub fn new(address: Address, path: impl Into<PathBuf>) -> Self {
        Self {
            address,
            url: KeyUrl::keystore(path),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.url)
    }
}

/// A lookup query against the account cache.
///
/// At least one field should be set. A relative `path` is resolved against
/// the cache's keystore directory before matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountQuery {
    /// Restrict candidates to accounts with this address.
    pub address: Option<Address>,
    /// Match the key file path exactly.
    pub path: Option<PathBuf>,
}

impl AccountQuery {
    /// Query by address only.
    #[must_use]
    pub fn by_address(address: Address) -> Self {
        Self {
            address: Some(address),
            path: None,
        }
    }

    /// Query by key file path only.
    #[must_use]
    pub fn by_path(path: impl Into<PathBuf>) -> Self {
        Self {
            address: None,
            path: Some(path.into()),
        }
    }

    /// Add a path constraint to the query.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Resolve a query path against the keystore directory.
///
/// Absolute paths are used as-is; anything relative (including a bare file
/// name) is joined onto `keydir`.
#[must_use]
pub(crate) fn resolve_query_path(keydir: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        keydir.join(path)
    } else {
        path.to_path_buf()
    }
}
