//! Key file handling: address extraction, naming and atomic writes.
//!
//! A key file is a JSON record produced by external key-issuance tooling.
//! The cache only ever needs the `address` field; the encrypted key
//! material is owned by that tooling and never parsed here.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use crate::account::{Account, Address};

/// Extracts accounts from key files.
///
/// Implementations must be cheap to call in a loop and must treat every
/// failure as "not a key file": the scan that invoked them continues with
/// the remaining paths either way.
pub trait KeyDecoder: Send + Sync {
    /// Try to read the file at `path` as a key file.
    ///
    /// Returns `None` on I/O failure, malformed content, or a missing or
    /// zero address. Never an error: unreadable files are simply not
    /// accounts.
    fn decode(&self, path: &Path) -> Option<Account>;
}

/// Just enough of a key file to locate the account it encodes.
#[derive(Debug, Deserialize)]
struct KeyFileRef {
    #[serde(default)]
    address: String,
}

/// The standard decoder: parses the key file as JSON and extracts the
/// hex-encoded `address` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonKeyDecoder;

impl KeyDecoder for JsonKeyDecoder {
    fn decode(&self, path: &Path) -> Option<Account> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                log::trace!("failed to open key file {}: {err}", path.display());
                return None;
            }
        };
        let key: KeyFileRef = match serde_json::from_reader(BufReader::new(file)) {
            Ok(key) => key,
            Err(err) => {
                log::debug!("failed to decode key file {}: {err}", path.display());
                return None;
            }
        };
        let address = match key.address.parse::<Address>() {
            Ok(address) => address,
            Err(err) => {
                log::debug!("failed to decode key file {}: {err}", path.display());
                return None;
            }
        };
        if address.is_zero() {
            log::debug!(
                "failed to decode key file {}: missing or zero address",
                path.display()
            );
            return None;
        }
        Some(Account::new(address, path))
    }
}

/// Canonical file name for a key file created now for `address`:
/// `UTC--<created_at UTC in ISO-8601 with dashes>--<address hex>`.
///
/// Colons are replaced by dashes so the name is valid on every filesystem.
#[must_use]
pub fn key_file_name(address: &Address) -> String {
    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.9fZ");
    format!("UTC--{stamp}--{}", address.to_plain_hex())
}

/// Write `content` to `path` without ever exposing a torn file.
///
/// The keystore directory is created with mode 0700 if absent. The content
/// goes to a hidden temporary file (mode 0600) in the same directory and is
/// renamed into place, so a concurrent scan sees either nothing (the temp
/// name is filtered as a dotfile) or the complete key file.
pub fn write_key_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "key file path has no file name"))?
        .to_string_lossy()
        .into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_keystore_dir(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(unix)]
fn create_keystore_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_keystore_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}
