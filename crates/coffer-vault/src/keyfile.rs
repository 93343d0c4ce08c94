//! Field key file.
//!
//! The key is 32 raw bytes in a file of its own, created on first run with
//! owner-only permissions. An existing file is never overwritten: if it is
//! unreadable or the wrong size, loading fails and nothing is written.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use coffer_crypto_core::{SecretBytes, KEY_LEN};
use tracing::info;
use zeroize::Zeroizing;

use crate::error::VaultError;

/// Load the key at `path`, generating and persisting a new one if the file
/// does not exist.
///
/// # Errors
///
/// - [`VaultError::KeyFile`] if the file exists but does not hold exactly
///   32 bytes.
/// - [`VaultError::Io`] if the file cannot be read or created.
/// - [`VaultError::Crypto`] if the OS random source fails.
pub fn load_or_create_key(path: &Path) -> Result<SecretBytes<KEY_LEN>, VaultError> {
    match read_key(path) {
        Err(VaultError::Io(e)) if e.kind() == ErrorKind::NotFound => {}
        other => return other,
    }

    let key = SecretBytes::<KEY_LEN>::random()?;
    match create_key_file(path, &key) {
        Ok(()) => {
            info!(path = %path.display(), "created field key file");
            Ok(key)
        }
        // Lost a creation race: the other writer's key wins.
        Err(VaultError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => read_key(path),
        Err(e) => Err(e),
    }
}

fn read_key(path: &Path) -> Result<SecretBytes<KEY_LEN>, VaultError> {
    let bytes = Zeroizing::new(fs::read(path)?);
    if bytes.len() != KEY_LEN {
        return Err(VaultError::KeyFile(format!(
            "{} holds {} bytes, expected {KEY_LEN}",
            path.display(),
            bytes.len()
        )));
    }
    Ok(SecretBytes::from_slice(&bytes)?)
}

fn create_key_file(path: &Path, key: &SecretBytes<KEY_LEN>) -> Result<(), VaultError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(key.expose())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_call_creates_and_second_call_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coffer.key");
        let first = load_or_create_key(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), KEY_LEN);
        let second = load_or_create_key(&path).unwrap();
        assert_eq!(first.expose(), second.expose());
    }

    #[test]
    fn wrong_size_is_an_error_and_file_is_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coffer.key");
        // An old base64 Fernet key is 44 bytes.
        let legacy = b"ZmVybmV0LWtleS1maWxlLWZyb20tYW4tb2xkLXZhdWx0";
        fs::write(&path, legacy).unwrap();
        let err = load_or_create_key(&path).unwrap_err();
        assert!(matches!(err, VaultError::KeyFile(_)));
        assert_eq!(fs::read(&path).unwrap(), legacy);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("coffer.key");
        assert!(matches!(load_or_create_key(&path), Err(VaultError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coffer.key");
        load_or_create_key(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
