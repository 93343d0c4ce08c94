//! Vault error types for `coffer-vault`.

use coffer_crypto_core::{CryptoError, DecryptionFailure};
use thiserror::Error;

use crate::schema::FieldIssue;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// One or more fields failed validation. The caller re-prompts.
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldIssue>),

    /// No record has this ID.
    #[error("record not found: {0}")]
    RecordNotFound(i64),

    /// A sealed field could not be decrypted.
    #[error("cannot decrypt field: {0}")]
    Decryption(#[from] DecryptionFailure),

    /// The supplied master password does not match the stored hash.
    #[error("invalid master password")]
    AuthMismatch,

    /// Vault is locked: operation requires an unlocked session.
    #[error("vault is locked")]
    Locked,

    /// No master password has been set yet.
    #[error("no master password has been set")]
    NotInitialized,

    /// Master passwords must not be empty.
    #[error("master password must not be empty")]
    EmptyPassword,

    /// A master password already exists; use change or reset instead.
    #[error("a master password is already set")]
    AlreadyInitialized,

    /// Too many failed unlock attempts; backoff active.
    #[error("rate limited: {remaining_ms}ms remaining")]
    RateLimited {
        /// Milliseconds remaining in the cooldown period.
        remaining_ms: u64,
    },

    /// Key file is unreadable or holds the wrong amount of key material.
    #[error("key file error: {0}")]
    KeyFile(String),

    /// `SQLite` error.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl VaultError {
    /// Field issues carried by a [`VaultError::Validation`], empty otherwise.
    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            Self::Validation(issues) => issues,
            _ => &[],
        }
    }
}
