//! Cryptographic error types for `coffer-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
///
/// Decryption of stored fields does not use this type: it reports
/// [`DecryptionFailure`](crate::symmetric::DecryptionFailure) so callers
/// can render a placeholder instead of propagating a fault.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Master-password hashing or hash parsing failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failure (AES-256-GCM).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The OS random number generator could not be read.
    #[error("random source error: {0}")]
    Random(String),

    /// Password generation failure (invalid parameters).
    #[error("password generation error: {0}")]
    PasswordGeneration(String),
}
