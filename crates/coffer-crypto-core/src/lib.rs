//! `coffer-crypto-core`: Cryptographic primitives for COFFER.
//!
//! Zero storage, zero async: the field cipher, master-password hashing,
//! secret memory and the password generator. The vault crate owns every
//! file and table these primitives touch.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod symmetric;

pub mod password;

pub use error::CryptoError;
pub use kdf::{
    hash_master_password, is_argon2id_hash, verify_legacy_sha256, verify_master_password,
    Argon2idParams,
};
pub use memory::SecretBytes;
pub use password::{
    generate_random_password, CharsetConfig, DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use symmetric::{DecryptionFailure, FieldCipher, SealedData, KEY_LEN};
