//! Argon2id master-password hashing.
//!
//! This module provides:
//! - [`hash_master_password`]: salted Argon2id hash encoded as a PHC string
//! - [`verify_master_password`]: constant-time check of a password against a PHC string
//! - [`Argon2idParams`]: serializable cost parameters
//! - [`verify_legacy_sha256`]: check against the unsalted SHA-256 hex digest
//!   older vaults stored, so callers can upgrade it
//!
//! The master hash is an access gate only. It is never used to derive or
//! wrap the field key, so a forgotten password does not cost any data.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::digest;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Hash output length in bytes (256 bits).
const OUTPUT_LEN: usize = 32;

/// PHC identifier prefix written by [`hash_master_password`].
const PHC_PREFIX: &str = "$argon2id$";

/// Argon2id parameter set.
///
/// Fields use the `argon2` crate convention:
/// - `m_cost`: memory in KiB
/// - `t_cost`: number of iterations
/// - `p_cost`: degree of parallelism
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2idParams {
    /// Memory cost in kibibytes.
    pub m_cost: u32,
    /// Number of iterations (time cost).
    pub t_cost: u32,
    /// Degree of parallelism (number of lanes).
    pub p_cost: u32,
}

impl Argon2idParams {
    /// Interactive login cost: 19 MiB, 2 passes, 1 lane.
    pub const INTERACTIVE: Self = Self {
        m_cost: 19_456,
        t_cost: 2,
        p_cost: 1,
    };

    /// Minimal cost for unit and integration tests.
    pub const TESTING: Self = Self {
        m_cost: 64,
        t_cost: 1,
        p_cost: 1,
    };

    fn to_argon2(&self) -> Result<Argon2<'static>, CryptoError> {
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(OUTPUT_LEN))
            .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2id params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2idParams {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

/// Hash a master password with a fresh random salt.
///
/// # Errors
///
/// Returns [`CryptoError::Random`] if the salt cannot be drawn, or
/// [`CryptoError::KeyDerivation`] for invalid parameters.
pub fn hash_master_password(
    password: &[u8],
    params: &Argon2idParams,
) -> Result<String, CryptoError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| CryptoError::Random(format!("salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CryptoError::KeyDerivation(format!("salt encoding failed: {e}")))?;

    let hash = params
        .to_argon2()?
        .hash_password(password, &salt)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2id hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
///
/// Cost parameters are read from the PHC string itself, so hashes written
/// with older parameters keep verifying.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivation`] if `stored` is not a parseable
/// PHC string. A wrong password is `Ok(false)`, not an error.
pub fn verify_master_password(password: &[u8], stored: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| CryptoError::KeyDerivation(format!("stored hash is unreadable: {e}")))?;
    match Argon2::default().verify_password(password, &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::KeyDerivation(format!(
            "Argon2id verification failed: {e}"
        ))),
    }
}

/// Whether `stored` looks like a hash produced by [`hash_master_password`].
#[must_use]
pub fn is_argon2id_hash(stored: &str) -> bool {
    stored.starts_with(PHC_PREFIX)
}

/// Check `password` against a legacy lowercase hex SHA-256 digest.
///
/// A digest of the wrong length or with non-hex characters never matches.
#[must_use]
pub fn verify_legacy_sha256(password: &[u8], stored_hex: &str) -> bool {
    let Ok(expected) = data_encoding::HEXLOWER_PERMISSIVE.decode(stored_hex.trim().as_bytes())
    else {
        return false;
    };
    let actual = digest::digest(&digest::SHA256, password);
    constant_time_eq(actual.as_ref(), &expected)
}

/// Constant-time byte comparison.
///
/// The early return on length mismatch only leaks the digest length, which
/// is fixed and public.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
