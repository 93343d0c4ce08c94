//! AES-256-GCM field-level encryption.
//!
//! This module provides:
//! - [`FieldCipher`]: holds the vault key and seals/opens individual fields
//! - [`SealedData`]: nonce + ciphertext + tag container
//! - [`DecryptionFailure`]: the typed sentinel returned when a field cannot be opened
//!
//! # Text envelope
//!
//! Sensitive record fields live in `TEXT` columns, so sealed bytes are
//! carried as standard padded base64 of `nonce || ciphertext || tag`.
//! Every field is bound to the `coffer-field-v1` domain tag through AAD.

use std::fmt;

use data_encoding::BASE64;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;
use crate::memory::SecretBytes;

/// AES-256-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Minimum valid serialized length: nonce + empty ciphertext + tag.
const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

/// Domain separation tag bound to every sealed field.
const FIELD_AAD: &[u8] = b"coffer-field-v1";

// ---------------------------------------------------------------------------
// Failure sentinel
// ---------------------------------------------------------------------------

/// Why a stored field could not be turned back into plaintext.
///
/// Callers must check for this before displaying anything; the
/// [`PLACEHOLDER`](Self::PLACEHOLDER) text is what a UI shows instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptionFailure {
    /// Not valid base64, or shorter than nonce + tag.
    #[error("sealed field is malformed")]
    Malformed,
    /// Tag verification failed: tampered data or a different key.
    #[error("sealed field failed authentication")]
    Unauthenticated,
    /// Authenticated, but the plaintext is not UTF-8.
    #[error("decrypted field is not valid UTF-8")]
    NotUtf8,
}

impl DecryptionFailure {
    /// Text shown in place of a field that could not be decrypted.
    pub const PLACEHOLDER: &'static str = "[unreadable]";
}

// ---------------------------------------------------------------------------
// SealedData
// ---------------------------------------------------------------------------

/// Authenticated ciphertext container.
///
/// Wire format: `nonce (12 bytes) || ciphertext (variable) || tag (16 bytes)`.
#[must_use = "encrypted data must be stored"]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedData {
    /// 96-bit random nonce, unique per encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted data (same length as the plaintext).
    pub ciphertext: Vec<u8>,
    /// 128-bit authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl SealedData {
    /// Serialize to wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let capacity = NONCE_LEN
            .saturating_add(self.ciphertext.len())
            .saturating_add(TAG_LEN);
        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse wire format.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionFailure::Malformed`] for input shorter than 28 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecryptionFailure> {
        if bytes.len() < MIN_SEALED_LEN {
            return Err(DecryptionFailure::Malformed);
        }
        let (nonce_part, rest) = bytes.split_at(NONCE_LEN);
        let ct_len = rest
            .len()
            .checked_sub(TAG_LEN)
            .ok_or(DecryptionFailure::Malformed)?;
        let (ct_part, tag_part) = rest.split_at(ct_len);

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_part);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(tag_part);

        Ok(Self {
            nonce,
            ciphertext: ct_part.to_vec(),
            tag,
        })
    }

    /// Encode as the base64 text envelope stored in record columns.
    #[must_use]
    pub fn to_text(&self) -> String {
        BASE64.encode(&self.to_bytes())
    }

    /// Decode the base64 text envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionFailure::Malformed`] on bad base64 or short input.
    pub fn from_text(text: &str) -> Result<Self, DecryptionFailure> {
        let bytes = BASE64
            .decode(text.trim().as_bytes())
            .map_err(|_| DecryptionFailure::Malformed)?;
        Self::from_bytes(&bytes)
    }
}

// ---------------------------------------------------------------------------
// FieldCipher
// ---------------------------------------------------------------------------

/// AES-256-GCM cipher bound to the vault's field key.
///
/// Built once per process from the key file contents and shared by
/// every encrypt/decrypt call.
pub struct FieldCipher {
    key: aead::LessSafeKey,
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldCipher(***)")
    }
}

impl FieldCipher {
    /// Build a cipher from a 256-bit key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `ring` rejects the key.
    pub fn new(key: &SecretBytes<KEY_LEN>) -> Result<Self, CryptoError> {
        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key.expose()).map_err(|_| {
            CryptoError::InvalidKeyMaterial("failed to create AES-256-GCM key".into())
        })?;
        Ok(Self {
            key: aead::LessSafeKey::new(unbound),
        })
    }

    /// Encrypt bytes under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Random`] if no nonce can be drawn, or
    /// [`CryptoError::Encryption`] if sealing fails.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedData, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| CryptoError::Random(format!("nonce generation failed: {e}")))?;
        let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        let Ok(tag) =
            self.key
                .seal_in_place_separate_tag(nonce, aead::Aad::from(FIELD_AAD), &mut in_out)
        else {
            in_out.zeroize();
            return Err(CryptoError::Encryption(
                "AES-256-GCM encryption failed".into(),
            ));
        };

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag.as_ref());

        Ok(SealedData {
            nonce: nonce_bytes,
            ciphertext: in_out,
            tag: tag_bytes,
        })
    }

    /// Authenticate and decrypt a sealed container.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionFailure::Unauthenticated`] when the tag does not verify.
    pub fn open(&self, sealed: &SealedData) -> Result<Zeroizing<Vec<u8>>, DecryptionFailure> {
        let nonce = aead::Nonce::assume_unique_for_key(sealed.nonce);

        let mut ct_tag = Zeroizing::new(Vec::with_capacity(
            sealed.ciphertext.len().saturating_add(TAG_LEN),
        ));
        ct_tag.extend_from_slice(&sealed.ciphertext);
        ct_tag.extend_from_slice(&sealed.tag);

        let plaintext = self
            .key
            .open_in_place(nonce, aead::Aad::from(FIELD_AAD), &mut ct_tag)
            .map_err(|_| DecryptionFailure::Unauthenticated)?;

        Ok(Zeroizing::new(plaintext.to_vec()))
    }

    /// Encrypt one text field into its stored envelope.
    ///
    /// Encrypting the same plaintext twice yields different envelopes.
    ///
    /// # Errors
    ///
    /// See [`seal`](Self::seal).
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(self.seal(plaintext.as_bytes())?.to_text())
    }

    /// Decrypt one stored envelope back to text.
    ///
    /// Never panics on hostile input; every failure is a [`DecryptionFailure`].
    ///
    /// # Errors
    ///
    /// Returns the failure kind when the envelope is malformed, fails
    /// authentication, or does not hold UTF-8.
    pub fn decrypt_field(&self, envelope: &str) -> Result<Zeroizing<String>, DecryptionFailure> {
        let sealed = SealedData::from_text(envelope)?;
        let mut bytes = self.open(&sealed)?;
        match String::from_utf8(std::mem::take(&mut *bytes)) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(e) => {
                let mut raw = e.into_bytes();
                raw.zeroize();
                Err(DecryptionFailure::NotUtf8)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
