//! Random password generation.
//!
//! [`generate_random_password`] draws from `OsRng` and guarantees at least
//! one character from every enabled charset.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum allowed password length.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Maximum allowed password length.
pub const MAX_PASSWORD_LENGTH: usize = 64;

/// Default password length.
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// Characters that are easy to confuse when read aloud or retyped.
const SIMILAR: &[u8] = b"il1|o0O";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which character sets a generated password draws from.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharsetConfig {
    /// Include uppercase letters (A-Z).
    pub uppercase: bool,
    /// Include lowercase letters (a-z).
    pub lowercase: bool,
    /// Include digits (0-9).
    pub digits: bool,
    /// Include symbols (`!@#$%^&*`).
    pub symbols: bool,
    /// Drop look-alike characters (`i l 1 | o 0 O`).
    #[serde(default)]
    pub exclude_similar: bool,
}

impl Default for CharsetConfig {
    fn default() -> Self {
        Self {
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
            exclude_similar: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate a random password of `length` characters.
///
/// Mandatory picks (one per enabled charset) are placed first, the rest is
/// filled from the combined pool, then the whole password is shuffled.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordGeneration`] if `length` is outside
/// [`MIN_PASSWORD_LENGTH`]..=[`MAX_PASSWORD_LENGTH`] or no charset is enabled.
pub fn generate_random_password(
    length: usize,
    charsets: &CharsetConfig,
) -> Result<String, CryptoError> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(CryptoError::PasswordGeneration(format!(
            "length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {length}"
        )));
    }

    let enabled = [
        (charsets.uppercase, UPPERCASE),
        (charsets.lowercase, LOWERCASE),
        (charsets.digits, DIGITS),
        (charsets.symbols, SYMBOLS),
    ];

    let mut rng = rand::rngs::OsRng;
    let mut pool: Vec<u8> = Vec::new();
    let mut chars: Vec<u8> = Vec::with_capacity(length);

    for set in enabled.iter().filter(|(on, _)| *on).map(|(_, set)| *set) {
        let filtered: Vec<u8> = set
            .iter()
            .copied()
            .filter(|c| !charsets.exclude_similar || !SIMILAR.contains(c))
            .collect();
        if let Some(&pick) = filtered.choose(&mut rng) {
            chars.push(pick);
        }
        pool.extend_from_slice(&filtered);
    }

    if pool.is_empty() {
        return Err(CryptoError::PasswordGeneration(
            "at least one charset must be enabled".to_string(),
        ));
    }

    while chars.len() < length {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    Ok(chars.into_iter().map(char::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_length_and_all_sets_present() {
        let pwd = generate_random_password(DEFAULT_PASSWORD_LENGTH, &CharsetConfig::default())
            .unwrap();
        assert_eq!(pwd.len(), DEFAULT_PASSWORD_LENGTH);
        assert!(pwd.chars().any(|c| c.is_ascii_uppercase()));
        assert!(pwd.chars().any(|c| c.is_ascii_lowercase()));
        assert!(pwd.chars().any(|c| c.is_ascii_digit()));
        assert!(pwd.bytes().any(|c| SYMBOLS.contains(&c)));
    }

    #[test]
    fn digits_only() {
        let config = CharsetConfig {
            uppercase: false,
            lowercase: false,
            digits: true,
            symbols: false,
            exclude_similar: false,
        };
        let pwd = generate_random_password(12, &config).unwrap();
        assert!(pwd.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn exclude_similar_drops_lookalikes() {
        let config = CharsetConfig {
            exclude_similar: true,
            ..CharsetConfig::default()
        };
        for _ in 0..50 {
            let pwd = generate_random_password(MAX_PASSWORD_LENGTH, &config).unwrap();
            assert!(!pwd.bytes().any(|c| SIMILAR.contains(&c)), "{pwd}");
        }
    }

    #[test]
    fn rejects_out_of_range_length() {
        assert!(generate_random_password(3, &CharsetConfig::default()).is_err());
        assert!(generate_random_password(65, &CharsetConfig::default()).is_err());
    }

    #[test]
    fn rejects_empty_charset() {
        let config = CharsetConfig {
            uppercase: false,
            lowercase: false,
            digits: false,
            symbols: false,
            exclude_similar: false,
        };
        let err = generate_random_password(16, &config).unwrap_err();
        assert!(err.to_string().contains("at least one charset"));
    }

    #[test]
    fn consecutive_passwords_differ() {
        let a = generate_random_password(32, &CharsetConfig::default()).unwrap();
        let b = generate_random_password(32, &CharsetConfig::default()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn charset_config_serde_is_camel_case() {
        let json = serde_json::to_string(&CharsetConfig::default()).unwrap();
        assert!(json.contains("excludeSimilar"));
        let parsed: CharsetConfig =
            serde_json::from_str(r#"{"uppercase":true,"lowercase":false,"digits":true,"symbols":false}"#)
                .unwrap();
        assert!(!parsed.exclude_similar);
        assert!(!parsed.lowercase);
    }
}
