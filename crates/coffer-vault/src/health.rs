//! Password health hints: weak and stale records.
//!
//! Analysis decrypts inside the vault and returns only record references
//! and verdicts, never the passwords themselves.

use coffer_crypto_core::FieldCipher;
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::clock::parse_timestamp;
use crate::error::VaultError;
use crate::query::{self, RecordQuery};
use crate::records;
use crate::schema::Field;

/// Passwords shorter than this many characters count as weak.
pub const WEAK_PASSWORD_MIN_CHARS: usize = 8;

const DAY_MS: u64 = 86_400_000;

// ---------------------------------------------------------------------------
// Password strength
// ---------------------------------------------------------------------------

/// Password strength tier.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Fair,
    Good,
    Excellent,
}

impl PasswordStrength {
    /// Human-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// Score a password by length, character variety and passphrase shape.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn evaluate_password_strength(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    if len < 4 {
        return PasswordStrength::Weak;
    }

    let mut score: u32 = 0;

    if len >= 8 {
        score += 1;
    }
    if len >= 12 {
        score += 1;
    }
    if len >= 16 {
        score += 1;
    }

    let has_lower = password.chars().any(char::is_lowercase);
    let has_upper = password.chars().any(char::is_uppercase);
    if has_lower && has_upper {
        score += 1;
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }

    if password.chars().any(|c| !c.is_alphanumeric()) {
        score += 1;
    }

    if is_passphrase_like(password) {
        score += 2;
    }

    match score {
        0..=2 => PasswordStrength::Weak,
        3..=4 => PasswordStrength::Fair,
        5 => PasswordStrength::Good,
        _ => PasswordStrength::Excellent,
    }
}

/// Three or more whitespace-separated tokens.
fn is_passphrase_like(s: &str) -> bool {
    s.split_whitespace().nth(2).is_some()
}

/// Whether `password` is below the weak-length threshold.
#[must_use]
pub fn is_weak_password(password: &str) -> bool {
    password.chars().count() < WEAK_PASSWORD_MIN_CHARS
}

// ---------------------------------------------------------------------------
// Record scans
// ---------------------------------------------------------------------------

/// A record with a weak password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakRecord {
    /// Record ID.
    pub id: i64,
    /// Record name.
    pub name: String,
    /// Strength tier of its password.
    pub strength: PasswordStrength,
}

/// A record not modified for a long time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleRecord {
    /// Record ID.
    pub id: i64,
    /// Record name.
    pub name: String,
    /// Whole days since the last modification.
    pub days_since_update: u64,
}

/// Combined hints for the host's notification banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Records with short passwords.
    pub weak: Vec<WeakRecord>,
    /// Records past the age threshold.
    pub stale: Vec<StaleRecord>,
    /// Records whose password could not be decrypted.
    pub unreadable: Vec<i64>,
}

/// Records whose last modification is more than `max_age_days` whole days old.
///
/// Records with an unreadable timestamp are skipped.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if listing fails.
pub fn stale_records(
    conn: &Connection,
    now_ms: u64,
    max_age_days: u32,
) -> Result<Vec<StaleRecord>, VaultError> {
    let stale = query::list_records(conn, &RecordQuery::default())?
        .into_iter()
        .filter_map(|r| {
            let updated = parse_timestamp(&r.updated_at)?;
            let days = now_ms.checked_sub(updated)? / DAY_MS;
            (days > u64::from(max_age_days)).then(|| StaleRecord {
                id: r.id,
                name: r.name,
                days_since_update: days,
            })
        })
        .collect();
    Ok(stale)
}

/// Decrypt each record's password and collect the weak ones.
///
/// Returns the weak records and the IDs whose password would not decrypt.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if listing or reading fails.
pub fn weak_records(
    conn: &Connection,
    cipher: &FieldCipher,
) -> Result<(Vec<WeakRecord>, Vec<i64>), VaultError> {
    let mut weak = Vec::new();
    let mut unreadable = Vec::new();
    for summary in query::list_records(conn, &RecordQuery::default())? {
        let record = records::get_record(conn, summary.id)?;
        let Some(sealed) = record.data.sealed(Field::Password) else {
            continue;
        };
        match sealed.open(cipher) {
            Ok(password) => {
                if is_weak_password(&password) {
                    weak.push(WeakRecord {
                        id: record.id,
                        name: record.name,
                        strength: evaluate_password_strength(&password),
                    });
                }
            }
            Err(failure) => {
                debug!(id = record.id, %failure, "skipping unreadable password");
                unreadable.push(record.id);
            }
        }
    }
    Ok((weak, unreadable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_weak() {
        assert_eq!(evaluate_password_strength(""), PasswordStrength::Weak);
        assert_eq!(evaluate_password_strength("abc"), PasswordStrength::Weak);
        assert_eq!(evaluate_password_strength("abcdefgh"), PasswordStrength::Weak);
    }

    #[test]
    fn twelve_mixed_with_digit_is_fair() {
        assert_eq!(evaluate_password_strength("abcdefGHIJK1"), PasswordStrength::Fair);
    }

    #[test]
    fn sixteen_mixed_with_digit_is_good() {
        assert_eq!(
            evaluate_password_strength("abcdefGHIJKLmno1"),
            PasswordStrength::Good
        );
    }

    #[test]
    fn sixteen_with_everything_is_excellent() {
        assert_eq!(
            evaluate_password_strength("abcdefGHIJKLmn1!"),
            PasswordStrength::Excellent
        );
    }

    #[test]
    fn passphrase_gets_bonus() {
        // 17 chars (3 length points) + spaces count as symbols + 2 bonus.
        assert_eq!(
            evaluate_password_strength("correct horse bat"),
            PasswordStrength::Excellent
        );
        assert!(is_passphrase_like("a b c"));
        assert!(!is_passphrase_like("a b"));
    }

    #[test]
    fn weak_threshold_counts_chars_not_bytes() {
        assert!(is_weak_password("Secret1"));
        assert!(!is_weak_password("Secret12"));
        assert!(!is_weak_password("пароль12"));
    }

    #[test]
    fn stale_means_strictly_older_than_the_threshold() {
        let store = crate::db::VaultStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        let data = crate::records::RecordData::Offline(crate::records::OfflineCode::default());
        let base = 1_700_000_000_000;
        let conn = store.connection();
        let fresh = records::insert_record(conn, "fresh", &data, &crate::clock::format_iso8601(base)).unwrap();
        let edge = records::insert_record(
            conn,
            "edge",
            &data,
            &crate::clock::format_iso8601(base - 365 * DAY_MS - (DAY_MS - 1)),
        )
        .unwrap();
        let old = records::insert_record(
            conn,
            "old",
            &data,
            &crate::clock::format_iso8601(base - 366 * DAY_MS),
        )
        .unwrap();

        let stale = stale_records(conn, base, 365).unwrap();
        let ids: Vec<i64> = stale.iter().map(|r| r.id).collect();
        assert_eq!(ids, [old]);
        assert_eq!(stale[0].days_since_update, 366);
        assert!(!ids.contains(&edge));
        assert!(!ids.contains(&fresh));
    }

    #[test]
    fn strength_labels() {
        assert_eq!(PasswordStrength::Weak.as_str(), "weak");
        assert_eq!(PasswordStrength::Excellent.as_str(), "excellent");
    }
}
