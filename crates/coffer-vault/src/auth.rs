//! Master-password verification and failed-attempt throttling.
//!
//! The master hash lives in the settings table under [`MASTER_HASH_KEY`].
//! New hashes are Argon2id PHC strings. Vaults created by older releases
//! hold an unsalted SHA-256 hex digest instead; it still verifies and is
//! replaced by an Argon2id hash on the first successful check.
//!
//! The hash only gates access. It is independent of the field key, so
//! clearing it never makes stored ciphertext unreadable.

use coffer_crypto_core::{
    hash_master_password, is_argon2id_hash, verify_legacy_sha256, verify_master_password,
    Argon2idParams,
};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::VaultError;
use crate::settings;

/// Settings key holding the master hash.
pub const MASTER_HASH_KEY: &str = "master_hash";

/// Whether a master hash is stored.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the settings table cannot be read.
pub fn has_master_password(conn: &Connection) -> Result<bool, VaultError> {
    Ok(settings::get_setting(conn, MASTER_HASH_KEY)?.is_some_and(|h| !h.is_empty()))
}

/// Hash `password` and store it, replacing any existing hash.
///
/// # Errors
///
/// - [`VaultError::Crypto`] if hashing fails.
/// - [`VaultError::Database`] if the write fails.
pub fn store_master_password(
    conn: &Connection,
    password: &str,
    params: &Argon2idParams,
) -> Result<(), VaultError> {
    let hash = hash_master_password(password.as_bytes(), params)?;
    settings::set_setting(conn, MASTER_HASH_KEY, &hash)
}

/// Check `password` against the stored hash.
///
/// A matching legacy digest is upgraded to Argon2id before returning.
///
/// # Errors
///
/// - [`VaultError::NotInitialized`] if no hash is stored.
/// - [`VaultError::Crypto`] if the stored Argon2id hash is unreadable.
/// - [`VaultError::Database`] if the settings table cannot be accessed.
pub fn check_master_password(
    conn: &Connection,
    password: &str,
    params: &Argon2idParams,
) -> Result<bool, VaultError> {
    let stored = settings::get_setting(conn, MASTER_HASH_KEY)?
        .filter(|h| !h.is_empty())
        .ok_or(VaultError::NotInitialized)?;

    if is_argon2id_hash(&stored) {
        return Ok(verify_master_password(password.as_bytes(), &stored)?);
    }

    if !verify_legacy_sha256(password.as_bytes(), &stored) {
        return Ok(false);
    }
    // Upgrade failure leaves the legacy digest in place, which still works.
    match store_master_password(conn, password, params) {
        Ok(()) => info!("upgraded legacy master hash to Argon2id"),
        Err(e) => warn!(error = %e, "could not upgrade legacy master hash"),
    }
    Ok(true)
}

/// Delete the stored hash. Returns whether one existed.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the delete fails.
pub fn clear_master_password(conn: &Connection) -> Result<bool, VaultError> {
    settings::delete_setting(conn, MASTER_HASH_KEY)
}

// ---------------------------------------------------------------------------
// Failed-attempt backoff
// ---------------------------------------------------------------------------

/// Backoff schedule: (`min_attempts`, `delay_ms`), checked from highest.
const BACKOFF_SCHEDULE: &[(u32, u64)] = &[
    (10, 300_000), // 10+ attempts → 5 minutes
    (8, 30_000),   //  8+ attempts → 30 seconds
    (5, 5_000),    //  5+ attempts → 5 seconds
    (3, 1_000),    //  3+ attempts → 1 second
];

/// Delay required after `attempts` consecutive failures.
fn required_delay_ms(attempts: u32) -> u64 {
    for &(threshold, delay) in BACKOFF_SCHEDULE {
        if attempts >= threshold {
            return delay;
        }
    }
    0
}

/// In-memory count of consecutive failed unlock attempts.
///
/// Disabled throttles count failures but never refuse an attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockThrottle {
    enabled: bool,
    failed_attempts: u32,
    last_failure_ms: Option<u64>,
}

impl UnlockThrottle {
    /// New throttle with no recorded failures.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            failed_attempts: 0,
            last_failure_ms: None,
        }
    }

    /// Consecutive failures since the last success.
    #[must_use]
    pub const fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Refuse the attempt if a cooldown is running.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::RateLimited`] with the time left.
    pub fn check(&self, now_ms: u64) -> Result<(), VaultError> {
        if !self.enabled {
            return Ok(());
        }
        let delay_ms = required_delay_ms(self.failed_attempts);
        let Some(last) = self.last_failure_ms else {
            return Ok(());
        };
        let elapsed_ms = now_ms.saturating_sub(last);
        if elapsed_ms < delay_ms {
            return Err(VaultError::RateLimited {
                remaining_ms: delay_ms.saturating_sub(elapsed_ms),
            });
        }
        Ok(())
    }

    /// Count a failed attempt.
    pub fn record_failure(&mut self, now_ms: u64) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.last_failure_ms = Some(now_ms);
    }

    /// Reset after a successful attempt.
    pub fn record_success(&mut self) {
        self.failed_attempts = 0;
        self.last_failure_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::VaultStore;

    // sha256("password")
    const LEGACY: &str = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";

    fn store() -> VaultStore {
        let store = VaultStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    #[test]
    fn store_and_check() {
        let store = store();
        let conn = store.connection();
        assert!(!has_master_password(conn).unwrap());
        store_master_password(conn, "hunter2", &Argon2idParams::TESTING).unwrap();
        assert!(has_master_password(conn).unwrap());
        assert!(check_master_password(conn, "hunter2", &Argon2idParams::TESTING).unwrap());
        assert!(!check_master_password(conn, "hunter3", &Argon2idParams::TESTING).unwrap());
    }

    #[test]
    fn check_without_hash_is_not_initialized() {
        let store = store();
        assert!(matches!(
            check_master_password(store.connection(), "x", &Argon2idParams::TESTING),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn legacy_digest_is_upgraded_on_success() {
        let store = store();
        let conn = store.connection();
        settings::set_setting(conn, MASTER_HASH_KEY, LEGACY).unwrap();

        assert!(!check_master_password(conn, "wrong", &Argon2idParams::TESTING).unwrap());
        assert_eq!(
            settings::get_setting(conn, MASTER_HASH_KEY).unwrap().as_deref(),
            Some(LEGACY)
        );

        assert!(check_master_password(conn, "password", &Argon2idParams::TESTING).unwrap());
        let upgraded = settings::get_setting(conn, MASTER_HASH_KEY).unwrap().unwrap();
        assert!(is_argon2id_hash(&upgraded));
        assert!(check_master_password(conn, "password", &Argon2idParams::TESTING).unwrap());
    }

    #[test]
    fn clear_removes_hash() {
        let store = store();
        let conn = store.connection();
        store_master_password(conn, "pw", &Argon2idParams::TESTING).unwrap();
        assert!(clear_master_password(conn).unwrap());
        assert!(!has_master_password(conn).unwrap());
        assert!(!clear_master_password(conn).unwrap());
    }

    #[test]
    fn backoff_schedule() {
        assert_eq!(required_delay_ms(0), 0);
        assert_eq!(required_delay_ms(2), 0);
        assert_eq!(required_delay_ms(3), 1_000);
        assert_eq!(required_delay_ms(5), 5_000);
        assert_eq!(required_delay_ms(8), 30_000);
        assert_eq!(required_delay_ms(10), 300_000);
        assert_eq!(required_delay_ms(u32::MAX), 300_000);
    }

    #[test]
    fn throttle_refuses_during_cooldown() {
        let mut throttle = UnlockThrottle::new(true);
        for _ in 0..3 {
            throttle.check(1_000).unwrap();
            throttle.record_failure(1_000);
        }
        match throttle.check(1_400) {
            Err(VaultError::RateLimited { remaining_ms }) => assert_eq!(remaining_ms, 600),
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert!(throttle.check(2_000).is_ok());
        throttle.record_success();
        assert_eq!(throttle.failed_attempts(), 0);
        assert!(throttle.check(2_000).is_ok());
    }

    #[test]
    fn disabled_throttle_never_refuses() {
        let mut throttle = UnlockThrottle::new(false);
        for _ in 0..20 {
            throttle.record_failure(0);
        }
        assert_eq!(throttle.failed_attempts(), 20);
        assert!(throttle.check(0).is_ok());
    }
}
