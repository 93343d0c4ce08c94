//! The vault facade: every operation a host needs, behind the session gate.
//!
//! [`Vault`] owns the store, the field cipher, the session and the
//! inactivity poll. Record reads and writes, decryption and reveals require
//! an unlocked session and fail with [`VaultError::Locked`] otherwise.

use std::fmt;
use std::fs;
use std::sync::Arc;

use coffer_crypto_core::{
    generate_random_password, Argon2idParams, CharsetConfig, FieldCipher, SecretBytes, KEY_LEN,
};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::auth::{self, UnlockThrottle};
use crate::clock::{format_iso8601, Clock, SystemClock};
use crate::db::{MigrationReport, VaultStore};
use crate::error::VaultError;
use crate::health::{self, HealthReport, StaleRecord};
use crate::keyfile;
use crate::preferences::{Preferences, VaultPaths};
use crate::query::{self, RecordQuery, RecordSummary, VaultStats};
use crate::records::{self, CredentialRecord, RecordData, Sealed};
use crate::scheduler::{InactivityPoll, PollOutcome, DEFAULT_POLL_INTERVAL};
use crate::schema::{self, Field, FieldValues, RecordType};
use crate::session::{SessionState, VaultSession};

/// An open vault.
pub struct Vault {
    store: VaultStore,
    cipher: FieldCipher,
    session: VaultSession,
    poll: InactivityPoll,
    throttle: UnlockThrottle,
    clock: Arc<dyn Clock>,
    kdf: Argon2idParams,
    preferences: Preferences,
    migration: MigrationReport,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("state", &self.session.state())
            .finish_non_exhaustive()
    }
}

impl Vault {
    // -----------------------------------------------------------------------
    // Opening
    // -----------------------------------------------------------------------

    /// Open the vault in `paths`, creating the directory, database and key
    /// file on first run.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Io`] if the directory or key file cannot be created.
    /// - [`VaultError::KeyFile`] if an existing key file is malformed.
    /// - [`VaultError::Database`] if the database cannot be opened.
    pub fn open(paths: &VaultPaths, preferences: Preferences) -> Result<Self, VaultError> {
        fs::create_dir_all(paths.data_dir())?;
        let key = keyfile::load_or_create_key(&paths.key_file())?;
        let store = VaultStore::open(&paths.database())?;
        Self::open_with(
            store,
            &key,
            preferences,
            Arc::new(SystemClock),
            Argon2idParams::default(),
        )
    }

    /// Open over an explicit store, key, clock and hashing cost.
    ///
    /// Runs the schema upgrade and derives the initial session state: no
    /// stored hash is `Uninitialized`, otherwise `Locked`. When
    /// [`Preferences::require_login`] is off the session starts unlocked.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Database`] if the schema cannot be initialised.
    /// - [`VaultError::Crypto`] if the key is rejected by the cipher.
    pub fn open_with(
        store: VaultStore,
        key: &SecretBytes<KEY_LEN>,
        preferences: Preferences,
        clock: Arc<dyn Clock>,
        kdf: Argon2idParams,
    ) -> Result<Self, VaultError> {
        let migration = store.init_schema()?;
        for (column, error) in &migration.failed {
            warn!(column = %column, error = %error, "record column unavailable");
        }

        let cipher = FieldCipher::new(key)?;
        let now = clock.now_millis();
        let initial = if auth::has_master_password(store.connection())? {
            SessionState::Locked
        } else {
            SessionState::Uninitialized
        };
        let mut session = VaultSession::new(initial, preferences.auto_lock_minutes, now);
        if !preferences.require_login {
            session.unlock(now);
        }

        Ok(Self {
            store,
            cipher,
            session,
            poll: InactivityPoll::new(DEFAULT_POLL_INTERVAL, now),
            throttle: UnlockThrottle::new(preferences.unlock_backoff),
            clock,
            kdf,
            preferences,
            migration,
        })
    }

    /// Outcome of the schema upgrade run at open.
    #[must_use]
    pub const fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    /// Preferences in effect.
    #[must_use]
    pub const fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Apply changed preferences to the running session.
    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.session
            .set_auto_lock_minutes(preferences.auto_lock_minutes);
        if preferences.unlock_backoff != self.preferences.unlock_backoff {
            self.throttle = UnlockThrottle::new(preferences.unlock_backoff);
        }
        self.preferences = preferences;
    }

    fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    fn now_iso(&self) -> String {
        format_iso8601(self.now())
    }

    fn ensure_unlocked(&self) -> Result<(), VaultError> {
        if self.session.is_unlocked() {
            Ok(())
        } else {
            Err(VaultError::Locked)
        }
    }

    // -----------------------------------------------------------------------
    // Record lifecycle
    // -----------------------------------------------------------------------

    /// Validate, seal and store a new record. Returns its ID.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::Validation`] listing every field problem.
    /// - [`VaultError::Crypto`] or [`VaultError::Database`] on failure.
    pub fn create_record(
        &mut self,
        record_type: RecordType,
        values: &FieldValues,
    ) -> Result<i64, VaultError> {
        self.ensure_unlocked()?;
        let issues = schema::validate(record_type, values);
        if !issues.is_empty() {
            return Err(VaultError::Validation(issues));
        }
        let data = RecordData::seal(record_type, values, &self.cipher)?;
        let name = values.get(Field::Name).unwrap_or_default();
        let id = records::insert_record(self.store.connection(), name, &data, &self.now_iso())?;
        info!(id, record_type = %record_type, "record created");
        Ok(id)
    }

    /// Change some fields of a record. Absent fields keep their value; an
    /// empty value clears the field.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::RecordNotFound`] if `id` does not exist.
    /// - [`VaultError::Validation`] listing every field problem.
    pub fn update_record(&mut self, id: i64, changes: &FieldValues) -> Result<(), VaultError> {
        self.ensure_unlocked()?;
        let conn = self.store.connection();
        let record_type = records::get_record_type(conn, id)?;
        let issues = schema::validate_changes(record_type, changes);
        if !issues.is_empty() {
            return Err(VaultError::Validation(issues));
        }

        let mut record = records::get_record(conn, id)?;
        record.data.apply(changes, &self.cipher)?;
        let name = changes.get(Field::Name).unwrap_or(&record.name);
        records::update_record(conn, id, name, &record.data, &self.now_iso())?;
        info!(id, "record updated");
        Ok(())
    }

    /// Delete records atomically. Unknown IDs are ignored; returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::Database`] if the transaction fails, in which case
    ///   nothing was deleted.
    pub fn delete_records(&mut self, ids: &[i64]) -> Result<usize, VaultError> {
        self.ensure_unlocked()?;
        let removed = records::delete_records(self.store.connection(), ids)?;
        info!(requested = ids.len(), removed, "records deleted");
        Ok(removed)
    }

    /// Full record with sensitive fields still sealed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::RecordNotFound`] if `id` does not exist.
    pub fn get_record(&self, id: i64) -> Result<CredentialRecord, VaultError> {
        self.ensure_unlocked()?;
        records::get_record(self.store.connection(), id)
    }

    /// Filtered, searched and sorted projections.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::Database`] if the query fails.
    pub fn list_records(&self, query: &RecordQuery) -> Result<Vec<RecordSummary>, VaultError> {
        self.ensure_unlocked()?;
        query::list_records(self.store.connection(), query)
    }

    /// Set or clear the favorite flag.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::RecordNotFound`] if `id` does not exist.
    pub fn set_favorite(&mut self, id: i64, favorite: bool) -> Result<(), VaultError> {
        self.ensure_unlocked()?;
        records::set_favorite(self.store.connection(), id, favorite, &self.now_iso())
    }

    // -----------------------------------------------------------------------
    // Decryption
    // -----------------------------------------------------------------------

    /// Decrypt a sealed value for display.
    ///
    /// On failure the host shows [`DecryptionFailure::PLACEHOLDER`](coffer_crypto_core::DecryptionFailure::PLACEHOLDER).
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::Decryption`] if the value is unreadable.
    pub fn decrypt_for_display(&self, sealed: &Sealed) -> Result<Zeroizing<String>, VaultError> {
        self.ensure_unlocked()?;
        Ok(sealed.open(&self.cipher)?)
    }

    /// Reveal one field of a record and stamp its `last_used_at`.
    ///
    /// Sensitive fields are decrypted. When
    /// [`Preferences::confirm_sensitive_actions`] is on, `confirm_password`
    /// must be the master password. Returns `None` for an empty field.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::AuthMismatch`] if confirmation is required and fails.
    /// - [`VaultError::RecordNotFound`] if `id` does not exist.
    /// - [`VaultError::Decryption`] if the value is unreadable.
    pub fn reveal_field(
        &mut self,
        id: i64,
        field: Field,
        confirm_password: Option<&str>,
    ) -> Result<Option<Zeroizing<String>>, VaultError> {
        self.ensure_unlocked()?;
        if field.is_sensitive()
            && !self.confirm_sensitive_action(confirm_password.unwrap_or_default())?
        {
            return Err(VaultError::AuthMismatch);
        }

        let conn = self.store.connection();
        let record = records::get_record(conn, id)?;
        let value = if field == Field::Name {
            Some(Zeroizing::new(record.name))
        } else if let Some(sealed) = record.data.sealed(field) {
            Some(sealed.open(&self.cipher)?)
        } else {
            record.data.stored(field).map(Zeroizing::new)
        };

        if value.is_some() && field.is_sensitive() {
            records::touch_last_used(conn, id, &self.now_iso())?;
        }
        Ok(value)
    }

    /// Stamp `last_used_at` for a copy the host performed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    /// - [`VaultError::RecordNotFound`] if `id` does not exist.
    pub fn mark_used(&mut self, id: i64) -> Result<(), VaultError> {
        self.ensure_unlocked()?;
        records::touch_last_used(self.store.connection(), id, &self.now_iso())
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Whether decryption is currently allowed.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    /// Whether a master password is stored.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if the settings table is unreadable.
    pub fn has_master_password(&self) -> Result<bool, VaultError> {
        auth::has_master_password(self.store.connection())
    }

    /// Store the first master password and unlock.
    ///
    /// # Errors
    ///
    /// - [`VaultError::AlreadyInitialized`] if a hash is already stored.
    /// - [`VaultError::EmptyPassword`] for an empty password.
    pub fn set_initial_password(&mut self, password: &str) -> Result<(), VaultError> {
        if self.has_master_password()? {
            return Err(VaultError::AlreadyInitialized);
        }
        if password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        auth::store_master_password(self.store.connection(), password, &self.kdf)?;
        info!("master password set");
        self.session.unlock(self.now());
        Ok(())
    }

    /// Verify the master password and unlock.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotInitialized`] if no hash is stored.
    /// - [`VaultError::RateLimited`] while a backoff is running.
    /// - [`VaultError::AuthMismatch`] for a wrong password; the session
    ///   stays as it was.
    pub fn unlock(&mut self, password: &str) -> Result<(), VaultError> {
        let now = self.now();
        self.throttle.check(now)?;
        if !auth::check_master_password(self.store.connection(), password, &self.kdf)? {
            self.throttle.record_failure(now);
            warn!(
                failed_attempts = self.throttle.failed_attempts(),
                "master password rejected"
            );
            return Err(VaultError::AuthMismatch);
        }
        self.throttle.record_success();
        self.session.unlock(now);
        Ok(())
    }

    /// Lock now. Locking a locked vault does nothing.
    pub fn lock(&mut self) {
        self.session.lock();
    }

    /// Forget the master password and return to `Uninitialized`.
    ///
    /// The field key is left untouched, so existing records decrypt again
    /// once a new password is set.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if the hash cannot be deleted.
    pub fn reset_password(&mut self) -> Result<(), VaultError> {
        auth::clear_master_password(self.store.connection())?;
        self.session.reset();
        self.throttle.record_success();
        warn!("master password reset; field key kept, existing records stay readable");
        Ok(())
    }

    /// Replace the master password after checking the current one.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotInitialized`] if no hash is stored.
    /// - [`VaultError::AuthMismatch`] if `current` is wrong.
    /// - [`VaultError::EmptyPassword`] if `new` is empty.
    pub fn change_master_password(&mut self, current: &str, new: &str) -> Result<(), VaultError> {
        if new.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        let conn = self.store.connection();
        if !auth::check_master_password(conn, current, &self.kdf)? {
            warn!("master password change rejected");
            return Err(VaultError::AuthMismatch);
        }
        auth::store_master_password(conn, new, &self.kdf)?;
        info!("master password changed");
        Ok(())
    }

    /// Note a user interaction.
    pub fn record_activity(&mut self) {
        let now = self.now();
        self.session.record_activity(now);
    }

    /// Re-check the master password before a sensitive action.
    ///
    /// Always `true` when confirmation is turned off. Never changes the
    /// lock state.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotInitialized`] if confirmation is on but no hash
    ///   is stored.
    pub fn confirm_sensitive_action(&self, password: &str) -> Result<bool, VaultError> {
        if !self.preferences.confirm_sensitive_actions {
            return Ok(true);
        }
        auth::check_master_password(self.store.connection(), password, &self.kdf)
    }

    /// Run the inactivity check immediately. Returns whether it locked.
    pub fn check_inactivity(&mut self) -> bool {
        let now = self.now();
        self.session.check_inactivity(now)
    }

    /// Drive the inactivity poll from the host's loop.
    pub fn tick(&mut self) -> PollOutcome {
        let now = self.now();
        self.poll.tick(now, &mut self.session)
    }

    // -----------------------------------------------------------------------
    // Extras
    // -----------------------------------------------------------------------

    /// Generate a random password. Needs no session.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] for an out-of-range length or an
    /// empty charset selection.
    pub fn generate_password(
        &self,
        length: usize,
        charsets: &CharsetConfig,
    ) -> Result<String, VaultError> {
        Ok(generate_random_password(length, charsets)?)
    }

    /// Record count and newest modification.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    pub fn stats(&self) -> Result<VaultStats, VaultError> {
        self.ensure_unlocked()?;
        query::stats(self.store.connection())
    }

    /// Records older than [`Preferences::expired_after_days`].
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    pub fn stale_records(&self) -> Result<Vec<StaleRecord>, VaultError> {
        self.ensure_unlocked()?;
        health::stale_records(
            self.store.connection(),
            self.now(),
            self.preferences.expired_after_days,
        )
    }

    /// Weak and stale hints, each only when its notification is enabled.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Locked`] unless unlocked.
    pub fn health_report(&self) -> Result<HealthReport, VaultError> {
        self.ensure_unlocked()?;
        let mut report = HealthReport::default();
        if self.preferences.notify_weak {
            let (weak, unreadable) = health::weak_records(self.store.connection(), &self.cipher)?;
            report.weak = weak;
            report.unreadable = unreadable;
        }
        if self.preferences.notify_expired {
            report.stale = self.stale_records()?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;

    fn vault_with(prefs: Preferences) -> (Vault, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let vault = Vault::open_with(
            VaultStore::open_in_memory().unwrap(),
            &SecretBytes::new([3u8; KEY_LEN]),
            prefs,
            Arc::new(clock.clone()),
            Argon2idParams::TESTING,
        )
        .unwrap();
        (vault, clock)
    }

    fn unlocked_vault() -> (Vault, ManualClock) {
        let (mut vault, clock) = vault_with(Preferences::default());
        vault.set_initial_password("master").unwrap();
        (vault, clock)
    }

    #[test]
    fn fresh_vault_is_uninitialized() {
        let (vault, _) = vault_with(Preferences::default());
        assert_eq!(vault.state(), SessionState::Uninitialized);
        assert!(!vault.has_master_password().unwrap());
        assert!(vault.migration_report().is_complete());
    }

    #[test]
    fn record_access_requires_unlock() {
        let (mut vault, _) = unlocked_vault();
        vault.lock();
        let values = FieldValues::new().with(Field::Name, "x");
        assert!(matches!(
            vault.create_record(RecordType::Offline, &values),
            Err(VaultError::Locked)
        ));
        assert!(matches!(
            vault.list_records(&RecordQuery::default()),
            Err(VaultError::Locked)
        ));
        assert!(matches!(vault.stats(), Err(VaultError::Locked)));
    }

    #[test]
    fn initial_password_only_once() {
        let (mut vault, _) = unlocked_vault();
        assert!(matches!(
            vault.set_initial_password("again"),
            Err(VaultError::AlreadyInitialized)
        ));
        let (mut fresh, _) = vault_with(Preferences::default());
        assert!(matches!(
            fresh.set_initial_password(""),
            Err(VaultError::EmptyPassword)
        ));
    }

    #[test]
    fn wrong_password_keeps_vault_locked() {
        let (mut vault, _) = unlocked_vault();
        vault.lock();
        assert!(matches!(vault.unlock("nope"), Err(VaultError::AuthMismatch)));
        assert_eq!(vault.state(), SessionState::Locked);
        vault.unlock("master").unwrap();
        assert!(vault.is_unlocked());
    }

    #[test]
    fn backoff_applies_only_when_enabled() {
        let prefs = Preferences {
            unlock_backoff: true,
            ..Preferences::default()
        };
        let (mut vault, clock) = vault_with(prefs);
        vault.set_initial_password("master").unwrap();
        vault.lock();
        for _ in 0..3 {
            assert!(matches!(vault.unlock("x"), Err(VaultError::AuthMismatch)));
        }
        assert!(matches!(
            vault.unlock("master"),
            Err(VaultError::RateLimited { .. })
        ));
        clock.advance(Duration::from_secs(1));
        vault.unlock("master").unwrap();
    }

    #[test]
    fn login_not_required_starts_unlocked() {
        let prefs = Preferences {
            require_login: false,
            ..Preferences::default()
        };
        let (vault, _) = vault_with(prefs);
        assert!(vault.is_unlocked());
    }

    #[test]
    fn confirmation_gate_never_changes_state() {
        let prefs = Preferences {
            confirm_sensitive_actions: true,
            ..Preferences::default()
        };
        let (mut vault, _) = vault_with(prefs);
        vault.set_initial_password("master").unwrap();
        assert!(!vault.confirm_sensitive_action("wrong").unwrap());
        assert!(vault.is_unlocked());
        assert!(vault.confirm_sensitive_action("master").unwrap());
        vault.lock();
        assert!(vault.confirm_sensitive_action("master").unwrap());
        assert_eq!(vault.state(), SessionState::Locked);
    }

    #[test]
    fn confirmation_off_always_passes() {
        let (vault, _) = unlocked_vault();
        assert!(vault.confirm_sensitive_action("anything").unwrap());
    }

    #[test]
    fn change_password_checks_current() {
        let (mut vault, _) = unlocked_vault();
        assert!(matches!(
            vault.change_master_password("bad", "new"),
            Err(VaultError::AuthMismatch)
        ));
        vault.change_master_password("master", "new").unwrap();
        vault.lock();
        assert!(vault.unlock("master").is_err());
        vault.unlock("new").unwrap();
    }

    #[test]
    fn reset_then_lock_leaves_uninitialized() {
        let (mut vault, _) = unlocked_vault();
        vault.reset_password().unwrap();
        assert_eq!(vault.state(), SessionState::Uninitialized);
        vault.lock();
        assert_eq!(vault.state(), SessionState::Uninitialized);
        assert!(matches!(vault.unlock("master"), Err(VaultError::NotInitialized)));
    }

    #[test]
    fn tick_locks_after_idle_window() {
        let (mut vault, clock) = unlocked_vault();
        clock.advance(Duration::from_secs(4 * 60));
        assert_ne!(vault.tick(), PollOutcome::Locked);
        clock.advance(Duration::from_secs(60));
        assert_eq!(vault.tick(), PollOutcome::Locked);
        assert_eq!(vault.state(), SessionState::Locked);
    }

    #[test]
    fn preferences_update_auto_lock() {
        let (mut vault, clock) = unlocked_vault();
        vault.set_preferences(Preferences {
            auto_lock_minutes: 0,
            ..Preferences::default()
        });
        clock.advance(Duration::from_secs(3600));
        assert!(!vault.check_inactivity());
        assert!(vault.is_unlocked());
    }

    #[test]
    fn generator_is_available_while_locked() {
        let (mut vault, _) = unlocked_vault();
        vault.lock();
        let pw = vault.generate_password(16, &CharsetConfig::default()).unwrap();
        assert_eq!(pw.chars().count(), 16);
        assert!(vault.generate_password(3, &CharsetConfig::default()).is_err());
    }
}
