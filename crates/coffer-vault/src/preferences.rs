//! Non-sensitive user preferences, stored as plain JSON next to the vault.
//!
//! Readable before unlock so the host knows whether to ask for the master
//! password and how long the inactivity window is.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ── Top-level preferences ──────────────────────────────────────────

/// Application preferences.
///
/// Persisted to `{data_dir}/preferences.json`. Every field has a default,
/// so partial or older files load cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Ask for the master password on start. When off, a vault with a
    /// stored hash starts unlocked.
    #[serde(default = "default_true")]
    pub require_login: bool,

    /// Minutes of inactivity before the vault locks (0 = never).
    #[serde(default = "default_auto_lock_minutes")]
    pub auto_lock_minutes: u32,

    /// Re-enter the master password before revealing a sensitive field.
    #[serde(default)]
    pub confirm_sensitive_actions: bool,

    /// Flag records whose password is shorter than the weak threshold.
    #[serde(default = "default_true")]
    pub notify_weak: bool,

    /// Flag records not modified for [`expired_after_days`](Self::expired_after_days).
    #[serde(default = "default_true")]
    pub notify_expired: bool,

    /// Delay unlock attempts after repeated failures.
    #[serde(default)]
    pub unlock_backoff: bool,

    /// Age in days after which a record counts as stale.
    #[serde(default = "default_expired_after_days")]
    pub expired_after_days: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            require_login: true,
            auto_lock_minutes: default_auto_lock_minutes(),
            confirm_sensitive_actions: false,
            notify_weak: true,
            notify_expired: true,
            unlock_backoff: false,
            expired_after_days: default_expired_after_days(),
        }
    }
}

const fn default_true() -> bool {
    true
}
const fn default_auto_lock_minutes() -> u32 {
    5
}
const fn default_expired_after_days() -> u32 {
    365
}

// ── File locations ─────────────────────────────────────────────────

const PREFERENCES_FILE: &str = "preferences.json";
const DATABASE_FILE: &str = "coffer.db";
const KEY_FILE: &str = "coffer.key";

/// Locations of the vault's files inside one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    data_dir: PathBuf,
}

impl VaultPaths {
    /// Paths under `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Record database.
    #[must_use]
    pub fn database(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Raw field key.
    #[must_use]
    pub fn key_file(&self) -> PathBuf {
        self.data_dir.join(KEY_FILE)
    }

    /// Preferences document.
    #[must_use]
    pub fn preferences(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }
}

// ── File I/O ───────────────────────────────────────────────────────

impl Preferences {
    /// Load preferences from `{data_dir}/preferences.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or
    /// contains invalid JSON.
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(PREFERENCES_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| serde_json::from_str(&contents).unwrap_or_default(),
        )
    }

    /// Persist preferences to `{data_dir}/preferences.json`.
    ///
    /// Writes to a `.tmp` sibling first, then renames over the target.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write/rename.
    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        let path = data_dir.join(PREFERENCES_FILE);
        let tmp = data_dir.join(".preferences.json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_values_are_correct() {
        let prefs = Preferences::default();
        assert!(prefs.require_login);
        assert_eq!(prefs.auto_lock_minutes, 5);
        assert!(!prefs.confirm_sensitive_actions);
        assert!(prefs.notify_weak);
        assert!(prefs.notify_expired);
        assert!(!prefs.unlock_backoff);
        assert_eq!(prefs.expired_after_days, 365);
    }

    #[test]
    fn load_returns_default_on_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Preferences::load(dir.path()), Preferences::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences {
            require_login: false,
            auto_lock_minutes: 0,
            confirm_sensitive_actions: true,
            ..Preferences::default()
        };
        prefs.save(dir.path()).unwrap();
        assert_eq!(Preferences::load(dir.path()), prefs);
    }

    #[test]
    fn load_recovers_from_corrupt_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PREFERENCES_FILE), "{ this is not valid json }}}").unwrap();
        assert_eq!(Preferences::load(dir.path()), Preferences::default());
    }

    #[test]
    fn load_handles_partial_json_with_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PREFERENCES_FILE),
            r#"{"autoLockMinutes":15}"#,
        )
        .unwrap();
        let prefs = Preferences::load(dir.path());
        assert_eq!(prefs.auto_lock_minutes, 15);
        assert!(prefs.require_login);
        assert_eq!(prefs.expired_after_days, 365);
    }

    #[test]
    fn save_is_atomic_via_tmp_file() {
        let dir = TempDir::new().unwrap();
        Preferences::default().save(dir.path()).unwrap();
        assert!(!dir.path().join(".preferences.json.tmp").exists());
        assert!(dir.path().join(PREFERENCES_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        Preferences::default().save(dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join(PREFERENCES_FILE))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&Preferences::default()).unwrap();
        assert!(json.contains("autoLockMinutes"));
        assert!(json.contains("confirmSensitiveActions"));
        assert!(!json.contains("auto_lock_minutes"));
    }

    #[test]
    fn vault_paths_share_one_directory() {
        let paths = VaultPaths::new("/data/coffer");
        assert_eq!(paths.database(), Path::new("/data/coffer/coffer.db"));
        assert_eq!(paths.key_file(), Path::new("/data/coffer/coffer.key"));
        assert_eq!(paths.preferences(), Path::new("/data/coffer/preferences.json"));
        assert_eq!(paths.data_dir(), Path::new("/data/coffer"));
    }
}
