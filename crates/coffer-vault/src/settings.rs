//! Key/value application settings stored next to the records.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::SETTINGS_TABLE;
use crate::error::VaultError;

/// Read a setting. Absent keys are `Ok(None)`.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, VaultError> {
    conn.query_row(
        &format!("SELECT value FROM {SETTINGS_TABLE} WHERE key = ?1"),
        params![key],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map(Option::flatten)
    .map_err(|e| VaultError::Database(format!("failed to read setting {key}: {e}")))
}

/// Insert or replace a setting.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the write fails.
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), VaultError> {
    conn.execute(
        &format!(
            "INSERT INTO {SETTINGS_TABLE} (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value"
        ),
        params![key, value],
    )
    .map_err(|e| VaultError::Database(format!("failed to write setting {key}: {e}")))?;
    Ok(())
}

/// Remove a setting. Returns whether it existed.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the delete fails.
pub fn delete_setting(conn: &Connection, key: &str) -> Result<bool, VaultError> {
    let rows = conn
        .execute(
            &format!("DELETE FROM {SETTINGS_TABLE} WHERE key = ?1"),
            params![key],
        )
        .map_err(|e| VaultError::Database(format!("failed to delete setting {key}: {e}")))?;
    Ok(rows > 0)
}
