//! `SQLite` connection and additive schema evolution.
//!
//! The record table only ever grows. On every start [`VaultStore::init_schema`]
//! creates the base tables if needed, then adds each column of the field
//! superset that the table lacks. Column additions are independent: one
//! failure is logged and recorded in the [`MigrationReport`] while the rest
//! carry on.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::VaultError;
use crate::schema::Field;

/// Name of the credential record table.
pub const RECORD_TABLE: &str = "passwords";

/// Name of the key/value settings table.
pub const SETTINGS_TABLE: &str = "app_settings";

const BASE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS passwords (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    name        TEXT NOT NULL,
    type        TEXT NOT NULL DEFAULT 'WEB',
    username    TEXT,
    password    TEXT
);
CREATE TABLE IF NOT EXISTS app_settings (
    key   TEXT PRIMARY KEY,
    value TEXT
);
";

// ---------------------------------------------------------------------------
// Column superset
// ---------------------------------------------------------------------------

/// Every column the record table should carry beyond the base schema,
/// with its declaration.
#[must_use]
pub fn column_superset() -> Vec<(&'static str, &'static str)> {
    let mut columns = vec![
        ("is_favorite", "INTEGER NOT NULL DEFAULT 0"),
        ("last_used_at", "TEXT"),
    ];
    columns.extend(Field::ALL.iter().map(|f| (f.column(), "TEXT")));
    columns
}

/// Outcome of one [`VaultStore::init_schema`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Columns added by this run.
    pub added: Vec<String>,
    /// Columns that could not be added, with the `SQLite` error.
    pub failed: Vec<(String, String)>,
}

impl MigrationReport {
    /// Whether every wanted column is now present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// VaultStore
// ---------------------------------------------------------------------------

/// Handle to the record database.
///
/// Single-writer: one store per process, used from one control flow.
pub struct VaultStore {
    conn: Connection,
}

impl fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultStore(***)")
    }
}

impl VaultStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Does not touch the schema; call [`init_schema`](Self::init_schema).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        let conn = Connection::open(path)
            .map_err(|e| VaultError::Database(format!("failed to open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if `SQLite` cannot allocate it.
    pub fn open_in_memory() -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| VaultError::Database(format!("failed to open database: {e}")))?;
        Ok(Self { conn })
    }

    /// Returns a reference to the underlying [`rusqlite::Connection`].
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create missing tables, then add missing columns one by one.
    ///
    /// Running this again on an up-to-date store changes nothing and
    /// returns an empty report.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if the base tables cannot be created
    /// or the column list cannot be read. Individual column failures are
    /// reported, not raised.
    pub fn init_schema(&self) -> Result<MigrationReport, VaultError> {
        self.conn
            .execute_batch(BASE_SCHEMA)
            .map_err(|e| VaultError::Database(format!("failed to create base tables: {e}")))?;

        let existing = self.record_columns()?;
        let report = add_missing_columns(&self.conn, &existing, &column_superset());
        if report.added.is_empty() && report.failed.is_empty() {
            debug!("record schema up to date");
        } else {
            info!(
                added = report.added.len(),
                failed = report.failed.len(),
                "record schema upgraded"
            );
        }
        Ok(report)
    }

    /// Column names currently present on the record table.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if `PRAGMA table_info` fails.
    pub fn record_columns(&self) -> Result<BTreeSet<String>, VaultError> {
        table_columns(&self.conn, RECORD_TABLE)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>, VaultError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| VaultError::Database(format!("failed to read table info: {e}")))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| VaultError::Database(format!("failed to read table info: {e}")))?;
    let mut columns = BTreeSet::new();
    for name in names {
        columns.insert(name.map_err(|e| VaultError::Database(format!("row read error: {e}")))?);
    }
    Ok(columns)
}

/// Best-effort `ALTER TABLE ... ADD COLUMN` for each wanted column not in
/// `existing`. Never stops early.
fn add_missing_columns(
    conn: &Connection,
    existing: &BTreeSet<String>,
    wanted: &[(&str, &str)],
) -> MigrationReport {
    let mut report = MigrationReport::default();
    for (column, decl) in wanted {
        if existing.contains(*column) {
            continue;
        }
        let sql = format!("ALTER TABLE {RECORD_TABLE} ADD COLUMN {column} {decl}");
        match conn.execute_batch(&sql) {
            Ok(()) => {
                debug!(column, "added record column");
                report.added.push((*column).to_string());
            }
            Err(e) => {
                warn!(column, error = %e, "could not add record column");
                report.failed.push(((*column).to_string(), e.to_string()));
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
