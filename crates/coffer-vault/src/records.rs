//! Credential records: typed data model and CRUD over the record table.
//!
//! Each [`RecordType`] has its own struct carrying only the fields its
//! layout uses. Sensitive members are [`Sealed`] so plaintext cannot reach
//! the store by accident. Variants are mapped to and from the flat column
//! superset through serde, keyed by column name.
//!
//! CRUD functions take a `&Connection` and never encrypt or decrypt; the
//! caller seals values through [`RecordData::seal`] first.

use std::fmt;

use coffer_crypto_core::{DecryptionFailure, FieldCipher};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use zeroize::Zeroizing;

use crate::db::RECORD_TABLE;
use crate::error::VaultError;
use crate::schema::{Field, FieldValues, RecordType};

// ---------------------------------------------------------------------------
// Sealed values
// ---------------------------------------------------------------------------

/// Ciphertext envelope of one sensitive field, as stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sealed(String);

impl Sealed {
    /// Encrypt `plaintext` under `cipher`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] if encryption fails.
    pub fn seal(cipher: &FieldCipher, plaintext: &str) -> Result<Self, VaultError> {
        Ok(Self(cipher.encrypt_field(plaintext)?))
    }

    /// Decrypt under `cipher`.
    ///
    /// # Errors
    ///
    /// Returns the [`DecryptionFailure`] kind if the envelope is malformed,
    /// tampered with or sealed under another key.
    pub fn open(&self, cipher: &FieldCipher) -> Result<Zeroizing<String>, DecryptionFailure> {
        cipher.decrypt_field(&self.0)
    }

    /// Stored envelope text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Sealed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sealed({} chars)", self.0.len())
    }
}

// ---------------------------------------------------------------------------
// Per-type data
// ---------------------------------------------------------------------------

/// WEB: website or online service login.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebLogin {
    pub username: Option<String>,
    pub password: Option<Sealed>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub security_question: Option<String>,
    pub security_answer: Option<Sealed>,
    pub recovery_email: Option<String>,
    pub recovery_phone: Option<String>,
    pub notes: Option<String>,
}

/// OFFLINE: a code or secret text with no online account behind it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OfflineCode {
    pub password: Option<Sealed>,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// SOCIAL: social network account.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialAccount {
    pub username: Option<String>,
    pub password: Option<Sealed>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub recovery_email: Option<String>,
    pub recovery_phone: Option<String>,
    pub notes: Option<String>,
}

/// EMAIL: mailbox account. `username` holds the address.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailAccount {
    pub username: Option<String>,
    pub password: Option<Sealed>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub recovery_email: Option<String>,
    pub security_question: Option<String>,
    pub security_answer: Option<Sealed>,
    pub notes: Option<String>,
}

/// BANK: bank account with online-banking login.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankAccount {
    pub username: Option<String>,
    pub password: Option<Sealed>,
    pub account_number: Option<Sealed>,
    pub bank_name: Option<String>,
    pub card_number: Option<Sealed>,
    pub phone: Option<String>,
    pub bank_bik: Option<String>,
    pub currency: Option<String>,
    pub account_type: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub identification_number: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// CARD: payment card.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentCard {
    pub card_number: Option<Sealed>,
    pub card_cvv: Option<Sealed>,
    pub card_expire: Option<String>,
    pub card_holder: Option<String>,
    pub bank_name: Option<String>,
    pub card_pin: Option<Sealed>,
    pub card_type: Option<String>,
    pub cardholder_phone: Option<String>,
    pub limit_amount: Option<String>,
    pub cardholder_full_name: Option<String>,
    pub passport_number: Option<Sealed>,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

/// CUSTOM: login, secret and up to ten free fields.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomSecret {
    pub username: Option<String>,
    pub password: Option<Sealed>,
    pub custom_field_1: Option<String>,
    pub custom_field_2: Option<String>,
    pub custom_field_3: Option<String>,
    pub custom_field_4: Option<String>,
    pub custom_field_5: Option<String>,
    pub custom_field_6: Option<String>,
    pub custom_field_7: Option<String>,
    pub custom_field_8: Option<String>,
    pub custom_field_9: Option<String>,
    pub custom_field_10: Option<String>,
    pub notes: Option<String>,
}

/// Type-specific record payload.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    Web(WebLogin),
    Offline(OfflineCode),
    Social(SocialAccount),
    Email(EmailAccount),
    Bank(BankAccount),
    Card(PaymentCard),
    Custom(CustomSecret),
}

/// Column name → stored text, for the non-null data columns of one record.
type Columns = Map<String, serde_json::Value>;

impl RecordData {
    /// Record type of this payload.
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::Web(_) => RecordType::Web,
            Self::Offline(_) => RecordType::Offline,
            Self::Social(_) => RecordType::Social,
            Self::Email(_) => RecordType::Email,
            Self::Bank(_) => RecordType::Bank,
            Self::Card(_) => RecordType::Card,
            Self::Custom(_) => RecordType::Custom,
        }
    }

    /// Build a payload from validated form values, sealing sensitive fields.
    ///
    /// Blank values are treated as absent. [`Field::Name`] is ignored; it
    /// lives on [`CredentialRecord`].
    ///
    /// # Errors
    ///
    /// - [`VaultError::Crypto`] if sealing fails.
    /// - [`VaultError::Database`] if a value does not belong to the type.
    pub fn seal(
        record_type: RecordType,
        values: &FieldValues,
        cipher: &FieldCipher,
    ) -> Result<Self, VaultError> {
        let mut columns = Columns::new();
        apply_values(&mut columns, values, cipher)?;
        Self::from_columns(record_type, columns)
    }

    /// Overlay changed form values. An empty value clears the field.
    ///
    /// # Errors
    ///
    /// Same as [`seal`](Self::seal).
    pub fn apply(&mut self, changes: &FieldValues, cipher: &FieldCipher) -> Result<(), VaultError> {
        let mut columns = self.to_columns()?;
        apply_values(&mut columns, changes, cipher)?;
        *self = Self::from_columns(self.record_type(), columns)?;
        Ok(())
    }

    /// Stored value of `field`, ciphertext for sensitive fields.
    #[must_use]
    pub fn stored(&self, field: Field) -> Option<String> {
        let mut columns = self.to_columns().ok()?;
        match columns.remove(field.column())? {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Sealed value of a sensitive field, if present.
    #[must_use]
    pub fn sealed(&self, field: Field) -> Option<Sealed> {
        if !field.is_sensitive() {
            return None;
        }
        self.stored(field).map(Sealed)
    }

    /// Login shown in lists: username, falling back to e-mail.
    #[must_use]
    pub fn login(&self) -> Option<&str> {
        let (username, email) = match self {
            Self::Web(d) => (d.username.as_deref(), d.email.as_deref()),
            Self::Social(d) => (d.username.as_deref(), d.email.as_deref()),
            Self::Email(d) => (d.username.as_deref(), None),
            Self::Bank(d) => (d.username.as_deref(), None),
            Self::Custom(d) => (d.username.as_deref(), None),
            Self::Offline(_) | Self::Card(_) => (None, None),
        };
        username.filter(|u| !u.is_empty()).or(email)
    }

    fn to_columns(&self) -> Result<Columns, VaultError> {
        let value = match self {
            Self::Web(d) => serde_json::to_value(d),
            Self::Offline(d) => serde_json::to_value(d),
            Self::Social(d) => serde_json::to_value(d),
            Self::Email(d) => serde_json::to_value(d),
            Self::Bank(d) => serde_json::to_value(d),
            Self::Card(d) => serde_json::to_value(d),
            Self::Custom(d) => serde_json::to_value(d),
        }
        .map_err(|e| VaultError::Database(format!("failed to map record fields: {e}")))?;
        let serde_json::Value::Object(mut columns) = value else {
            return Err(VaultError::Database("record fields did not map to columns".into()));
        };
        columns.retain(|_, v| !v.is_null());
        Ok(columns)
    }

    fn from_columns(record_type: RecordType, columns: Columns) -> Result<Self, VaultError> {
        fn parse<T: DeserializeOwned>(columns: Columns) -> Result<T, VaultError> {
            serde_json::from_value(serde_json::Value::Object(columns))
                .map_err(|e| VaultError::Database(format!("failed to map record columns: {e}")))
        }
        Ok(match record_type {
            RecordType::Web => Self::Web(parse(columns)?),
            RecordType::Offline => Self::Offline(parse(columns)?),
            RecordType::Social => Self::Social(parse(columns)?),
            RecordType::Email => Self::Email(parse(columns)?),
            RecordType::Bank => Self::Bank(parse(columns)?),
            RecordType::Card => Self::Card(parse(columns)?),
            RecordType::Custom => Self::Custom(parse(columns)?),
        })
    }
}

fn apply_values(
    columns: &mut Columns,
    values: &FieldValues,
    cipher: &FieldCipher,
) -> Result<(), VaultError> {
    for (field, value) in values.iter() {
        if field == Field::Name {
            continue;
        }
        let value = value.trim();
        if value.is_empty() {
            columns.remove(field.column());
            continue;
        }
        let stored = if field.is_sensitive() {
            cipher.encrypt_field(value)?
        } else {
            value.to_string()
        };
        columns.insert(field.column().to_string(), serde_json::Value::String(stored));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A stored credential record. Sensitive fields are still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Store-assigned ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Favorite flag.
    pub is_favorite: bool,
    /// Creation time (ISO-8601).
    pub created_at: String,
    /// Last field mutation (ISO-8601).
    pub updated_at: String,
    /// Last time a sensitive field was revealed or copied.
    pub last_used_at: Option<String>,
    /// Type-specific payload.
    pub data: RecordData,
}

impl CredentialRecord {
    /// Record type.
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        self.data.record_type()
    }
}

/// Data columns in a fixed order, everything in [`Field::ALL`] but the name.
fn data_fields() -> impl Iterator<Item = Field> {
    Field::ALL.into_iter().filter(|f| *f != Field::Name)
}

fn data_values(data: &RecordData) -> Result<Vec<Value>, VaultError> {
    let mut columns = data.to_columns()?;
    Ok(data_fields()
        .map(|f| match columns.remove(f.column()) {
            Some(serde_json::Value::String(s)) => Value::Text(s),
            _ => Value::Null,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// CRUD operations
// ---------------------------------------------------------------------------

/// Insert a new record and return its ID.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the INSERT fails.
pub fn insert_record(
    conn: &Connection,
    name: &str,
    data: &RecordData,
    now: &str,
) -> Result<i64, VaultError> {
    let columns: Vec<&str> = data_fields().map(Field::column).collect();
    let placeholders = (1..=columns.len().saturating_add(4))
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {RECORD_TABLE} (type, name, created_at, updated_at, {}) VALUES ({placeholders})",
        columns.join(", ")
    );

    let mut values = vec![
        Value::Text(data.record_type().as_db_str().to_string()),
        Value::Text(name.trim().to_string()),
        Value::Text(now.to_string()),
        Value::Text(now.to_string()),
    ];
    values.extend(data_values(data)?);

    conn.execute(&sql, params_from_iter(values))
        .map_err(|e| VaultError::Database(format!("failed to insert record: {e}")))?;
    Ok(conn.last_insert_rowid())
}

/// Rewrite the name and the data columns of an existing record.
///
/// Only columns the record's type accepts are written. Columns outside its
/// layout, such as values an older release stored there, keep their value.
///
/// # Errors
///
/// - [`VaultError::RecordNotFound`] if no record has this ID.
/// - [`VaultError::Database`] if the UPDATE fails.
pub fn update_record(
    conn: &Connection,
    id: i64,
    name: &str,
    data: &RecordData,
    now: &str,
) -> Result<(), VaultError> {
    let record_type = data.record_type();
    let fields: Vec<Field> = data_fields()
        .filter(|f| crate::schema::accepts(record_type, *f))
        .collect();
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!(", {} = ?{}", f.column(), i.saturating_add(4)))
        .collect::<String>();
    let sql = format!(
        "UPDATE {RECORD_TABLE} SET name = ?2, updated_at = ?3{assignments} WHERE id = ?1"
    );

    let mut columns = data.to_columns()?;
    let mut values = vec![
        Value::Integer(id),
        Value::Text(name.trim().to_string()),
        Value::Text(now.to_string()),
    ];
    values.extend(fields.iter().map(|f| match columns.remove(f.column()) {
        Some(serde_json::Value::String(s)) => Value::Text(s),
        _ => Value::Null,
    }));

    let rows = conn
        .execute(&sql, params_from_iter(values))
        .map_err(|e| VaultError::Database(format!("failed to update record: {e}")))?;
    if rows == 0 {
        return Err(VaultError::RecordNotFound(id));
    }
    Ok(())
}

/// Fetch one record.
///
/// # Errors
///
/// - [`VaultError::RecordNotFound`] if no record has this ID.
/// - [`VaultError::Database`] if the query fails or the row is unreadable.
pub fn get_record(conn: &Connection, id: i64) -> Result<CredentialRecord, VaultError> {
    let columns: Vec<&str> = data_fields().map(Field::column).collect();
    let sql = format!(
        "SELECT id, type, name, is_favorite, created_at, updated_at, last_used_at, {} \
         FROM {RECORD_TABLE} WHERE id = ?1",
        columns.join(", ")
    );
    conn.query_row(&sql, params![id], read_record)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => VaultError::RecordNotFound(id),
            other => VaultError::Database(format!("failed to query record: {other}")),
        })?
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<Result<CredentialRecord, VaultError>> {
    let id: i64 = row.get(0)?;
    let type_str: String = row.get(1)?;
    let name: Option<String> = row.get(2)?;
    let is_favorite: Option<i64> = row.get(3)?;
    let created_at: Option<String> = row.get(4)?;
    let updated_at: Option<String> = row.get(5)?;
    let last_used_at: Option<String> = row.get(6)?;

    let Some(record_type) = RecordType::from_db_str(&type_str) else {
        return Ok(Err(VaultError::Database(format!(
            "record {id} has unknown type {type_str:?}"
        ))));
    };

    let mut columns = Columns::new();
    for (i, field) in data_fields().enumerate() {
        let value: Option<String> = row.get(i.saturating_add(7))?;
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            if crate::schema::accepts(record_type, field) {
                columns.insert(field.column().to_string(), serde_json::Value::String(value));
            }
        }
    }

    let created_at = created_at.unwrap_or_default();
    Ok(RecordData::from_columns(record_type, columns).map(|data| CredentialRecord {
        id,
        name: name.unwrap_or_default(),
        is_favorite: is_favorite.unwrap_or(0) != 0,
        updated_at: updated_at.unwrap_or_else(|| created_at.clone()),
        created_at,
        last_used_at,
        data,
    }))
}

/// Record type of `id` without reading the data columns.
///
/// # Errors
///
/// - [`VaultError::RecordNotFound`] if no record has this ID.
/// - [`VaultError::Database`] if the query fails or the type is unknown.
pub fn get_record_type(conn: &Connection, id: i64) -> Result<RecordType, VaultError> {
    let type_str: String = conn
        .query_row(
            &format!("SELECT type FROM {RECORD_TABLE} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => VaultError::RecordNotFound(id),
            other => VaultError::Database(format!("failed to query record type: {other}")),
        })?;
    RecordType::from_db_str(&type_str)
        .ok_or_else(|| VaultError::Database(format!("record {id} has unknown type {type_str:?}")))
}

/// Delete every listed record in one transaction.
///
/// IDs that do not exist are ignored. Returns how many rows were removed.
/// Either all deletes commit or none do.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if any DELETE or the commit fails.
pub fn delete_records(conn: &Connection, ids: &[i64]) -> Result<usize, VaultError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| VaultError::Database(format!("failed to start delete transaction: {e}")))?;
    let mut removed = 0usize;
    {
        let mut stmt = tx
            .prepare(&format!("DELETE FROM {RECORD_TABLE} WHERE id = ?1"))
            .map_err(|e| VaultError::Database(format!("failed to prepare delete: {e}")))?;
        for id in ids {
            let rows = stmt
                .execute(params![id])
                .map_err(|e| VaultError::Database(format!("failed to delete record {id}: {e}")))?;
            removed = removed.saturating_add(rows);
        }
    }
    tx.commit()
        .map_err(|e| VaultError::Database(format!("failed to commit delete: {e}")))?;
    Ok(removed)
}

/// Stamp `last_used_at`.
///
/// # Errors
///
/// - [`VaultError::RecordNotFound`] if no record has this ID.
/// - [`VaultError::Database`] if the UPDATE fails.
pub fn touch_last_used(conn: &Connection, id: i64, now: &str) -> Result<(), VaultError> {
    let rows = conn
        .execute(
            &format!("UPDATE {RECORD_TABLE} SET last_used_at = ?2 WHERE id = ?1"),
            params![id, now],
        )
        .map_err(|e| VaultError::Database(format!("failed to stamp record use: {e}")))?;
    if rows == 0 {
        return Err(VaultError::RecordNotFound(id));
    }
    Ok(())
}

/// Set or clear the favorite flag. Bumps `updated_at`.
///
/// # Errors
///
/// - [`VaultError::RecordNotFound`] if no record has this ID.
/// - [`VaultError::Database`] if the UPDATE fails.
pub fn set_favorite(conn: &Connection, id: i64, favorite: bool, now: &str) -> Result<(), VaultError> {
    let rows = conn
        .execute(
            &format!("UPDATE {RECORD_TABLE} SET is_favorite = ?2, updated_at = ?3 WHERE id = ?1"),
            params![id, i64::from(favorite), now],
        )
        .map_err(|e| VaultError::Database(format!("failed to update favorite: {e}")))?;
    if rows == 0 {
        return Err(VaultError::RecordNotFound(id));
    }
    Ok(())
}
