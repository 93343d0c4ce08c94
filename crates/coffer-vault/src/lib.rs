//! `coffer-vault`: the credential vault core for COFFER.
//!
//! Typed records over a self-upgrading `SQLite` table, field-level
//! encryption of sensitive values, the master-password session guard and
//! the list query engine. [`Vault`] ties them together for a host UI.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod clock;
pub mod db;
pub mod error;
pub mod keyfile;
pub mod settings;

pub mod schema;

pub mod records;

pub mod query;

pub mod auth;
pub mod scheduler;
pub mod session;

pub mod health;

pub mod preferences;

pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coffer_crypto_core::{CharsetConfig, DecryptionFailure};
pub use db::{MigrationReport, VaultStore};
pub use error::VaultError;
pub use health::{
    evaluate_password_strength, is_weak_password, HealthReport, PasswordStrength, StaleRecord,
    WeakRecord,
};
pub use preferences::{Preferences, VaultPaths};
pub use query::{RecordQuery, RecordSummary, SortPolicy, TypeFilter, VaultStats};
pub use records::{
    BankAccount, CredentialRecord, CustomSecret, EmailAccount, OfflineCode, PaymentCard,
    RecordData, Sealed, SocialAccount, WebLogin,
};
pub use scheduler::{InactivityPoll, PollOutcome};
pub use schema::{
    fields_for, groups_for, validate, CustomLayout, Field, FieldDescriptor, FieldIssue,
    FieldValues, RecordType, Requirement, Validator,
};
pub use session::{SessionState, VaultSession};
pub use vault::Vault;
