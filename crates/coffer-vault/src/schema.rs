//! Schema Registry: record types, field layouts and validation.
//!
//! Each [`RecordType`] maps to an ordered list of field groups (form rows).
//! Every descriptor names the stored [`Field`], its label, a
//! [`Requirement`] level and the [`Validator`] applied on save. The
//! registry is pure data: nothing here touches storage or keys.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Closed set of record kinds. Immutable once a record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    /// Website or online service login.
    Web,
    /// Offline code or free-form secret text.
    Offline,
    /// Social network account.
    Social,
    /// Mailbox account.
    Email,
    /// Bank account.
    Bank,
    /// Payment card.
    Card,
    /// User-defined record with generic custom fields.
    Custom,
}

impl RecordType {
    /// Every record type, in display order.
    pub const ALL: [Self; 7] = [
        Self::Web,
        Self::Offline,
        Self::Social,
        Self::Email,
        Self::Bank,
        Self::Card,
        Self::Custom,
    ];

    /// Value stored in the `type` column.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Web => "WEB",
            Self::Offline => "OFFLINE",
            Self::Social => "SOCIAL",
            Self::Email => "EMAIL",
            Self::Bank => "BANK",
            Self::Card => "CARD",
            Self::Custom => "CUSTOM",
        }
    }

    /// Parse the `type` column.
    #[must_use]
    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_db_str() == s)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Maximum number of generic custom fields on a CUSTOM record.
pub const MAX_CUSTOM_FIELDS: usize = 10;

/// Custom fields a fresh CUSTOM record starts with.
pub const DEFAULT_CUSTOM_FIELDS: usize = 2;

/// Every named value a record row can hold, besides the bookkeeping
/// columns (`id`, `type`, timestamps, `is_favorite`).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Username,
    Password,
    Url,
    Email,
    Phone,
    Category,
    Tags,
    Notes,
    SecurityQuestion,
    SecurityAnswer,
    RecoveryEmail,
    RecoveryPhone,
    FullName,
    DateOfBirth,
    Address,
    PassportNumber,
    IdentificationNumber,
    AccountNumber,
    BankName,
    CardNumber,
    CardCvv,
    CardExpire,
    CardHolder,
    CardPin,
    CardType,
    BankBik,
    AccountType,
    Currency,
    LimitAmount,
    CardholderPhone,
    CardholderFullName,
    CustomField1,
    CustomField2,
    CustomField3,
    CustomField4,
    CustomField5,
    CustomField6,
    CustomField7,
    CustomField8,
    CustomField9,
    CustomField10,
}

impl Field {
    /// The full field superset, in column order.
    pub const ALL: [Self; 42] = [
        Self::Name,
        Self::Username,
        Self::Password,
        Self::Url,
        Self::Email,
        Self::Phone,
        Self::Category,
        Self::Tags,
        Self::Notes,
        Self::SecurityQuestion,
        Self::SecurityAnswer,
        Self::RecoveryEmail,
        Self::RecoveryPhone,
        Self::FullName,
        Self::DateOfBirth,
        Self::Address,
        Self::PassportNumber,
        Self::IdentificationNumber,
        Self::AccountNumber,
        Self::BankName,
        Self::CardNumber,
        Self::CardCvv,
        Self::CardExpire,
        Self::CardHolder,
        Self::CardPin,
        Self::CardType,
        Self::BankBik,
        Self::AccountType,
        Self::Currency,
        Self::LimitAmount,
        Self::CardholderPhone,
        Self::CardholderFullName,
        Self::CustomField1,
        Self::CustomField2,
        Self::CustomField3,
        Self::CustomField4,
        Self::CustomField5,
        Self::CustomField6,
        Self::CustomField7,
        Self::CustomField8,
        Self::CustomField9,
        Self::CustomField10,
    ];

    /// Generic custom fields, `custom_field_1` first.
    pub const CUSTOM: [Self; MAX_CUSTOM_FIELDS] = [
        Self::CustomField1,
        Self::CustomField2,
        Self::CustomField3,
        Self::CustomField4,
        Self::CustomField5,
        Self::CustomField6,
        Self::CustomField7,
        Self::CustomField8,
        Self::CustomField9,
        Self::CustomField10,
    ];

    /// Fields that are always stored as ciphertext.
    pub const SENSITIVE: [Self; 7] = [
        Self::Password,
        Self::CardNumber,
        Self::CardCvv,
        Self::CardPin,
        Self::SecurityAnswer,
        Self::AccountNumber,
        Self::PassportNumber,
    ];

    /// Column name in the record table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Username => "username",
            Self::Password => "password",
            Self::Url => "url",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Category => "category",
            Self::Tags => "tags",
            Self::Notes => "notes",
            Self::SecurityQuestion => "security_question",
            Self::SecurityAnswer => "security_answer",
            Self::RecoveryEmail => "recovery_email",
            Self::RecoveryPhone => "recovery_phone",
            Self::FullName => "full_name",
            Self::DateOfBirth => "date_of_birth",
            Self::Address => "address",
            Self::PassportNumber => "passport_number",
            Self::IdentificationNumber => "identification_number",
            Self::AccountNumber => "account_number",
            Self::BankName => "bank_name",
            Self::CardNumber => "card_number",
            Self::CardCvv => "card_cvv",
            Self::CardExpire => "card_expire",
            Self::CardHolder => "card_holder",
            Self::CardPin => "card_pin",
            Self::CardType => "card_type",
            Self::BankBik => "bank_bik",
            Self::AccountType => "account_type",
            Self::Currency => "currency",
            Self::LimitAmount => "limit_amount",
            Self::CardholderPhone => "cardholder_phone",
            Self::CardholderFullName => "cardholder_full_name",
            Self::CustomField1 => "custom_field_1",
            Self::CustomField2 => "custom_field_2",
            Self::CustomField3 => "custom_field_3",
            Self::CustomField4 => "custom_field_4",
            Self::CustomField5 => "custom_field_5",
            Self::CustomField6 => "custom_field_6",
            Self::CustomField7 => "custom_field_7",
            Self::CustomField8 => "custom_field_8",
            Self::CustomField9 => "custom_field_9",
            Self::CustomField10 => "custom_field_10",
        }
    }

    /// Look a field up by its column name.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }

    /// Whether values of this field are stored encrypted.
    #[must_use]
    pub fn is_sensitive(self) -> bool {
        Self::SENSITIVE.contains(&self)
    }

    /// The `n`-th generic custom field (1-based), if `n` is within the cap.
    #[must_use]
    pub fn custom(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::CUSTOM.get(i).copied())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// How strongly the form asks for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requirement {
    /// Shown first and highlighted; the record is incomplete without it.
    Critical,
    /// Recommended.
    Important,
    /// Nice to have.
    Optional,
}

/// Format check applied to a non-empty value on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Free text, no check.
    Text,
    /// Record name; must be non-empty.
    Name,
    /// E-mail address grammar.
    Email,
    /// At least 10 digits once non-digits are stripped.
    Phone,
    /// `DD.MM.YYYY` calendar date.
    Date,
    /// Bank identification code: exactly 9 digits.
    Bik,
    /// Bank account number: exactly 20 digits.
    AccountNumber,
    /// Card number: at least 13 digits.
    CardNumber,
    /// Card security code: at least 3 digits.
    Cvv,
    /// Card expiry: contains a `/` separator.
    Expiry,
}

/// One field slot in a record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Stored field.
    pub field: Field,
    /// Human-readable label.
    pub label: &'static str,
    /// Requirement level.
    pub requirement: Requirement,
    /// Save-time validator.
    pub validator: Validator,
    /// Whether an empty value blocks the save.
    pub mandatory: bool,
}

impl FieldDescriptor {
    const fn new(
        field: Field,
        label: &'static str,
        requirement: Requirement,
        validator: Validator,
    ) -> Self {
        Self {
            field,
            label,
            requirement,
            validator,
            mandatory: false,
        }
    }

    const fn required(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

const fn critical(field: Field, label: &'static str, validator: Validator) -> FieldDescriptor {
    FieldDescriptor::new(field, label, Requirement::Critical, validator)
}

const fn important(field: Field, label: &'static str, validator: Validator) -> FieldDescriptor {
    FieldDescriptor::new(field, label, Requirement::Important, validator)
}

const fn optional(field: Field, label: &'static str, validator: Validator) -> FieldDescriptor {
    FieldDescriptor::new(field, label, Requirement::Optional, validator)
}

const fn name(label: &'static str) -> FieldDescriptor {
    critical(Field::Name, label, Validator::Name).required()
}

const NOTES: FieldDescriptor = optional(Field::Notes, "Notes", Validator::Text);

// ---------------------------------------------------------------------------
// Static layouts
// ---------------------------------------------------------------------------

use Field as F;
use Validator as V;

const WEB_LAYOUT: &[&[FieldDescriptor]] = &[
    &[name("Site name")],
    &[
        critical(F::Username, "Login", V::Text),
        critical(F::Password, "Password", V::Text),
    ],
    &[
        important(F::Url, "Web address", V::Text),
        important(F::Email, "Account e-mail", V::Email),
    ],
    &[
        optional(F::Phone, "Phone", V::Phone),
        optional(F::Category, "Category", V::Text),
    ],
    &[
        optional(F::SecurityQuestion, "Security question", V::Text),
        optional(F::SecurityAnswer, "Answer", V::Text),
    ],
    &[
        optional(F::RecoveryEmail, "Recovery e-mail", V::Email),
        optional(F::RecoveryPhone, "Recovery phone", V::Phone),
    ],
    &[NOTES],
];

const OFFLINE_LAYOUT: &[&[FieldDescriptor]] = &[
    &[name("Code name")],
    &[critical(F::Password, "Code / text", V::Text)],
    &[
        optional(F::Tags, "Tags", V::Text),
        optional(F::Category, "Category", V::Text),
    ],
    &[NOTES],
];

const SOCIAL_LAYOUT: &[&[FieldDescriptor]] = &[
    &[name("Network")],
    &[
        critical(F::Username, "Nickname", V::Text),
        critical(F::Password, "Password", V::Text),
    ],
    &[
        important(F::Email, "Account e-mail", V::Email),
        important(F::Url, "Profile link", V::Text),
    ],
    &[
        optional(F::Phone, "Phone", V::Phone),
        optional(F::FullName, "Full name", V::Text),
    ],
    &[
        optional(F::RecoveryEmail, "Recovery e-mail", V::Email),
        optional(F::RecoveryPhone, "Recovery phone", V::Phone),
    ],
    &[NOTES],
];

const EMAIL_LAYOUT: &[&[FieldDescriptor]] = &[
    &[name("Mailbox name")],
    &[
        critical(F::Username, "E-mail address", V::Email),
        critical(F::Password, "Password", V::Text),
    ],
    &[
        important(F::Phone, "Phone", V::Phone),
        important(F::FullName, "Owner name", V::Text),
    ],
    &[
        optional(F::DateOfBirth, "Date of birth", V::Date),
        optional(F::RecoveryEmail, "Recovery e-mail", V::Email),
    ],
    &[
        optional(F::SecurityQuestion, "Security question", V::Text),
        optional(F::SecurityAnswer, "Answer", V::Text),
    ],
    &[NOTES],
];

const BANK_LAYOUT: &[&[FieldDescriptor]] = &[
    &[name("Account name")],
    &[
        critical(F::Username, "Login / contract", V::Text),
        critical(F::Password, "Password", V::Text),
    ],
    &[
        critical(F::AccountNumber, "Account number (20)", V::AccountNumber),
        important(F::BankName, "Bank", V::Text),
    ],
    &[
        important(F::CardNumber, "Linked card", V::CardNumber),
        important(F::Phone, "Phone", V::Phone),
    ],
    &[
        optional(F::BankBik, "BIK (9)", V::Bik),
        optional(F::Currency, "Currency", V::Text),
    ],
    &[
        optional(F::AccountType, "Account type", V::Text),
        optional(F::FullName, "Owner name", V::Text),
    ],
    &[
        optional(F::DateOfBirth, "Date of birth", V::Date),
        optional(F::IdentificationNumber, "Tax / ID number", V::Text),
    ],
    &[optional(F::Address, "Address", V::Text)],
    &[NOTES],
];

const CARD_LAYOUT: &[&[FieldDescriptor]] = &[
    &[name("Card name")],
    &[critical(F::CardNumber, "Card number", V::CardNumber).required()],
    &[
        critical(F::CardCvv, "CVV/CVC", V::Cvv).required(),
        critical(F::CardExpire, "Expires (MM/YY)", V::Expiry).required(),
    ],
    &[
        important(F::CardHolder, "Holder", V::Text),
        important(F::BankName, "Bank", V::Text),
    ],
    &[
        optional(F::CardPin, "PIN", V::Text),
        optional(F::CardType, "Type", V::Text),
    ],
    &[
        optional(F::CardholderPhone, "Phone", V::Phone),
        optional(F::LimitAmount, "Limit", V::Text),
    ],
    &[
        optional(F::CardholderFullName, "Holder full name", V::Text),
        optional(F::PassportNumber, "Passport", V::Text),
    ],
    &[optional(F::Currency, "Currency", V::Text)],
    &[NOTES],
];

const CUSTOM_HEAD: &[&[FieldDescriptor]] = &[
    &[name("Name")],
    &[
        critical(F::Username, "Field 1 (login)", V::Text),
        critical(F::Password, "Field 2 (secret)", V::Text),
    ],
];

const CUSTOM_LABELS: [&str; MAX_CUSTOM_FIELDS] = [
    "Custom 1", "Custom 2", "Custom 3", "Custom 4", "Custom 5", "Custom 6", "Custom 7",
    "Custom 8", "Custom 9", "Custom 10",
];

// ---------------------------------------------------------------------------
// Layout lookup
// ---------------------------------------------------------------------------

/// Field layout for a CUSTOM record: the fixed head plus a growing number
/// of generic custom fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomLayout {
    extra_fields: usize,
}

impl Default for CustomLayout {
    fn default() -> Self {
        Self {
            extra_fields: DEFAULT_CUSTOM_FIELDS,
        }
    }
}

impl CustomLayout {
    /// Layout showing `count` custom fields, clamped to
    /// [`DEFAULT_CUSTOM_FIELDS`]..=[`MAX_CUSTOM_FIELDS`].
    #[must_use]
    pub fn with_fields(count: usize) -> Self {
        Self {
            extra_fields: count.clamp(DEFAULT_CUSTOM_FIELDS, MAX_CUSTOM_FIELDS),
        }
    }

    /// Layout wide enough to show every populated custom field in `values`.
    #[must_use]
    pub fn fitting(values: &FieldValues) -> Self {
        let highest = Field::CUSTOM
            .iter()
            .rposition(|f| values.get(*f).is_some_and(|v| !v.trim().is_empty()))
            .map_or(0, |i| i.saturating_add(1));
        Self::with_fields(highest)
    }

    /// Number of custom fields shown.
    #[must_use]
    pub const fn field_count(&self) -> usize {
        self.extra_fields
    }

    /// Reveal one more custom field. Returns `false` (and changes nothing)
    /// once [`MAX_CUSTOM_FIELDS`] are shown.
    pub fn add_field(&mut self) -> bool {
        if self.extra_fields >= MAX_CUSTOM_FIELDS {
            return false;
        }
        self.extra_fields = self.extra_fields.saturating_add(1);
        true
    }

    /// Form rows: head, custom fields two per row, then notes.
    #[must_use]
    pub fn groups(&self) -> Vec<Vec<FieldDescriptor>> {
        let mut groups: Vec<Vec<FieldDescriptor>> =
            CUSTOM_HEAD.iter().map(|row| row.to_vec()).collect();
        let customs: Vec<FieldDescriptor> = Field::CUSTOM
            .iter()
            .zip(CUSTOM_LABELS)
            .take(self.extra_fields)
            .map(|(field, label)| optional(*field, label, V::Text))
            .collect();
        groups.extend(customs.chunks(2).map(<[FieldDescriptor]>::to_vec));
        groups.push(vec![NOTES]);
        groups
    }
}

/// Ordered form rows for `record_type`. CUSTOM uses the default width;
/// see [`CustomLayout`] to grow it.
#[must_use]
pub fn groups_for(record_type: RecordType) -> Vec<Vec<FieldDescriptor>> {
    let rows = match record_type {
        RecordType::Web => WEB_LAYOUT,
        RecordType::Offline => OFFLINE_LAYOUT,
        RecordType::Social => SOCIAL_LAYOUT,
        RecordType::Email => EMAIL_LAYOUT,
        RecordType::Bank => BANK_LAYOUT,
        RecordType::Card => CARD_LAYOUT,
        RecordType::Custom => return CustomLayout::default().groups(),
    };
    rows.iter().map(|row| row.to_vec()).collect()
}

/// Flattened, ordered field descriptors for `record_type`.
#[must_use]
pub fn fields_for(record_type: RecordType) -> Vec<FieldDescriptor> {
    groups_for(record_type).into_iter().flatten().collect()
}

/// Every field a record of this type may hold. For CUSTOM this includes
/// all ten generic fields regardless of how many a form currently shows.
fn accepted_fields(record_type: RecordType) -> Vec<FieldDescriptor> {
    match record_type {
        RecordType::Custom => CustomLayout::with_fields(MAX_CUSTOM_FIELDS)
            .groups()
            .into_iter()
            .flatten()
            .collect(),
        other => fields_for(other),
    }
}

/// Whether `field` is meaningful for `record_type`.
#[must_use]
pub fn accepts(record_type: RecordType, field: Field) -> bool {
    accepted_fields(record_type)
        .iter()
        .any(|d| d.field == field)
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// Plaintext form values keyed by field.
///
/// Values are wiped from memory when the map is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues(BTreeMap<Field, String>);

impl FieldValues {
    /// Empty value set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Insert or replace a value.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        if let Some(mut old) = self.0.insert(field, value.into()) {
            old.zeroize();
        }
    }

    /// Value for `field`, if present.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether no values are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in field order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(Field, S)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (Field, S)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (field, value) in iter {
            values.set(field, value);
        }
        values
    }
}

impl Drop for FieldValues {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// One validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Offending field.
    pub field: Field,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldIssue {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").ok());

/// Validate a complete set of values for a new record.
///
/// Returns every problem found; an empty list means the values may be saved.
#[must_use]
pub fn validate(record_type: RecordType, values: &FieldValues) -> Vec<FieldIssue> {
    check(record_type, values, false)
}

/// Validate only the values being changed on an existing record.
///
/// Fields absent from `values` keep their stored value and are not checked.
#[must_use]
pub fn validate_changes(record_type: RecordType, values: &FieldValues) -> Vec<FieldIssue> {
    check(record_type, values, true)
}

fn check(record_type: RecordType, values: &FieldValues, partial: bool) -> Vec<FieldIssue> {
    let accepted = accepted_fields(record_type);
    let mut issues = Vec::new();

    for (field, _) in values.iter() {
        if !accepted.iter().any(|d| d.field == field) {
            issues.push(FieldIssue::new(
                field,
                format!("{field} is not used by {record_type} records"),
            ));
        }
    }

    for descriptor in &accepted {
        let value = values.get(descriptor.field).map(str::trim);
        match value {
            None | Some("") => {
                let must_check = !partial || value.is_some();
                if descriptor.mandatory && must_check {
                    issues.push(FieldIssue::new(
                        descriptor.field,
                        format!("{} is required", descriptor.field),
                    ));
                }
            }
            Some(text) => {
                if let Some(message) = check_format(descriptor.field, descriptor.validator, text) {
                    issues.push(FieldIssue::new(descriptor.field, message));
                }
            }
        }
    }

    issues
}

fn check_format(field: Field, validator: Validator, value: &str) -> Option<String> {
    let ok = match validator {
        V::Text | V::Name => true,
        V::Email => EMAIL_PATTERN
            .as_ref()
            .is_some_and(|re| re.is_match(value)),
        V::Phone => value.chars().filter(char::is_ascii_digit).count() >= 10,
        V::Date => is_valid_date(value),
        V::Bik => is_digits(value) && value.len() == 9,
        V::AccountNumber => is_digits(value) && value.len() == 20,
        V::CardNumber => {
            let compact: String = value
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '-')
                .collect();
            is_digits(&compact) && compact.len() >= 13
        }
        V::Cvv => is_digits(value) && value.len() >= 3,
        V::Expiry => value.contains('/'),
    };
    if ok {
        return None;
    }
    let message = match validator {
        V::Email => format!("{field} is not a valid e-mail address"),
        V::Phone => format!("{field} must contain at least 10 digits"),
        V::Date => format!("{field} must be a valid date in DD.MM.YYYY format"),
        V::Bik => format!("{field} must be exactly 9 digits"),
        V::AccountNumber => format!("{field} must be exactly 20 digits"),
        V::CardNumber => format!("{field} must contain at least 13 digits"),
        V::Cvv => format!("{field} must be at least 3 digits"),
        V::Expiry => format!("{field} must look like MM/YY"),
        V::Text | V::Name => return None,
    };
    Some(message)
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// `D.M.YYYY` up to `DD.MM.YYYY`, with a real calendar day.
fn is_valid_date(value: &str) -> bool {
    let mut parts = value.split('.');
    let (Some(d), Some(m), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    // Day and month take one or two digits, the year exactly four.
    let short = |part: &str| (1..=2).contains(&part.len()) && is_digits(part);
    if !short(d) || !short(m) || y.len() != 4 || !is_digits(y) {
        return false;
    }
    let (Ok(day), Ok(month), Ok(year)) = (d.parse::<u64>(), m.parse::<u64>(), y.parse::<u64>())
    else {
        return false;
    };
    year >= 1 && day >= 1 && day <= crate::clock::days_in_month(year, month)
}
