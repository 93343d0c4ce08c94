//! Query Engine: filter, search and sort record projections.
//!
//! The type filter runs in SQL. Search and ordering run in memory over the
//! projected rows so that every policy has a total, reproducible order: each
//! policy's primary key is followed by its stated secondary key and finally
//! the record ID.

use std::cmp::Ordering;

use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::parse_timestamp;
use crate::db::RECORD_TABLE;
use crate::error::VaultError;
use crate::schema::RecordType;

// ---------------------------------------------------------------------------
// Query inputs
// ---------------------------------------------------------------------------

/// Which record types to include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "type")]
pub enum TypeFilter {
    /// Every type.
    #[default]
    All,
    /// A single type.
    Only(RecordType),
}

impl TypeFilter {
    fn matches(self, record_type: RecordType) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => t == record_type,
        }
    }
}

impl From<RecordType> for TypeFilter {
    fn from(t: RecordType) -> Self {
        Self::Only(t)
    }
}

/// The ten supported list orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortPolicy {
    /// Most recently modified first.
    #[default]
    UpdatedDesc,
    /// Least recently modified first.
    UpdatedAsc,
    /// Name A→Z.
    NameAsc,
    /// Name Z→A.
    NameDesc,
    /// Login A→Z, then name.
    LoginAsc,
    /// Login Z→A, then name.
    LoginDesc,
    /// Most recently used first; never-used last.
    LastUsedDesc,
    /// Never-used first, then least recently used.
    LastUsedAsc,
    /// Favorites first, then name A→Z.
    FavoritesFirst,
    /// Favorites last, then name A→Z.
    FavoritesLast,
}

impl SortPolicy {
    /// Every policy, in menu order.
    pub const ALL: [Self; 10] = [
        Self::UpdatedDesc,
        Self::UpdatedAsc,
        Self::NameAsc,
        Self::NameDesc,
        Self::LoginAsc,
        Self::LoginDesc,
        Self::LastUsedDesc,
        Self::LastUsedAsc,
        Self::FavoritesFirst,
        Self::FavoritesLast,
    ];
}

/// One list request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    /// Type filter.
    #[serde(default)]
    pub type_filter: TypeFilter,
    /// Case-insensitive substring matched against name and login.
    /// Empty disables search.
    #[serde(default)]
    pub search: String,
    /// Ordering.
    #[serde(default)]
    pub sort: SortPolicy,
}

impl RecordQuery {
    /// Query with the given parts.
    #[must_use]
    pub fn new(type_filter: impl Into<TypeFilter>, search: impl Into<String>, sort: SortPolicy) -> Self {
        Self {
            type_filter: type_filter.into(),
            search: search.into(),
            sort,
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Display-ready view of a record. Never carries sensitive fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    /// Record ID.
    pub id: i64,
    /// Record type.
    pub record_type: RecordType,
    /// Display name.
    pub name: String,
    /// Username, falling back to e-mail.
    pub login: Option<String>,
    /// Category, if set.
    pub category: Option<String>,
    /// Creation time.
    pub created_at: String,
    /// Last modification time.
    pub updated_at: String,
    /// Last reveal or copy.
    pub last_used_at: Option<String>,
    /// Favorite flag.
    pub is_favorite: bool,
}

/// Return the records matching `query`, ordered by its policy.
///
/// Rows with an unknown type string are skipped with a warning.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_records(conn: &Connection, query: &RecordQuery) -> Result<Vec<RecordSummary>, VaultError> {
    let mut rows = load_rows(conn, query.type_filter)?;

    // Only the empty string disables search; whitespace is matched literally.
    if !query.search.is_empty() {
        let needle = query.search.to_lowercase();
        rows.retain(|r| matches_search(&r.summary.name, r.username.as_deref(), &needle));
    }

    let mut summaries: Vec<RecordSummary> = rows.into_iter().map(|r| r.summary).collect();
    summaries.sort_by(|a, b| compare(query.sort, a, b));
    Ok(summaries)
}

/// A projection plus the raw username, which search matches against.
struct ListedRow {
    summary: RecordSummary,
    username: Option<String>,
}

fn load_rows(conn: &Connection, filter: TypeFilter) -> Result<Vec<ListedRow>, VaultError> {
    let mut sql = format!(
        "SELECT id, type, name, username, email, category, created_at, updated_at, \
         last_used_at, is_favorite FROM {RECORD_TABLE}"
    );
    let mut args: Vec<&str> = Vec::new();
    if let TypeFilter::Only(t) = filter {
        sql.push_str(" WHERE type = ?1");
        args.push(t.as_db_str());
    }

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| VaultError::Database(format!("failed to prepare list query: {e}")))?;
    let rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, Option<i64>>(9)?,
            ))
        })
        .map_err(|e| VaultError::Database(format!("failed to execute list query: {e}")))?;

    let mut listed = Vec::new();
    for row in rows {
        let row = row.map_err(|e| VaultError::Database(format!("row read error: {e}")))?;
        let Some(record_type) = RecordType::from_db_str(&row.1) else {
            warn!(id = row.0, "skipping record with unknown type");
            continue;
        };
        if !filter.matches(record_type) {
            continue;
        }
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
        let created_at = row.6.unwrap_or_default();
        let username = non_empty(row.3);
        listed.push(ListedRow {
            summary: RecordSummary {
                id: row.0,
                record_type,
                name: row.2.unwrap_or_default(),
                login: username.clone().or_else(|| non_empty(row.4)),
                category: non_empty(row.5),
                updated_at: row.7.unwrap_or_else(|| created_at.clone()),
                created_at,
                last_used_at: non_empty(row.8),
                is_favorite: row.9.unwrap_or(0) != 0,
            },
            username,
        });
    }
    Ok(listed)
}

/// Lowercased substring match on name or username. E-mail is not searched.
fn matches_search(name: &str, username: Option<&str>, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
        || username.is_some_and(|u| u.to_lowercase().contains(needle))
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Timestamp sort key: parsed instant when readable, else the raw text.
fn instant(ts: &str) -> (u64, &str) {
    (parse_timestamp(ts).unwrap_or(0), ts)
}

fn compare(policy: SortPolicy, a: &RecordSummary, b: &RecordSummary) -> Ordering {
    let by_name = || a.name.cmp(&b.name);
    let login = |r: &RecordSummary| r.login.clone().unwrap_or_default();
    let last_used = |r: &RecordSummary| r.last_used_at.as_deref().map(parse_or_zero);

    let primary = match policy {
        SortPolicy::UpdatedDesc => instant(&b.updated_at).cmp(&instant(&a.updated_at)),
        SortPolicy::UpdatedAsc => instant(&a.updated_at).cmp(&instant(&b.updated_at)),
        SortPolicy::NameAsc => by_name(),
        SortPolicy::NameDesc => b.name.cmp(&a.name),
        SortPolicy::LoginAsc => login(a).cmp(&login(b)).then_with(by_name),
        SortPolicy::LoginDesc => login(b).cmp(&login(a)).then_with(by_name),
        // `None < Some`, so never-used records trail the descending order
        // and lead the ascending one.
        SortPolicy::LastUsedDesc => last_used(b).cmp(&last_used(a)).then_with(by_name),
        SortPolicy::LastUsedAsc => last_used(a).cmp(&last_used(b)).then_with(by_name),
        SortPolicy::FavoritesFirst => b.is_favorite.cmp(&a.is_favorite).then_with(by_name),
        SortPolicy::FavoritesLast => a.is_favorite.cmp(&b.is_favorite).then_with(by_name),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

fn parse_or_zero(ts: &str) -> u64 {
    parse_timestamp(ts).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Collection summary for a status line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
    /// Number of records.
    pub total: u64,
    /// Newest modification time across all records.
    pub last_modified: Option<String>,
}

/// Count records and find the newest modification.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn stats(conn: &Connection) -> Result<VaultStats, VaultError> {
    conn.query_row(
        &format!("SELECT COUNT(*), MAX(COALESCE(updated_at, created_at)) FROM {RECORD_TABLE}"),
        [],
        |row| {
            Ok(VaultStats {
                total: row.get::<_, i64>(0).map(|n| u64::try_from(n).unwrap_or(0))?,
                last_modified: row.get(1)?,
            })
        },
    )
    .map_err(|e| VaultError::Database(format!("failed to compute stats: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: i64, name: &str, login: Option<&str>, fav: bool, used: Option<&str>) -> RecordSummary {
        RecordSummary {
            id,
            record_type: RecordType::Web,
            name: name.into(),
            login: login.map(Into::into),
            category: None,
            created_at: "2024-01-01T00:00:00.000Z".into(),
            updated_at: format!("2024-01-0{id}T00:00:00.000Z"),
            last_used_at: used.map(Into::into),
            is_favorite: fav,
        }
    }

    fn order(policy: SortPolicy, rows: &[RecordSummary]) -> Vec<i64> {
        let mut rows = rows.to_vec();
        rows.sort_by(|a, b| compare(policy, a, b));
        rows.iter().map(|r| r.id).collect()
    }

    fn sample() -> Vec<RecordSummary> {
        vec![
            summary(1, "beta", Some("zed"), false, None),
            summary(2, "alpha", None, true, Some("2024-03-01T00:00:00.000Z")),
            summary(3, "gamma", Some("amy"), true, Some("2024-02-01T00:00:00.000Z")),
            summary(4, "alpha", Some("bob"), false, None),
        ]
    }

    #[test]
    fn updated_orders() {
        assert_eq!(order(SortPolicy::UpdatedDesc, &sample()), [4, 3, 2, 1]);
        assert_eq!(order(SortPolicy::UpdatedAsc, &sample()), [1, 2, 3, 4]);
    }

    #[test]
    fn name_orders_break_ties_by_id() {
        assert_eq!(order(SortPolicy::NameAsc, &sample()), [2, 4, 1, 3]);
        assert_eq!(order(SortPolicy::NameDesc, &sample()), [3, 1, 2, 4]);
    }

    #[test]
    fn login_orders_put_missing_login_first_ascending() {
        assert_eq!(order(SortPolicy::LoginAsc, &sample()), [2, 3, 4, 1]);
        assert_eq!(order(SortPolicy::LoginDesc, &sample()), [1, 4, 3, 2]);
    }

    #[test]
    fn last_used_orders() {
        assert_eq!(order(SortPolicy::LastUsedDesc, &sample()), [2, 3, 4, 1]);
        assert_eq!(order(SortPolicy::LastUsedAsc, &sample()), [4, 1, 3, 2]);
    }

    #[test]
    fn favorite_orders_then_name() {
        assert_eq!(order(SortPolicy::FavoritesFirst, &sample()), [2, 3, 4, 1]);
        assert_eq!(order(SortPolicy::FavoritesLast, &sample()), [4, 1, 2, 3]);
    }

    #[test]
    fn search_is_case_insensitive_on_name_and_username() {
        assert!(matches_search("beta", Some("zed"), "bet"));
        assert!(matches_search("beta", Some("zed"), "ze"));
        assert!(!matches_search("alpha", None, "bob"));
        assert!(matches_search("GitHub", Some("Alice"), &"HUB".to_lowercase()));
        assert!(matches_search("GitHub", Some("Alice"), "alice"));
    }

    #[test]
    fn search_needle_keeps_its_whitespace() {
        assert!(matches_search("a x", None, " x"));
        assert!(!matches_search("xa", None, " x"));
        assert!(!matches_search("xa", Some("bob"), "   "));
    }

    fn store_with(rows: &[(&str, Option<&str>, Option<&str>)]) -> crate::db::VaultStore {
        let store = crate::db::VaultStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        for (name, username, email) in rows {
            store
                .connection()
                .execute(
                    &format!(
                        "INSERT INTO {RECORD_TABLE} (created_at, updated_at, name, username, email) \
                         VALUES ('2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z', ?1, ?2, ?3)"
                    ),
                    rusqlite::params![name, username, email],
                )
                .unwrap();
        }
        store
    }

    fn search_ids(store: &crate::db::VaultStore, search: &str) -> Vec<i64> {
        let query = RecordQuery::new(TypeFilter::All, search, SortPolicy::NameAsc);
        let mut ids: Vec<i64> = list_records(store.connection(), &query)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn list_search_matches_untrimmed_needle() {
        let store = store_with(&[("a x", None, None), ("xa", None, None)]);
        assert_eq!(search_ids(&store, " x"), [1]);
        assert!(search_ids(&store, "   ").is_empty());
        assert_eq!(search_ids(&store, ""), [1, 2]);
    }

    #[test]
    fn list_search_ignores_email() {
        let store = store_with(&[
            ("Forum", None, Some("bob@example.com")),
            ("Mail", Some("Bob"), None),
        ]);
        assert_eq!(search_ids(&store, "bob"), [2]);
        let all = list_records(store.connection(), &RecordQuery::default()).unwrap();
        let forum = all.iter().find(|r| r.id == 1).unwrap();
        assert_eq!(forum.login.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn legacy_timestamps_sort_by_instant() {
        let mut a = summary(1, "a", None, false, None);
        let mut b = summary(2, "b", None, false, None);
        a.updated_at = "2024-01-01 12:00:00".into();
        b.updated_at = "2024-01-01T11:00:00.000Z".into();
        assert_eq!(order(SortPolicy::UpdatedDesc, &[a, b]), [1, 2]);
    }

    #[test]
    fn sort_policy_serde_names() {
        let json = serde_json::to_string(&SortPolicy::FavoritesFirst).unwrap();
        assert_eq!(json, "\"favorites-first\"");
        let back: SortPolicy = serde_json::from_str("\"last-used-asc\"").unwrap();
        assert_eq!(back, SortPolicy::LastUsedAsc);
    }
}
