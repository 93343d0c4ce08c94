#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for list filtering, search and ordering.

use std::collections::BTreeSet;

use coffer_crypto_core::{FieldCipher, SecretBytes, KEY_LEN};
use coffer_vault::clock::{format_iso8601, parse_timestamp};
use coffer_vault::query::list_records;
use coffer_vault::records::{insert_record, set_favorite};
use coffer_vault::{
    Field, FieldValues, RecordData, RecordQuery, RecordType, SortPolicy, TypeFilter, VaultStore,
};
use proptest::prelude::*;

const BASE_MS: u64 = 1_700_000_000_000;

/// (type, name, username, email, favorite, age offset in seconds)
type Row = (RecordType, String, String, String, bool, u32);

fn any_row() -> impl Strategy<Value = Row> {
    (
        prop::sample::select(vec![RecordType::Web, RecordType::Offline, RecordType::Card]),
        "[A-Za-z ]{1,8}",
        "[a-z ]{0,6}",
        "[a-z]{0,6}",
        any::<bool>(),
        0u32..100_000,
    )
}

fn populated(rows: &[Row]) -> VaultStore {
    let store = VaultStore::open_in_memory().unwrap();
    store.init_schema().unwrap();
    let cipher = FieldCipher::new(&SecretBytes::new([7u8; KEY_LEN])).unwrap();
    let conn = store.connection();
    for (record_type, name, username, email, favorite, offset) in rows {
        let mut values = FieldValues::new().with(Field::Name, name.as_str());
        if *record_type == RecordType::Web {
            values.set(Field::Username, username.as_str());
            values.set(Field::Email, email.as_str());
        }
        let data = RecordData::seal(*record_type, &values, &cipher).unwrap();
        let now = format_iso8601(BASE_MS + u64::from(*offset) * 1000);
        let id = insert_record(conn, name, &data, &now).unwrap();
        if *favorite {
            set_favorite(conn, id, true, &now).unwrap();
        }
    }
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A type filter returns exactly the records of that type.
    #[test]
    fn type_filter_selects_matching_subset(
        rows in prop::collection::vec(any_row(), 0..20),
        wanted in prop::sample::select(RecordType::ALL.to_vec()),
    ) {
        let store = populated(&rows);
        let query = RecordQuery::new(wanted, "", SortPolicy::NameAsc);
        let listed = list_records(store.connection(), &query).unwrap();
        prop_assert!(listed.iter().all(|r| r.record_type == wanted));
        let expected = rows.iter().filter(|r| r.0 == wanted).count();
        prop_assert_eq!(listed.len(), expected);
    }

    /// Search ignores case and only returns records whose name or username contains it.
    #[test]
    fn search_is_case_insensitive(
        rows in prop::collection::vec(any_row(), 0..20),
        needle in "[a-zA-Z]{1,2}",
    ) {
        let store = populated(&rows);
        let lower = RecordQuery::new(TypeFilter::All, needle.to_lowercase(), SortPolicy::NameAsc);
        let upper = RecordQuery::new(TypeFilter::All, needle.to_uppercase(), SortPolicy::NameAsc);
        let a = list_records(store.connection(), &lower).unwrap();
        let b = list_records(store.connection(), &upper).unwrap();
        prop_assert_eq!(&a, &b);

        let n = needle.to_lowercase();
        for r in &a {
            let in_name = r.name.to_lowercase().contains(&n);
            let in_login = r.login.as_deref().is_some_and(|l| l.contains(&n));
            prop_assert!(in_name || in_login);
        }
    }

    /// Search returns exactly the records whose name or username contains
    /// the untrimmed needle, ignoring case. E-mail never matches.
    #[test]
    fn search_returns_exactly_the_matching_records(
        rows in prop::collection::vec(any_row(), 0..20),
        needle in "[a-zA-Z ]{1,3}",
    ) {
        let store = populated(&rows);
        let query = RecordQuery::new(TypeFilter::All, needle.clone(), SortPolicy::NameAsc);
        let found: BTreeSet<i64> = list_records(store.connection(), &query)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();

        let n = needle.to_lowercase();
        let expected: BTreeSet<i64> = rows
            .iter()
            .zip(1i64..)
            .filter(|((record_type, name, username, ..), _)| {
                // Stored values are trimmed on save.
                let by_username = *record_type == RecordType::Web
                    && username.trim().to_lowercase().contains(&n);
                name.trim().to_lowercase().contains(&n) || by_username
            })
            .map(|(_, id)| id)
            .collect();
        prop_assert_eq!(found, expected);
    }

    /// Every policy is a permutation of the unsorted result.
    #[test]
    fn sorting_never_drops_records(rows in prop::collection::vec(any_row(), 0..20)) {
        let store = populated(&rows);
        let expected: BTreeSet<i64> = list_records(store.connection(), &RecordQuery::default())
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        prop_assert_eq!(expected.len(), rows.len());
        for policy in SortPolicy::ALL {
            let query = RecordQuery::new(TypeFilter::All, "", policy);
            let listed = list_records(store.connection(), &query).unwrap();
            let ids: BTreeSet<i64> = listed.iter().map(|r| r.id).collect();
            prop_assert_eq!(&ids, &expected);
            prop_assert_eq!(listed.len(), expected.len());
        }
    }

    /// Name and modification orders are monotone.
    #[test]
    fn orders_are_monotone(rows in prop::collection::vec(any_row(), 0..20)) {
        let store = populated(&rows);
        let conn = store.connection();

        let by_name = list_records(conn, &RecordQuery::new(TypeFilter::All, "", SortPolicy::NameAsc)).unwrap();
        prop_assert!(by_name.windows(2).all(|w| w[0].name <= w[1].name));

        let by_name_desc = list_records(conn, &RecordQuery::new(TypeFilter::All, "", SortPolicy::NameDesc)).unwrap();
        prop_assert!(by_name_desc.windows(2).all(|w| w[0].name >= w[1].name));

        let newest = list_records(conn, &RecordQuery::new(TypeFilter::All, "", SortPolicy::UpdatedDesc)).unwrap();
        let stamps: Vec<u64> = newest.iter().map(|r| parse_timestamp(&r.updated_at).unwrap()).collect();
        prop_assert!(stamps.windows(2).all(|w| w[0] >= w[1]));

        let favorites = list_records(conn, &RecordQuery::new(TypeFilter::All, "", SortPolicy::FavoritesFirst)).unwrap();
        let first_plain = favorites.iter().position(|r| !r.is_favorite).unwrap_or(favorites.len());
        prop_assert!(favorites[first_plain..].iter().all(|r| !r.is_favorite));
    }
}
