//! Reference scenarios: `aaa..aay` committed at 200, `aaz` at 50.
//!
//! Every scenario runs under each key format, in both commit orders, and
//! under each residency: fully resident, evicted before reading, and evicted
//! between calls.

use nearseek::{Error, KeyFormat, SearchResult, Timestamp};

use crate::common::*;

#[derive(Debug, Clone, Copy)]
enum Residency {
    Resident,
    Evicted,
    EvictBetweenCalls,
}

const RESIDENCIES: [Residency; 3] = [
    Residency::Resident,
    Residency::Evicted,
    Residency::EvictBetweenCalls,
];

fn setup(format: KeyFormat, order: CommitOrder, residency: Residency) -> TestDb {
    let tdb = TestDb::new(format);
    load_reference_scenario(&tdb, order);
    if !matches!(residency, Residency::Resident) {
        tdb.db.evict().unwrap();
    }
    tdb
}

fn run(tdb: &TestDb, residency: Residency, read_ts: u64, target: &str, prefix: bool) -> SearchResult {
    let result = tdb.search(read_ts, target, prefix);
    if let Residency::EvictBetweenCalls = residency {
        // Nothing new is resident, so this only drops the materialized page.
        tdb.db.evict().unwrap();
        assert!(!tdb.db.index().is_materialized());
    }
    result
}

fn for_each_setup(check: impl Fn(&TestDb, Residency)) {
    for format in FORMATS {
        for order in COMMIT_ORDERS {
            for residency in RESIDENCIES {
                let tdb = setup(format, order, residency);
                check(&tdb, residency);
            }
        }
    }
}

#[test]
fn read_between_commits_sees_only_aaz() {
    for_each_setup(|tdb, r| {
        assert_eq!(run(tdb, r, 100, "aa", false), tdb.larger("aaz"), "{:?}", tdb.format);
        assert_eq!(run(tdb, r, 100, "az", false), tdb.smaller("aaz"), "{:?}", tdb.format);
        assert_eq!(run(tdb, r, 100, "aa", true), tdb.larger("aaz"), "{:?}", tdb.format);
        assert_eq!(run(tdb, r, 100, "az", true), SearchResult::NotFound, "{:?}", tdb.format);
    });
}

#[test]
fn read_before_any_commit_finds_nothing() {
    for_each_setup(|tdb, r| {
        for target in ["aa", "az", "aaz", "a", "zzzz"] {
            assert_eq!(run(tdb, r, 25, target, false), SearchResult::NotFound);
            assert_eq!(run(tdb, r, 25, target, true), SearchResult::NotFound);
        }
    });
}

#[test]
fn read_after_all_commits() {
    for_each_setup(|tdb, r| {
        assert_eq!(run(tdb, r, 250, "aa", false), tdb.larger("aaa"));
        assert_eq!(run(tdb, r, 250, "az", true), SearchResult::NotFound);
        assert_eq!(run(tdb, r, 250, "aam", false), tdb.exact("aam"));
        assert_eq!(run(tdb, r, 250, "aam", true), tdb.exact("aam"));
        assert_eq!(run(tdb, r, 250, "az", false), tdb.smaller("aaz"));
    });
}

#[test]
fn direction_codes() {
    let tdb = setup(KeyFormat::Raw, CommitOrder::NewerFirst, Residency::Resident);
    assert_eq!(tdb.search(250, "aab", false).direction(), Some(0));
    assert_eq!(tdb.search(100, "az", false).direction(), Some(-1));
    assert_eq!(tdb.search(100, "aa", false).direction(), Some(1));
    assert_eq!(tdb.search(25, "aa", false).direction(), None);
}

#[test]
fn deletes_hide_keys_after_their_timestamp() {
    for format in FORMATS {
        let tdb = setup(format, CommitOrder::NewerFirst, Residency::Resident);
        tdb.delete_all(&["aaz"], 300);
        tdb.db.evict().unwrap();

        assert_eq!(tdb.search(100, "az", false), tdb.smaller("aaz"));
        assert_eq!(tdb.search(300, "az", false), tdb.smaller("aay"));
        assert_eq!(tdb.search(300, "aaz", true), SearchResult::NotFound);
    }
}

#[test]
fn commits_after_eviction_stack_on_page() {
    let tdb = setup(KeyFormat::Raw, CommitOrder::NewerFirst, Residency::Evicted);
    tdb.put_all(&["aaz"], 400);

    let chain = nearseek::VersionedIndex::version_chain(tdb.db.index(), &tdb.key("aaz"))
        .unwrap()
        .unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.newest_commit(), Some(Timestamp::new(400)));
    assert_eq!(tdb.search(100, "az", false), tdb.smaller("aaz"));
}

#[test]
fn reconfigure_prefix_mode_between_calls() {
    let tdb = setup(KeyFormat::String, CommitOrder::NewerFirst, Residency::Evicted);
    let read = tdb.db.begin_read(Some(Timestamp::new(100)));
    let mut cursor = tdb.db.open_cursor(&read);

    cursor.set_key("az").unwrap();
    assert_eq!(cursor.search_near().unwrap(), tdb.smaller("aaz"));
    cursor.reconfigure("prefix_key=true").unwrap();
    assert_eq!(cursor.search_near().unwrap(), SearchResult::NotFound);
    cursor.reconfigure("prefix_key=false").unwrap();
    assert_eq!(cursor.search_near().unwrap(), tdb.smaller("aaz"));
}

#[test]
fn fixed_format_rejects_oversized_keys() {
    let tdb = TestDb::new(KeyFormat::Fixed(4));
    let read = tdb.db.begin_read(None);
    let mut cursor = tdb.db.open_cursor(&read);
    assert!(matches!(cursor.set_key("toolong"), Err(Error::InvalidKey(_))));
}

#[test]
fn string_format_rejects_invalid_utf8() {
    let tdb = TestDb::new(KeyFormat::String);
    let read = tdb.db.begin_read(None);
    let mut cursor = tdb.db.open_cursor(&read);
    assert!(matches!(cursor.set_key([0xffu8, 0xfe]), Err(Error::InvalidKey(_))));
}
