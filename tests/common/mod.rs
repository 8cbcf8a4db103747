//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Once;

use nearseek::{
    CursorConfig, Database, EngineConfig, Key, KeyFormat, Payload, PrefixBound, SearchResult,
    Timestamp,
};
use tempfile::TempDir;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness writer.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Key formats every scenario runs under. Fixed width fits every test key.
pub const FORMATS: [KeyFormat; 3] = [KeyFormat::Raw, KeyFormat::String, KeyFormat::Fixed(4)];

// ============================================================================
// TestDb - database in a temp dir with a fixed key format
// ============================================================================

/// Test database wrapper.
pub struct TestDb {
    pub db: Database,
    pub dir: TempDir,
    pub format: KeyFormat,
}

impl TestDb {
    /// Fresh database using `format` for every key.
    pub fn new(format: KeyFormat) -> Self {
        Self::with_config(EngineConfig {
            cursor: CursorConfig {
                prefix_key: false,
                key_format: format,
            },
            ..EngineConfig::default()
        })
    }

    /// Fresh database with an explicit config.
    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let format = config.cursor.key_format;
        let db = Database::open_with_config(dir.path(), config)
            .expect("Failed to open test database");
        TestDb { db, dir, format }
    }

    /// Encoded form of a user key.
    pub fn key(&self, user_key: &str) -> Key {
        self.format.encode(user_key.as_bytes()).expect("key fits format")
    }

    /// Put every key (value = key) in one transaction at `ts`.
    pub fn put_all(&self, keys: &[&str], ts: u64) {
        let mut txn = self.db.begin_write();
        for k in keys {
            txn.put(self.key(k), k.as_bytes().to_vec()).unwrap();
        }
        self.db.commit(&mut txn, Timestamp::new(ts)).unwrap();
    }

    /// Delete `keys` in one transaction at `ts`.
    pub fn delete_all(&self, keys: &[&str], ts: u64) {
        let mut txn = self.db.begin_write();
        for k in keys {
            txn.delete(self.key(k)).unwrap();
        }
        self.db.commit(&mut txn, Timestamp::new(ts)).unwrap();
    }

    /// One cursor search at `read_ts`.
    pub fn search(&self, read_ts: u64, target: &str, prefix_key: bool) -> SearchResult {
        let read = self.db.begin_read(Some(Timestamp::new(read_ts)));
        let mut cursor = self.db.open_cursor_with(
            &read,
            CursorConfig {
                prefix_key,
                key_format: self.format,
            },
        );
        cursor.set_key(target).unwrap();
        cursor.search_near().unwrap()
    }

    /// Expected result helpers in this database's key format.
    pub fn larger(&self, user_key: &str) -> SearchResult {
        SearchResult::Larger(self.key(user_key))
    }

    pub fn smaller(&self, user_key: &str) -> SearchResult {
        SearchResult::Smaller(self.key(user_key))
    }

    pub fn exact(&self, user_key: &str) -> SearchResult {
        SearchResult::Exact(self.key(user_key))
    }
}

/// Order in which the reference scenario's two transactions commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOrder {
    /// `aaa..aay` at 200 first, then `aaz` at the older timestamp 50.
    NewerFirst,
    /// `aaz` at 50 first, then `aaa..aay` at 200.
    OlderFirst,
}

pub const COMMIT_ORDERS: [CommitOrder; 2] = [CommitOrder::NewerFirst, CommitOrder::OlderFirst];

/// `aaa..aay` at 200 and `aaz` at 50, committed in `order`.
pub fn load_reference_scenario(tdb: &TestDb, order: CommitOrder) {
    let keys: Vec<String> = (b'a'..=b'y')
        .map(|c| String::from_utf8(vec![b'a', b'a', c]).unwrap())
        .collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    match order {
        CommitOrder::NewerFirst => {
            tdb.put_all(&refs, 200);
            tdb.put_all(&["aaz"], 50);
        }
        CommitOrder::OlderFirst => {
            tdb.put_all(&["aaz"], 50);
            tdb.put_all(&refs, 200);
        }
    }
}

// ============================================================================
// ReferenceModel - brute-force search over every key
// ============================================================================

/// Brute-force model of committed history.
#[derive(Debug, Default, Clone)]
pub struct ReferenceModel {
    /// Versions per key, oldest first.
    versions: BTreeMap<Key, Vec<(u64, Option<Vec<u8>>)>>,
}

impl ReferenceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, writes: &[(Key, Payload)], ts: u64) {
        for (key, payload) in writes {
            self.versions
                .entry(key.clone())
                .or_default()
                .push((ts, payload.value().map(<[u8]>::to_vec)));
        }
    }

    pub fn is_visible(&self, key: &Key, read_ts: u64) -> bool {
        self.versions
            .get(key)
            .and_then(|vs| vs.iter().rev().find(|(ts, _)| *ts <= read_ts))
            .map_or(false, |(_, value)| value.is_some())
    }

    pub fn visible_keys(&self, read_ts: u64) -> Vec<Key> {
        self.versions
            .keys()
            .filter(|k| self.is_visible(k, read_ts))
            .cloned()
            .collect()
    }

    /// Closest visible key by checking every key.
    pub fn search_near(&self, target: &Key, read_ts: u64, prefix_mode: bool) -> SearchResult {
        if self.is_visible(target, read_ts) {
            return SearchResult::Exact(target.clone());
        }
        let bound = PrefixBound::bounds(target.as_bytes(), prefix_mode);
        let best = self
            .visible_keys(read_ts)
            .into_iter()
            .filter(|k| k != target && bound.contains(k))
            .min_by(|a, b| closer(target, a, b));
        match best {
            Some(k) if k < *target => SearchResult::Smaller(k),
            Some(k) => SearchResult::Larger(k),
            None => SearchResult::NotFound,
        }
    }
}

/// (shared prefix length, gap at first differing byte; missing byte = -1)
fn distance(target: &[u8], key: &[u8]) -> (usize, i32) {
    let mut lcp = 0;
    while lcp < target.len() && lcp < key.len() && target[lcp] == key[lcp] {
        lcp += 1;
    }
    let at = |b: &[u8]| if lcp < b.len() { b[lcp] as i32 } else { -1 };
    (lcp, (at(target) - at(key)).abs())
}

/// Ordering of candidates: closer first; equidistant keys below the target
/// before keys above it; within a side, the key nearer in key order first.
fn closer(target: &Key, a: &Key, b: &Key) -> Ordering {
    let (la, ga) = distance(target.as_bytes(), a.as_bytes());
    let (lb, gb) = distance(target.as_bytes(), b.as_bytes());
    lb.cmp(&la)
        .then(ga.cmp(&gb))
        .then_with(|| match (a < target, b < target) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => b.cmp(a),
            (false, false) => a.cmp(b),
        })
}
