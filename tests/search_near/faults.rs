//! Storage faults reach the caller unchanged.

use std::fs;

use nearseek::{Database, Error, KeyFormat, StorageFault, Timestamp};

use crate::common::*;

fn evicted_db() -> TestDb {
    let tdb = TestDb::new(KeyFormat::Raw);
    load_reference_scenario(&tdb, CommitOrder::NewerFirst);
    tdb.db.evict().unwrap();
    tdb
}

fn search_err(tdb: &TestDb) -> Error {
    let read = tdb.db.begin_read(Some(Timestamp::new(100)));
    let mut cursor = tdb.db.open_cursor(&read);
    cursor.set_key("aa").unwrap();
    cursor.search_near().unwrap_err()
}

#[test]
fn corrupted_page_is_corruption_fault() {
    let tdb = evicted_db();
    let path = tdb.db.index().page_path().unwrap();
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let err = search_err(&tdb);
    assert!(
        matches!(err, Error::StorageFault(StorageFault::Corruption(_))),
        "unexpected error: {err}"
    );
}

#[test]
fn truncated_page_is_corruption_fault() {
    let tdb = evicted_db();
    let path = tdb.db.index().page_path().unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 9]).unwrap();

    assert!(matches!(
        search_err(&tdb),
        Error::StorageFault(StorageFault::Corruption(_))
    ));
}

#[test]
fn missing_page_is_io_fault() {
    let tdb = evicted_db();
    fs::remove_file(tdb.db.index().page_path().unwrap()).unwrap();

    let err = search_err(&tdb);
    assert!(err.is_storage_fault());
    assert!(matches!(err, Error::StorageFault(StorageFault::Io(_))));
}

#[test]
fn fault_is_not_retried_or_masked() {
    let tdb = evicted_db();
    let path = tdb.db.index().page_path().unwrap();
    fs::write(&path, b"not a page").unwrap();

    assert!(search_err(&tdb).is_storage_fault());
    assert!(search_err(&tdb).is_storage_fault());
    assert_eq!(tdb.db.index().materialization_count(), 0);
}

#[test]
fn reopen_over_corrupted_page_fails() {
    let dir = {
        let tdb = evicted_db();
        let path = tdb.db.index().page_path().unwrap();
        fs::write(&path, b"NSPG garbage").unwrap();
        tdb.dir
    };

    match Database::open(dir.path()) {
        Err(e) => assert!(e.is_storage_fault()),
        Ok(_) => panic!("open should fail over a corrupted page"),
    }
}
