//! nearseek - snapshot-aware, prefix-bounded search-near over a
//! multi-version ordered key index
//!
//! Given a target key and a transaction snapshot, `search_near` finds the
//! visible key closest to the target and reports whether it is the target
//! itself, smaller, or larger. With prefix mode on, results never leave the
//! target's prefix range.
//!
//! # Quick Start
//!
//! ```no_run
//! use nearseek::{Database, SearchResult, Timestamp};
//!
//! # fn main() -> nearseek::Result<()> {
//! let db = Database::open("./data")?;
//!
//! let mut txn = db.begin_write();
//! txn.put("aaz", b"value".to_vec())?;
//! db.commit(&mut txn, Timestamp::new(50))?;
//!
//! let read = db.begin_read(Some(Timestamp::new(100)));
//! let mut cursor = db.open_cursor(&read);
//! cursor.set_key("az")?;
//! assert_eq!(cursor.search_near()?, SearchResult::Smaller("aaz".into()));
//!
//! cursor.reconfigure("prefix_key=true")?;
//! assert_eq!(cursor.search_near()?, SearchResult::NotFound);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `nearseek-core`: keys, versions, chains, errors, index traits
//! - `nearseek-storage`: resident map, reconciled pages, tiered index
//! - `nearseek-concurrency`: snapshots, visibility, transactions
//! - `nearseek-engine`: prefix bounds, near search, cursors, database

pub use nearseek_concurrency::{
    resolve, ReadTransaction, Snapshot, TransactionManager, TransactionStatus, Visibility,
    WriteTransaction,
};
pub use nearseek_core::{
    CommitTarget, Error, Key, KeyFormat, Payload, Result, StorageFault, Timestamp, Version,
    VersionChain, VersionedIndex,
};
pub use nearseek_engine::{
    Cursor, CursorConfig, Database, EngineConfig, NearSearch, PrefixBound, SearchResult,
    SearchState,
};
pub use nearseek_storage::{MemoryIndex, TieredIndex};
