//! Core traits for index abstraction
//!
//! `VersionedIndex` is the read contract the search engine consumes and
//! `CommitTarget` is the write path transactions commit through. Both are
//! object safe so upper layers can hold `Arc<dyn VersionedIndex>` and swap
//! a purely resident index for one that evicts to disk.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads (requires Send + Sync).

use crate::chain::VersionChain;
use crate::error::Result;
use crate::key::Key;
use crate::timestamp::Timestamp;
use crate::version::Payload;

/// Ordered, multi-version key index
///
/// Implementations must answer identically whether their data is resident
/// in memory or has been reconciled to a read-only representation. The
/// search engine never branches on residency.
///
/// # Errors
///
/// Every method may return `StorageFault` when the underlying storage
/// cannot be read. Callers propagate it unchanged.
pub trait VersionedIndex: Send + Sync {
    /// Greatest key `<= key`
    fn floor(&self, key: &Key) -> Result<Option<Key>>;

    /// Least key `>= key`
    fn ceiling(&self, key: &Key) -> Result<Option<Key>>;

    /// Greatest key `< key`
    fn predecessor(&self, key: &Key) -> Result<Option<Key>>;

    /// Least key `> key`
    fn successor(&self, key: &Key) -> Result<Option<Key>>;

    /// Version chain of `key`, or `None` if the index has never seen it
    fn version_chain(&self, key: &Key) -> Result<Option<VersionChain>>;
}

/// Write path for committed transactions
pub trait CommitTarget: Send + Sync {
    /// Apply a write set atomically at `commit_ts`
    ///
    /// Readers never observe a partially applied write set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `commit_ts` is not strictly newer than
    /// the newest version of any written key; nothing is applied in that
    /// case.
    fn commit(&self, writes: &[(Key, Payload)], commit_ts: Timestamp) -> Result<()>;
}
