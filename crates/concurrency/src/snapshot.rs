//! Read snapshots
//!
//! A snapshot is the caller's view of committed history: it sees a version
//! iff that version's commit timestamp is `<= read_ts` and no newer version
//! of the same key also qualifies.
//!
//! **What a Snapshot ALWAYS Provides**:
//! - Committed data as of `read_ts`
//! - Repeatable answers for the same key
//!
//! **What a Snapshot NEVER Shows**:
//! - Versions committed after `read_ts`
//! - Keys whose visible version is a tombstone

use nearseek_core::Timestamp;

/// Read point of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snapshot {
    read_ts: Timestamp,
}

impl Snapshot {
    /// Snapshot reading at `read_ts`
    pub const fn at(read_ts: Timestamp) -> Self {
        Snapshot { read_ts }
    }

    /// Snapshot that sees every commit
    pub const fn latest() -> Self {
        Snapshot::at(Timestamp::MAX)
    }

    /// Read timestamp
    #[inline]
    pub fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    /// Whether a version committed at `commit_ts` is old enough to be seen
    #[inline]
    pub fn admits(&self, commit_ts: Timestamp) -> bool {
        commit_ts <= self.read_ts
    }
}

impl From<u64> for Snapshot {
    fn from(read_ts: u64) -> Self {
        Snapshot::at(Timestamp::new(read_ts))
    }
}
