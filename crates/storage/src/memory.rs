//! MemoryIndex: purely resident versioned index
//!
//! `ResidentMap` behind a `parking_lot::RwLock`. Readers hold the read lock
//! only long enough to find a key and clone its chain head; the chain itself
//! is walked without any lock. Commits take the write lock once for the whole
//! write set, so no reader sees a partial transaction.

use parking_lot::RwLock;
use tracing::debug;

use nearseek_core::{
    CommitTarget, Key, Payload, Result, Timestamp, VersionChain, VersionedIndex,
};

use crate::resident::ResidentMap;

/// Thread-safe in-memory versioned index
#[derive(Debug, Default)]
pub struct MemoryIndex {
    map: RwLock<ResidentMap>,
}

impl MemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether the index holds no keys
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl VersionedIndex for MemoryIndex {
    fn floor(&self, key: &Key) -> Result<Option<Key>> {
        Ok(self.map.read().floor(key))
    }

    fn ceiling(&self, key: &Key) -> Result<Option<Key>> {
        Ok(self.map.read().ceiling(key))
    }

    fn predecessor(&self, key: &Key) -> Result<Option<Key>> {
        Ok(self.map.read().predecessor(key))
    }

    fn successor(&self, key: &Key) -> Result<Option<Key>> {
        Ok(self.map.read().successor(key))
    }

    fn version_chain(&self, key: &Key) -> Result<Option<VersionChain>> {
        Ok(self.map.read().chain(key))
    }
}

impl CommitTarget for MemoryIndex {
    fn commit(&self, writes: &[(Key, Payload)], commit_ts: Timestamp) -> Result<()> {
        self.map.write().apply(writes, commit_ts)?;
        debug!(
            target: "nearseek::storage",
            commit_ts = commit_ts.as_u64(),
            writes = writes.len(),
            "Applied write set to memory index"
        );
        Ok(())
    }
}
