//! Read and write transactions
//!
//! A `ReadTransaction` is nothing more than a snapshot handed out by the
//! `TransactionManager`. A `WriteTransaction` buffers puts and deletes until
//! commit, then hands the whole write set to a `CommitTarget` in one call.
//!
//! ## Lifecycle
//!
//! ```text
//! Active --commit ok--> Committed
//!    \----commit err--> Aborted { reason }
//!    \----abort()-----> Aborted { reason }
//! ```

use std::collections::BTreeMap;

use nearseek_core::{Error, Key, Payload, Result, Timestamp};

use crate::snapshot::Snapshot;

/// Status of a write transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Buffering writes
    Active,
    /// Write set applied at `commit_ts`
    Committed {
        /// Commit timestamp of the write set
        commit_ts: Timestamp,
    },
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// Read-only transaction: a snapshot at a fixed read timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTransaction {
    snapshot: Snapshot,
}

impl ReadTransaction {
    /// Read transaction at `read_ts`
    pub fn at(read_ts: Timestamp) -> Self {
        ReadTransaction {
            snapshot: Snapshot::at(read_ts),
        }
    }

    /// Snapshot this transaction reads through
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    /// Read timestamp
    #[inline]
    pub fn read_ts(&self) -> Timestamp {
        self.snapshot.read_ts()
    }
}

/// Buffered write transaction
///
/// The last write to a key wins: `put` after `delete` stores the value,
/// `delete` after `put` stores a tombstone. Keys are kept sorted so the
/// committed write set is deterministic.
#[derive(Debug)]
pub struct WriteTransaction {
    txn_id: u64,
    writes: BTreeMap<Key, Payload>,
    status: TransactionStatus,
}

impl WriteTransaction {
    /// Empty, active transaction
    pub fn new(txn_id: u64) -> Self {
        WriteTransaction {
            txn_id,
            writes: BTreeMap::new(),
            status: TransactionStatus::Active,
        }
    }

    /// Transaction id assigned by the manager
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Whether the transaction still accepts writes
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Buffer a value for `key`
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the transaction is no longer active.
    pub fn put(&mut self, key: impl Into<Key>, value: impl Into<Vec<u8>>) -> Result<()> {
        self.write(key.into(), Payload::Value(value.into()))
    }

    /// Buffer a delete for `key`
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the transaction is no longer active.
    pub fn delete(&mut self, key: impl Into<Key>) -> Result<()> {
        self.write(key.into(), Payload::Tombstone)
    }

    fn write(&mut self, key: Key, payload: Payload) -> Result<()> {
        self.ensure_active()?;
        self.writes.insert(key, payload);
        Ok(())
    }

    /// Number of distinct keys written
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Buffered payload for `key`, if written by this transaction
    pub fn pending(&self, key: &Key) -> Option<&Payload> {
        self.writes.get(key)
    }

    /// Write set in key order
    pub fn write_set(&self) -> Vec<(Key, Payload)> {
        self.writes
            .iter()
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect()
    }

    /// Abort, discarding buffered writes
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the transaction already committed or aborted.
    pub fn abort(&mut self, reason: impl Into<String>) -> Result<()> {
        self.ensure_active()?;
        self.writes.clear();
        self.status = TransactionStatus::Aborted {
            reason: reason.into(),
        };
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        match &self.status {
            TransactionStatus::Active => Ok(()),
            TransactionStatus::Committed { commit_ts } => Err(Error::InvalidOperation(format!(
                "transaction {} already committed at {}",
                self.txn_id, commit_ts
            ))),
            TransactionStatus::Aborted { reason } => Err(Error::InvalidOperation(format!(
                "transaction {} aborted: {}",
                self.txn_id, reason
            ))),
        }
    }

    pub(crate) fn mark_committed(&mut self, commit_ts: Timestamp) {
        self.writes.clear();
        self.status = TransactionStatus::Committed { commit_ts };
    }

    pub(crate) fn mark_aborted(&mut self, reason: String) {
        self.writes.clear();
        self.status = TransactionStatus::Aborted { reason };
    }
}
