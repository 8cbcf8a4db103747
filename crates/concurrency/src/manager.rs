//! Transaction manager
//!
//! Hands out read snapshots and commits write transactions through a
//! `CommitTarget`.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. reject inactive transactions and a zero commit timestamp
//! 2. empty write set: mark committed, nothing to apply
//! 3. target.commit(write_set, commit_ts), all or nothing
//! 4. IF it fails: mark aborted and return the error unchanged
//! 5. advance last_commit (fetch_max) and mark committed
//! ```
//!
//! Commit timestamps are supplied by the caller. The manager only tracks the
//! greatest one it has applied so `begin_read(None)` can read "latest".

use std::sync::atomic::{AtomicU64, Ordering};

use nearseek_core::{CommitTarget, Error, Result, Timestamp};
use tracing::{debug, warn};

use crate::transaction::{ReadTransaction, WriteTransaction};

/// Coordinates transaction ids, read timestamps and commits
#[derive(Debug)]
pub struct TransactionManager {
    /// Greatest commit timestamp applied through this manager
    last_commit: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,
}

impl TransactionManager {
    /// Manager whose latest commit is `last_commit`
    ///
    /// # Arguments
    /// * `last_commit` - greatest commit timestamp already in the index
    ///   (e.g. the newest version of a reopened page)
    pub fn new(last_commit: Timestamp) -> Self {
        TransactionManager {
            last_commit: AtomicU64::new(last_commit.as_u64()),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Greatest commit timestamp applied so far
    pub fn last_commit(&self) -> Timestamp {
        Timestamp::new(self.last_commit.load(Ordering::Acquire))
    }

    /// Start a read transaction
    ///
    /// `None` reads at the latest commit.
    pub fn begin_read(&self, read_ts: Option<Timestamp>) -> ReadTransaction {
        ReadTransaction::at(read_ts.unwrap_or_else(|| self.last_commit()))
    }

    /// Start a write transaction
    pub fn begin_write(&self) -> WriteTransaction {
        WriteTransaction::new(self.next_txn_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Commit `txn` at `commit_ts`
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the transaction is not active, `commit_ts` is
    ///   zero, or the target rejects the timestamp as out of order
    /// - `StorageFault` from the target, unchanged
    ///
    /// On any error raised by the target the transaction is aborted.
    pub fn commit(
        &self,
        txn: &mut WriteTransaction,
        target: &dyn CommitTarget,
        commit_ts: Timestamp,
    ) -> Result<()> {
        txn.ensure_active()?;
        if commit_ts.is_zero() {
            return Err(Error::InvalidOperation(
                "commit timestamp must be greater than zero".to_string(),
            ));
        }

        if !txn.is_empty() {
            let writes = txn.write_set();
            if let Err(e) = target.commit(&writes, commit_ts) {
                warn!(
                    target: "nearseek::txn",
                    txn_id = txn.txn_id(),
                    commit_ts = commit_ts.as_u64(),
                    error = %e,
                    "Commit rejected"
                );
                txn.mark_aborted(format!("commit failed: {}", e));
                return Err(e);
            }
        }

        self.last_commit
            .fetch_max(commit_ts.as_u64(), Ordering::AcqRel);
        debug!(
            target: "nearseek::txn",
            txn_id = txn.txn_id(),
            commit_ts = commit_ts.as_u64(),
            keys = txn.len(),
            "Transaction committed"
        );
        txn.mark_committed(commit_ts);
        Ok(())
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(Timestamp::ZERO)
    }
}
