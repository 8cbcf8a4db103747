//! Concurrency layer for nearseek
//!
//! This crate implements snapshot reads and buffered writes:
//! - Snapshot: read timestamp and the admission rule for commit timestamps
//! - Visibility: which version of a chain a snapshot sees
//! - WriteTransaction / ReadTransaction: buffered writes, fixed read point
//! - TransactionManager: transaction ids, latest commit, commit through a
//!   `CommitTarget`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod snapshot;
pub mod transaction;
pub mod visibility;

pub use manager::TransactionManager;
pub use snapshot::Snapshot;
pub use transaction::{ReadTransaction, TransactionStatus, WriteTransaction};
pub use visibility::{resolve, visible_version, Visibility};
