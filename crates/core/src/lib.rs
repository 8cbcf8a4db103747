//! Core types and traits for nearseek
//!
//! This crate defines the foundational types used throughout the system:
//! - Key: ordered byte key, and KeyFormat for user-facing encodings
//! - Timestamp: logical commit/read timestamp
//! - Payload / Version: one committed version of a key
//! - VersionChain: append-only, newest-first chain of versions
//! - Error: error type hierarchy
//! - Traits: VersionedIndex (read contract), CommitTarget (write path)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod error;
pub mod key;
pub mod timestamp;
pub mod traits;
pub mod version;

pub use chain::{ChainIter, VersionChain};
pub use error::{Error, Result, StorageFault};
pub use key::{Key, KeyFormat};
pub use timestamp::Timestamp;
pub use traits::{CommitTarget, VersionedIndex};
pub use version::{Payload, Version};
