//! Storage layer for nearseek
//!
//! This crate implements the versioned key index behind the
//! `VersionedIndex` contract:
//! - ResidentMap: BTreeMap of version chains with neighbor lookups
//! - MemoryIndex: ResidentMap behind a RwLock, purely resident
//! - ReconciledPage: immutable sorted page, loaded from / written to disk
//! - TieredIndex: resident map plus an evictable page, residency invisible
//!   to readers
//! - format: page file format (header, entries, CRC32 footer)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod memory;
pub mod reconciled;
pub mod resident;
pub mod tiered;

pub use memory::MemoryIndex;
pub use reconciled::ReconciledPage;
pub use resident::ResidentMap;
pub use tiered::TieredIndex;
