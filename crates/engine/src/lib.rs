//! Search engine for nearseek
//!
//! This crate turns the versioned index into a near-match search service:
//! - PrefixBound: legal range of result keys for one search
//! - NearSearch: two-cursor outward walk to the closest visible key
//! - Cursor: key encoding, prefix mode and reconfiguration per cursor
//! - Database: config, tiered index and transaction manager in one place
//!
//! The engine is the only component that knows about:
//! - Prefix truncation
//! - Cursor configuration strings and `nearseek.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod database;
pub mod prefix;
pub mod search;

pub use cursor::{Cursor, CursorConfig};
pub use database::{Database, EngineConfig, CONFIG_FILE_NAME};
pub use prefix::{prefix_successor, PrefixBound};
pub use search::{compare_distance, NearSearch, SearchResult, SearchState};
