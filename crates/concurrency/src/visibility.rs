//! Visibility resolution
//!
//! Decides which single version of a chain a snapshot sees. Pure function of
//! the chain and the snapshot: no locks, no shared state. Because chains are
//! append-only and readers hold their own head, a commit that lands while a
//! resolution is in progress cannot change its outcome.

use nearseek_core::{Payload, Timestamp, Version, VersionChain};

use crate::snapshot::Snapshot;

/// Outcome of resolving a chain under a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility<'a> {
    /// The snapshot sees a value committed at `commit_ts`
    Visible {
        /// Value bytes
        value: &'a [u8],
        /// Commit timestamp of the visible version
        commit_ts: Timestamp,
    },
    /// The key is logically absent for this snapshot
    Invisible,
}

impl<'a> Visibility<'a> {
    /// Whether the key is present for the snapshot
    #[inline]
    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Visible { .. })
    }

    /// Visible value bytes
    pub fn value(&self) -> Option<&'a [u8]> {
        match self {
            Visibility::Visible { value, .. } => Some(value),
            Visibility::Invisible => None,
        }
    }
}

/// Newest version of `chain` the snapshot admits, tombstones included
pub fn visible_version<'a>(chain: &'a VersionChain, snapshot: &Snapshot) -> Option<&'a Version> {
    chain.iter().find(|v| snapshot.admits(v.commit_ts))
}

/// Resolve `chain` under `snapshot`
///
/// Scans newest to oldest and stops at the first version whose commit
/// timestamp is `<= read_ts`. A tombstone there, or no qualifying version at
/// all, means the key is absent.
pub fn resolve<'a>(chain: &'a VersionChain, snapshot: &Snapshot) -> Visibility<'a> {
    match visible_version(chain, snapshot) {
        Some(Version {
            commit_ts,
            payload: Payload::Value(value),
        }) => Visibility::Visible {
            value,
            commit_ts: *commit_ts,
        },
        Some(Version {
            payload: Payload::Tombstone,
            ..
        })
        | None => Visibility::Invisible,
    }
}
