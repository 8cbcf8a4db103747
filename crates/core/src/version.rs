//! Versions and payloads
//!
//! A logical update never rewrites a version: it adds a new one with a newer
//! commit timestamp. A delete adds a `Tombstone`.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// What a version carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// A stored value
    Value(Vec<u8>),
    /// The key was deleted as of this version
    Tombstone,
}

impl Payload {
    /// Whether this payload marks a delete
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Payload::Tombstone)
    }

    /// Value bytes, or `None` for a tombstone
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Payload::Value(v) => Some(v),
            Payload::Tombstone => None,
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Value(v)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Value(s.as_bytes().to_vec())
    }
}

/// One committed version of a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Commit timestamp of the writing transaction
    pub commit_ts: Timestamp,
    /// Value or tombstone
    pub payload: Payload,
}

impl Version {
    /// Create a version
    pub fn new(commit_ts: Timestamp, payload: Payload) -> Self {
        Version { commit_ts, payload }
    }

    /// Create a value version
    pub fn value(commit_ts: impl Into<Timestamp>, value: impl Into<Vec<u8>>) -> Self {
        Version::new(commit_ts.into(), Payload::Value(value.into()))
    }

    /// Create a tombstone version
    pub fn tombstone(commit_ts: impl Into<Timestamp>) -> Self {
        Version::new(commit_ts.into(), Payload::Tombstone)
    }
}
