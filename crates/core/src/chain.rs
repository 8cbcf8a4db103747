//! Append-only version chains
//!
//! A chain is a persistent singly linked list of versions, newest first.
//! Adding a version builds a new head node that points at the existing
//! nodes; existing nodes are never touched. Cloning a chain is an `Arc`
//! bump, so a reader that has cloned the head can walk it without locks
//! while writers publish newer heads.
//!
//! ```text
//! head(v3) ──► v2 ──► v1        (reader A cloned here)
//!   ▲
//! head(v4) ─┘                   (published later; A still sees v3..v1)
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use crate::version::Version;

struct ChainNode {
    version: Version,
    next: Option<Arc<ChainNode>>,
}

/// Versions of one key, ordered by commit timestamp, newest first
///
/// Invariant: commit timestamps are strictly decreasing from head to tail.
#[derive(Clone, Default)]
pub struct VersionChain {
    head: Option<Arc<ChainNode>>,
    len: usize,
}

impl VersionChain {
    /// Create an empty chain
    pub fn empty() -> Self {
        VersionChain::default()
    }

    /// Create a chain holding a single version
    pub fn new(version: Version) -> Self {
        VersionChain {
            head: Some(Arc::new(ChainNode {
                version,
                next: None,
            })),
            len: 1,
        }
    }

    /// Build a chain from versions listed newest first
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if commit timestamps are not strictly
    /// decreasing.
    pub fn from_newest_first(versions: Vec<Version>) -> Result<Self> {
        let mut chain = VersionChain::empty();
        for version in versions.into_iter().rev() {
            chain = chain.prepend(version)?;
        }
        Ok(chain)
    }

    /// Return a new chain with `version` as its head
    ///
    /// `self` is left untouched and keeps sharing its nodes with the result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless `version` is strictly newer than the
    /// current head.
    pub fn prepend(&self, version: Version) -> Result<Self> {
        if let Some(newest) = self.newest_commit() {
            if version.commit_ts <= newest {
                return Err(Error::InvalidOperation(format!(
                    "commit timestamp {} is not newer than existing version at {}",
                    version.commit_ts, newest
                )));
            }
        }
        Ok(VersionChain {
            head: Some(Arc::new(ChainNode {
                version,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        })
    }

    /// Stack every version of `newer` on top of `older`
    ///
    /// The nodes of `older` are shared, the versions of `newer` are copied
    /// into fresh nodes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if some version of `newer` is not strictly
    /// newer than every version of `older`.
    pub fn stack(newer: &VersionChain, older: &VersionChain) -> Result<Self> {
        let pending: Vec<&Version> = newer.iter().collect();
        let mut chain = older.clone();
        for version in pending.into_iter().rev() {
            chain = chain.prepend(version.clone())?;
        }
        Ok(chain)
    }

    /// Newest version, if any
    #[inline]
    pub fn newest(&self) -> Option<&Version> {
        self.head.as_deref().map(|node| &node.version)
    }

    /// Commit timestamp of the newest version
    #[inline]
    pub fn newest_commit(&self) -> Option<Timestamp> {
        self.newest().map(|v| v.commit_ts)
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            next: self.head.as_deref(),
        }
    }

    /// Number of versions
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chain has no versions
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

// Iterative drop so very long chains cannot overflow the stack through
// nested `Arc<ChainNode>` destructors.
impl Drop for VersionChain {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl PartialEq for VersionChain {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for VersionChain {}

impl fmt::Debug for VersionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a chain, newest first
pub struct ChainIter<'a> {
    next: Option<&'a ChainNode>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Version;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.version
        })
    }
}
