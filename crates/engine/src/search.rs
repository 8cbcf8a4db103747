//! Near-match search
//!
//! `NearSearch` finds the visible key closest to a target under a snapshot,
//! never leaving a `PrefixBound`.
//!
//! ## Walk
//!
//! ```text
//! Probing          exact target visible and in bound?  -> Exact
//!     |
//! ScanningOutward  below <- predecessor cursor   successor cursor -> above
//!     |            take the closer candidate (ties: below)
//!     |            out of bound  -> abandon that direction for good
//!     |            visible       -> Smaller / Larger
//!     |            invisible     -> step that cursor outward
//! Terminal         both directions abandoned -> NotFound
//! ```
//!
//! ## Distance
//!
//! A candidate is closer the longer the byte prefix it shares with the
//! target; among equal shared prefixes, the smaller the gap between the
//! first differing bytes (a missing byte counts as -1). Along either
//! direction of the ordered walk distance never decreases, so the first
//! visible candidate taken is the closest visible key overall.

use std::cmp::{Ordering, Reverse};

use nearseek_concurrency::{resolve, Snapshot};
use nearseek_core::{Error, Key, Result, VersionedIndex};
use tracing::{debug, trace};

use crate::prefix::PrefixBound;

/// Outcome of a near-match search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    /// The target itself is visible
    Exact(Key),
    /// Closest visible key is smaller than the target
    Smaller(Key),
    /// Closest visible key is larger than the target
    Larger(Key),
    /// No visible key inside the bound
    NotFound,
}

impl SearchResult {
    /// `0` exact, `-1` smaller, `+1` larger, `None` when nothing was found
    pub fn direction(&self) -> Option<i8> {
        match self {
            SearchResult::Exact(_) => Some(0),
            SearchResult::Smaller(_) => Some(-1),
            SearchResult::Larger(_) => Some(1),
            SearchResult::NotFound => None,
        }
    }

    /// Matched key
    pub fn key(&self) -> Option<&Key> {
        match self {
            SearchResult::Exact(k) | SearchResult::Smaller(k) | SearchResult::Larger(k) => Some(k),
            SearchResult::NotFound => None,
        }
    }

    /// Consume into the matched key
    pub fn into_key(self) -> Option<Key> {
        match self {
            SearchResult::Exact(k) | SearchResult::Smaller(k) | SearchResult::Larger(k) => Some(k),
            SearchResult::NotFound => None,
        }
    }

    /// Whether a key was found
    pub fn is_found(&self) -> bool {
        !matches!(self, SearchResult::NotFound)
    }
}

/// Where a search is in its walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Checking the target itself
    Probing,
    /// Walking both cursors outward
    ScanningOutward,
    /// A result has been produced
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    Above,
}

/// Compare how close `a` and `b` are to `target`
///
/// `Ordering::Less` means `a` is closer.
pub fn compare_distance(target: &[u8], a: &[u8], b: &[u8]) -> Ordering {
    distance(target, a).cmp(&distance(target, b))
}

fn distance(target: &[u8], candidate: &[u8]) -> (Reverse<usize>, u16) {
    let lcp = target
        .iter()
        .zip(candidate)
        .take_while(|(t, c)| t == c)
        .count();
    let byte_at = |bytes: &[u8]| bytes.get(lcp).map_or(-1i16, |&b| i16::from(b));
    let gap = (byte_at(target) - byte_at(candidate)).unsigned_abs();
    (Reverse(lcp), gap)
}

/// Near-match search over a `VersionedIndex` at a fixed snapshot
///
/// The engine owns no shared state; one instance can run any number of
/// searches in sequence. `state()` and `candidates_examined()` describe the
/// most recent search.
pub struct NearSearch<'a> {
    index: &'a dyn VersionedIndex,
    snapshot: Snapshot,
    state: SearchState,
    examined: usize,
}

impl<'a> NearSearch<'a> {
    /// Engine reading `index` through `snapshot`
    pub fn new(index: &'a dyn VersionedIndex, snapshot: Snapshot) -> Self {
        NearSearch {
            index,
            snapshot,
            state: SearchState::Probing,
            examined: 0,
        }
    }

    /// Snapshot searches read through
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    /// State reached by the last search
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Keys whose chains the last search resolved
    pub fn candidates_examined(&self) -> usize {
        self.examined
    }

    /// Closest visible key to `target`
    ///
    /// With `prefix_mode` the result is restricted to keys that start with
    /// `target`.
    ///
    /// # Errors
    ///
    /// `StorageFault` from the index, unchanged.
    pub fn search_near(&mut self, target: &Key, prefix_mode: bool) -> Result<SearchResult> {
        let bound = PrefixBound::bounds(target.as_bytes(), prefix_mode);
        self.search_near_within(target, &bound)
    }

    /// Closest visible key to `target` inside `bound`
    ///
    /// # Errors
    ///
    /// - `InvalidPrefixBound` if `target` lies outside `bound`
    /// - `StorageFault` from the index, unchanged
    pub fn search_near_within(&mut self, target: &Key, bound: &PrefixBound) -> Result<SearchResult> {
        self.state = SearchState::Probing;
        self.examined = 0;

        if !bound.contains(target) {
            self.state = SearchState::Terminal;
            return Err(Error::InvalidPrefixBound(format!(
                "target {} lies outside {}",
                target, bound
            )));
        }

        let result = self.walk(target, bound);
        self.state = SearchState::Terminal;

        if let Ok(result) = &result {
            debug!(
                target: "nearseek::search",
                %target,
                %bound,
                read_ts = self.snapshot.read_ts().as_u64(),
                examined = self.examined,
                direction = ?result.direction(),
                "search_near complete"
            );
        }
        result
    }

    fn walk(&mut self, target: &Key, bound: &PrefixBound) -> Result<SearchResult> {
        if self.is_visible(target)? {
            return Ok(SearchResult::Exact(target.clone()));
        }

        self.state = SearchState::ScanningOutward;
        let mut below = self.index.predecessor(target)?;
        let mut above = self.index.successor(target)?;

        loop {
            below = Self::within(below, bound, Side::Below);
            above = Self::within(above, bound, Side::Above);

            let side = match (&below, &above) {
                (None, None) => return Ok(SearchResult::NotFound),
                (Some(_), None) => Side::Below,
                (None, Some(_)) => Side::Above,
                (Some(b), Some(a)) => {
                    match compare_distance(target.as_bytes(), b.as_bytes(), a.as_bytes()) {
                        Ordering::Greater => Side::Above,
                        Ordering::Less | Ordering::Equal => Side::Below,
                    }
                }
            };

            match side {
                Side::Below => {
                    if let Some(key) = below.take() {
                        if self.is_visible(&key)? {
                            return Ok(SearchResult::Smaller(key));
                        }
                        below = self.index.predecessor(&key)?;
                    }
                }
                Side::Above => {
                    if let Some(key) = above.take() {
                        if self.is_visible(&key)? {
                            return Ok(SearchResult::Larger(key));
                        }
                        above = self.index.successor(&key)?;
                    }
                }
            }
        }
    }

    fn within(candidate: Option<Key>, bound: &PrefixBound, side: Side) -> Option<Key> {
        match candidate {
            Some(key) if !bound.contains(&key) => {
                trace!(target: "nearseek::search", %key, ?side, "direction abandoned at bound");
                None
            }
            other => other,
        }
    }

    fn is_visible(&mut self, key: &Key) -> Result<bool> {
        let Some(chain) = self.index.version_chain(key)? else {
            return Ok(false);
        };
        self.examined += 1;
        Ok(resolve(&chain, &self.snapshot).is_visible())
    }
}
