//! Prefix bounds
//!
//! A `PrefixBound` is the legal range of result keys for one search. With
//! prefix mode off it is the whole keyspace. With prefix mode on it is
//! `[target, successor_of_prefix(target))`, where the upper end is the least
//! key greater than every key that starts with `target`:
//!
//! ```text
//! "aa"          -> ["aa", "ab")
//! "a\xff"       -> ["a\xff", "b")
//! "\xff\xff"    -> ["\xff\xff", unbounded)
//! ""            -> unbounded
//! ```

use std::fmt;

use nearseek_core::{Error, Key, Result};

/// Legal range `[lower, upper)` (or `[lower, upper]`) of result keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixBound {
    lower: Key,
    upper: Option<Key>,
    inclusive_upper: bool,
}

impl PrefixBound {
    /// The whole keyspace
    pub fn unbounded() -> Self {
        PrefixBound {
            lower: Key::empty(),
            upper: None,
            inclusive_upper: false,
        }
    }

    /// Bound for `target` under `prefix_mode`
    ///
    /// Never fails: an empty target in prefix mode is the whole keyspace.
    pub fn bounds(target: &[u8], prefix_mode: bool) -> Self {
        if !prefix_mode || target.is_empty() {
            return PrefixBound::unbounded();
        }
        PrefixBound {
            lower: Key::from(target),
            upper: prefix_successor(target),
            inclusive_upper: false,
        }
    }

    /// Prefix bound for contexts that require a non-empty key
    ///
    /// # Errors
    ///
    /// `InvalidPrefixBound` if `target` is empty.
    pub fn strict(target: &[u8]) -> Result<Self> {
        if target.is_empty() {
            return Err(Error::InvalidPrefixBound(
                "prefix search requires a non-empty key".to_string(),
            ));
        }
        Ok(PrefixBound::bounds(target, true))
    }

    /// Explicit half-open range `[lower, upper)`
    ///
    /// # Errors
    ///
    /// `InvalidPrefixBound` if `upper <= lower`.
    pub fn range(lower: impl Into<Key>, upper: impl Into<Key>) -> Result<Self> {
        let (lower, upper) = (lower.into(), upper.into());
        if upper <= lower {
            return Err(Error::InvalidPrefixBound(format!(
                "empty range [{}, {})",
                lower, upper
            )));
        }
        Ok(PrefixBound {
            lower,
            upper: Some(upper),
            inclusive_upper: false,
        })
    }

    /// Explicit closed range `[lower, upper]`
    ///
    /// # Errors
    ///
    /// `InvalidPrefixBound` if `upper < lower`.
    pub fn range_inclusive(lower: impl Into<Key>, upper: impl Into<Key>) -> Result<Self> {
        let (lower, upper) = (lower.into(), upper.into());
        if upper < lower {
            return Err(Error::InvalidPrefixBound(format!(
                "empty range [{}, {}]",
                lower, upper
            )));
        }
        Ok(PrefixBound {
            lower,
            upper: Some(upper),
            inclusive_upper: true,
        })
    }

    /// Inclusive lower end
    pub fn lower(&self) -> &Key {
        &self.lower
    }

    /// Upper end, `None` if open-ended
    pub fn upper(&self) -> Option<&Key> {
        self.upper.as_ref()
    }

    /// Whether the upper end is part of the range
    pub fn inclusive_upper(&self) -> bool {
        self.inclusive_upper
    }

    /// Whether this bound admits every key
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_empty() && self.upper.is_none()
    }

    /// Whether `key` lies inside the bound
    pub fn contains(&self, key: &Key) -> bool {
        if *key < self.lower {
            return false;
        }
        match &self.upper {
            None => true,
            Some(upper) if self.inclusive_upper => key <= upper,
            Some(upper) => key < upper,
        }
    }
}

impl Default for PrefixBound {
    fn default() -> Self {
        PrefixBound::unbounded()
    }
}

impl fmt::Display for PrefixBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.upper {
            None => write!(f, "[{}, +inf)", self.lower),
            Some(upper) if self.inclusive_upper => write!(f, "[{}, {}]", self.lower, upper),
            Some(upper) => write!(f, "[{}, {})", self.lower, upper),
        }
    }
}

/// Least key greater than every key prefixed by `prefix`
///
/// Drops trailing 0xFF bytes and increments the last remaining byte. `None`
/// when no such key exists (empty or all-0xFF prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Key> {
    let end = prefix.iter().rposition(|&b| b != 0xff)?;
    let mut upper = prefix[..=end].to_vec();
    upper[end] += 1;
    Some(Key::new(upper))
}
