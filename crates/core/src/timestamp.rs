//! Commit and read timestamps
//!
//! Timestamps are logical: they order commits and snapshots, they do not
//! measure wall-clock time. A version committed at `c` is a candidate for a
//! snapshot reading at `r` iff `c <= r`.
//!
//! ```
//! use nearseek_core::Timestamp;
//!
//! let commit = Timestamp::new(50);
//! let read = Timestamp::new(100);
//! assert!(commit <= read);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical commit/read timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The zero timestamp; nothing commits at zero
    pub const ZERO: Timestamp = Timestamp(0);

    /// Maximum representable timestamp; a snapshot here sees every commit
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Create a timestamp
    #[inline]
    pub const fn new(ts: u64) -> Self {
        Timestamp(ts)
    }

    /// Raw value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the zero timestamp
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Timestamp {
    fn from(ts: u64) -> Self {
        Timestamp(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
