//! Keys and key encodings
//!
//! A `Key` is an immutable byte sequence ordered lexicographically over its
//! raw bytes. Every user-facing encoding (`KeyFormat`) reduces to that byte
//! order once encoded, so the index and the search engine never look at the
//! encoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Ordered byte key
///
/// Ordering is lexicographic over raw bytes, which is what `Vec<u8>`'s
/// derived `Ord` provides.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Key(Vec<u8>);

impl Key {
    /// Create a key from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Key(bytes.into())
    }

    /// The empty key, which sorts before every other key
    pub fn empty() -> Self {
        Key(Vec::new())
    }

    /// Raw key bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the key, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key has no bytes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this key starts with the given byte prefix
    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Key(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Key(bytes)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.as_bytes().to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Key {
    fn from(bytes: &[u8; N]) -> Self {
        Key(bytes.to_vec())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(\"{}\")", self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", std::ascii::escape_default(b))?;
        }
        Ok(())
    }
}

// ============================================================================
// KeyFormat
// ============================================================================

/// How user keys are encoded into index keys
///
/// Parsed from `"raw"`, `"string"` or `"fixed:N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyFormat {
    /// Raw binary bytes, stored as given
    #[default]
    Raw,
    /// Variable-length UTF-8 string
    String,
    /// Fixed-width string, right-padded with NUL bytes
    Fixed(usize),
}

impl KeyFormat {
    /// Encode user bytes into an index key
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if a fixed-width value is wider than the format,
    /// or if a string-format value is not valid UTF-8.
    pub fn encode(&self, raw: &[u8]) -> Result<Key> {
        match self {
            KeyFormat::Raw => Ok(Key::from(raw)),
            KeyFormat::String => {
                std::str::from_utf8(raw)
                    .map_err(|e| Error::InvalidKey(format!("string key is not UTF-8: {}", e)))?;
                Ok(Key::from(raw))
            }
            KeyFormat::Fixed(width) => {
                if raw.len() > *width {
                    return Err(Error::InvalidKey(format!(
                        "key of {} bytes exceeds fixed width {}",
                        raw.len(),
                        width
                    )));
                }
                let mut bytes = Vec::with_capacity(*width);
                bytes.extend_from_slice(raw);
                bytes.resize(*width, 0);
                Ok(Key::new(bytes))
            }
        }
    }

    /// The bytes of `key` that take part in prefix matching
    ///
    /// Fixed-width padding is an encoding artifact and is stripped.
    pub fn search_prefix<'a>(&self, key: &'a Key) -> &'a [u8] {
        match self {
            KeyFormat::Fixed(_) => {
                let bytes = key.as_bytes();
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                &bytes[..end]
            }
            KeyFormat::Raw | KeyFormat::String => key.as_bytes(),
        }
    }
}

impl FromStr for KeyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(KeyFormat::Raw),
            "string" => Ok(KeyFormat::String),
            other => {
                let width = other
                    .strip_prefix("fixed:")
                    .and_then(|w| w.parse::<usize>().ok())
                    .filter(|w| *w > 0)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "Invalid key format '{}'. Expected \"raw\", \"string\" or \"fixed:N\".",
                            other
                        ))
                    })?;
                Ok(KeyFormat::Fixed(width))
            }
        }
    }
}

impl TryFrom<String> for KeyFormat {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<KeyFormat> for String {
    fn from(format: KeyFormat) -> String {
        format.to_string()
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFormat::Raw => write!(f, "raw"),
            KeyFormat::String => write!(f, "string"),
            KeyFormat::Fixed(width) => write!(f, "fixed:{}", width),
        }
    }
}
