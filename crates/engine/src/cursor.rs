//! Search cursors
//!
//! A `Cursor` binds an index, the snapshot of a read transaction and a
//! `CursorConfig`. Keys are set in user form and encoded with the cursor's
//! `KeyFormat`; `search_near` positions the cursor on the closest visible
//! key.
//!
//! Configuration strings are comma separated `name=value` pairs:
//!
//! ```text
//! prefix_key=true,key_format=fixed:8
//! ```
//!
//! Only `prefix_key` can be changed on an open cursor; it takes effect on
//! the next `search_near`.

use nearseek_concurrency::{resolve, ReadTransaction, Snapshot};
use nearseek_core::{Error, Key, KeyFormat, Result, VersionedIndex};
use serde::{Deserialize, Serialize};

use crate::prefix::PrefixBound;
use crate::search::{NearSearch, SearchResult};

/// Per-cursor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorConfig {
    /// Restrict `search_near` results to keys prefixed by the search key
    #[serde(default)]
    pub prefix_key: bool,
    /// Encoding of user keys
    #[serde(default)]
    pub key_format: KeyFormat,
}

impl CursorConfig {
    /// Defaults overridden by a configuration string
    ///
    /// # Errors
    ///
    /// `Config` on an unknown setting or an unparsable value.
    pub fn parse(config: &str) -> Result<Self> {
        let mut parsed = CursorConfig::default();
        for (name, value) in settings(config)? {
            match name {
                "prefix_key" => parsed.prefix_key = parse_bool(name, value)?,
                "key_format" => parsed.key_format = value.parse()?,
                other => {
                    return Err(Error::Config(format!(
                        "unknown cursor setting '{}'",
                        other
                    )))
                }
            }
        }
        Ok(parsed)
    }
}

fn settings(config: &str) -> Result<Vec<(&str, &str)>> {
    config
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|setting| {
            setting
                .split_once('=')
                .map(|(n, v)| (n.trim(), v.trim()))
                .ok_or_else(|| Error::Config(format!("expected name=value, got '{}'", setting)))
        })
        .collect()
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

/// Near-match cursor over a snapshot
pub struct Cursor<'a> {
    index: &'a dyn VersionedIndex,
    snapshot: Snapshot,
    config: CursorConfig,
    key: Option<Key>,
    positioned: Option<Key>,
}

impl<'a> Cursor<'a> {
    /// Cursor reading `index` through `txn`'s snapshot
    pub fn new(index: &'a dyn VersionedIndex, txn: &ReadTransaction, config: CursorConfig) -> Self {
        Cursor {
            index,
            snapshot: txn.snapshot(),
            config,
            key: None,
            positioned: None,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    /// Snapshot this cursor reads through
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    /// Set the search key
    ///
    /// # Errors
    ///
    /// `InvalidKey` if `key` does not fit the cursor's key format.
    pub fn set_key(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        let encoded = self.config.key_format.encode(key.as_ref())?;
        self.key = Some(encoded);
        self.positioned = None;
        Ok(())
    }

    /// Position on the visible key closest to the search key
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if no key is set
    /// - `StorageFault` from the index, unchanged
    pub fn search_near(&mut self) -> Result<SearchResult> {
        let target = self
            .key
            .as_ref()
            .ok_or_else(|| Error::InvalidOperation("search_near requires a key".to_string()))?;

        let bound = if self.config.prefix_key {
            PrefixBound::bounds(self.config.key_format.search_prefix(target), true)
        } else {
            PrefixBound::unbounded()
        };

        let mut engine = NearSearch::new(self.index, self.snapshot);
        let result = engine.search_near_within(target, &bound)?;
        self.positioned = result.key().cloned();
        Ok(result)
    }

    /// Key the cursor is positioned on
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the last search found nothing or none ran.
    pub fn get_key(&self) -> Result<&Key> {
        self.positioned
            .as_ref()
            .ok_or_else(|| Error::InvalidOperation("cursor is not positioned".to_string()))
    }

    /// Visible value of the positioned key
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the cursor is not positioned
    /// - `StorageFault` from the index, unchanged
    pub fn get_value(&self) -> Result<Vec<u8>> {
        let key = self.get_key()?;
        let chain = self.index.version_chain(key)?;
        chain
            .as_ref()
            .and_then(|c| resolve(c, &self.snapshot).value().map(<[u8]>::to_vec))
            .ok_or_else(|| Error::InvalidOperation(format!("{} is not visible", key)))
    }

    /// Clear the search key and position
    pub fn reset(&mut self) {
        self.key = None;
        self.positioned = None;
    }

    /// Change settings of an open cursor
    ///
    /// Accepts `prefix_key=true|false`. Takes effect on the next search.
    ///
    /// # Errors
    ///
    /// `Config` for anything else or an unparsable value.
    pub fn reconfigure(&mut self, config: &str) -> Result<()> {
        let mut prefix_key = self.config.prefix_key;
        for (name, value) in settings(config)? {
            match name {
                "prefix_key" => prefix_key = parse_bool(name, value)?,
                other => {
                    return Err(Error::Config(format!(
                        "'{}' cannot be changed on an open cursor",
                        other
                    )))
                }
            }
        }
        self.config.prefix_key = prefix_key;
        Ok(())
    }
}
