//! Resident key map
//!
//! `BTreeMap<Key, VersionChain>` with the neighbor lookups the search engine
//! needs and the validated commit path. Not thread safe on its own; the
//! indexes wrap it in a `parking_lot::RwLock`.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use nearseek_core::{Error, Key, Payload, Result, Timestamp, Version, VersionChain};

/// Ordered map from key to version chain
#[derive(Debug, Default, Clone)]
pub struct ResidentMap {
    data: BTreeMap<Key, VersionChain>,
}

impl ResidentMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the map holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `key` has a chain here
    pub fn contains(&self, key: &Key) -> bool {
        self.data.contains_key(key)
    }

    /// Greatest key `<= key`
    pub fn floor(&self, key: &Key) -> Option<Key> {
        self.data.range(..=key).next_back().map(|(k, _)| k.clone())
    }

    /// Least key `>= key`
    pub fn ceiling(&self, key: &Key) -> Option<Key> {
        self.data.range(key..).next().map(|(k, _)| k.clone())
    }

    /// Greatest key `< key`
    pub fn predecessor(&self, key: &Key) -> Option<Key> {
        self.data.range(..key).next_back().map(|(k, _)| k.clone())
    }

    /// Least key `> key`
    pub fn successor(&self, key: &Key) -> Option<Key> {
        self.data
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    /// Chain for `key` (an `Arc` clone of its head)
    pub fn chain(&self, key: &Key) -> Option<VersionChain> {
        self.data.get(key).cloned()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &VersionChain)> {
        self.data.iter()
    }

    /// Check that `writes` can be applied at `commit_ts`
    ///
    /// Rejects duplicate keys and any key whose resident newest version is
    /// not strictly older than `commit_ts`.
    pub fn validate(&self, writes: &[(Key, Payload)], commit_ts: Timestamp) -> Result<()> {
        if commit_ts.is_zero() {
            return Err(Error::InvalidOperation(
                "commit timestamp must be non-zero".to_string(),
            ));
        }
        let distinct: BTreeSet<&Key> = writes.iter().map(|(k, _)| k).collect();
        if distinct.len() != writes.len() {
            return Err(Error::InvalidOperation(
                "write set contains duplicate keys".to_string(),
            ));
        }
        for (key, _) in writes {
            if let Some(newest) = self.data.get(key).and_then(|c| c.newest_commit()) {
                if commit_ts <= newest {
                    return Err(Error::InvalidOperation(format!(
                        "commit timestamp {} for key {} is not newer than existing version at {}",
                        commit_ts, key, newest
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate and apply `writes` at `commit_ts`
    ///
    /// Either every write lands or none does.
    pub fn apply(&mut self, writes: &[(Key, Payload)], commit_ts: Timestamp) -> Result<()> {
        self.validate(writes, commit_ts)?;
        for (key, payload) in writes {
            let version = Version::new(commit_ts, payload.clone());
            let chain = match self.data.get(key) {
                Some(existing) => existing.prepend(version)?,
                None => VersionChain::new(version),
            };
            self.data.insert(key.clone(), chain);
        }
        Ok(())
    }

    /// Remove and return every entry, leaving the map empty
    pub fn take(&mut self) -> BTreeMap<Key, VersionChain> {
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(keys: &[&str], ts: u64) -> ResidentMap {
        let mut map = ResidentMap::new();
        let writes: Vec<_> = keys
            .iter()
            .map(|k| (Key::from(*k), Payload::from(*k)))
            .collect();
        map.apply(&writes, Timestamp::new(ts)).unwrap();
        map
    }

    #[test]
    fn test_neighbor_lookups() {
        let map = map_with(&["b", "d", "f"], 10);
        let k = |s: &str| Some(Key::from(s));

        assert_eq!(map.floor(&Key::from("d")), k("d"));
        assert_eq!(map.floor(&Key::from("c")), k("b"));
        assert_eq!(map.floor(&Key::from("a")), None);

        assert_eq!(map.ceiling(&Key::from("d")), k("d"));
        assert_eq!(map.ceiling(&Key::from("e")), k("f"));
        assert_eq!(map.ceiling(&Key::from("g")), None);

        assert_eq!(map.predecessor(&Key::from("d")), k("b"));
        assert_eq!(map.predecessor(&Key::from("b")), None);

        assert_eq!(map.successor(&Key::from("d")), k("f"));
        assert_eq!(map.successor(&Key::from("f")), None);
    }

    #[test]
    fn test_apply_prepends_versions() {
        let mut map = map_with(&["a"], 10);
        map.apply(&[(Key::from("a"), Payload::Tombstone)], Timestamp::new(20))
            .unwrap();
        let chain = map.chain(&Key::from("a")).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain.newest().unwrap().payload.is_tombstone());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut map = map_with(&["b"], 100);
        let writes = vec![
            (Key::from("a"), Payload::from("a")),
            (Key::from("b"), Payload::from("b")),
        ];
        let err = map.apply(&writes, Timestamp::new(50)).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert!(!map.contains(&Key::from("a")));
        assert_eq!(map.chain(&Key::from("b")).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_rejects_duplicates_and_zero() {
        let mut map = ResidentMap::new();
        let dup = vec![
            (Key::from("a"), Payload::from("1")),
            (Key::from("a"), Payload::from("2")),
        ];
        assert!(map.apply(&dup, Timestamp::new(5)).is_err());
        assert!(map
            .apply(&[(Key::from("a"), Payload::from("1"))], Timestamp::ZERO)
            .is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn test_take_empties_map() {
        let mut map = map_with(&["a", "b"], 1);
        let taken = map.take();
        assert_eq!(taken.len(), 2);
        assert!(map.is_empty());
    }
}
