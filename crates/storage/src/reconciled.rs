//! ReconciledPage: read-only, sorted representation of evicted keys
//!
//! A page is the immutable result of reconciling resident data. Lookups are
//! binary searches over a sorted array, so every neighbor operation stays
//! O(log n) just like the resident `BTreeMap`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use nearseek_core::{Error, Key, Result, Timestamp, VersionChain, VersionedIndex};

use crate::format::page::{decode_page, encode_page, page_path};

/// Immutable sorted page of version chains
#[derive(Debug, Clone)]
pub struct ReconciledPage {
    generation: u64,
    entries: Vec<(Key, VersionChain)>,
}

impl ReconciledPage {
    /// Build a page from entries
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if keys are not strictly increasing or a
    /// chain is empty.
    pub fn new(generation: u64, entries: Vec<(Key, VersionChain)>) -> Result<Self> {
        for pair in entries.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(Error::InvalidOperation(format!(
                    "page entries out of order: {} then {}",
                    pair[0].0, pair[1].0
                )));
            }
        }
        if let Some((key, _)) = entries.iter().find(|(_, chain)| chain.is_empty()) {
            return Err(Error::InvalidOperation(format!(
                "page entry {} has an empty version chain",
                key
            )));
        }
        Ok(ReconciledPage {
            generation,
            entries,
        })
    }

    /// Page generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the page holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn entries(&self) -> &[(Key, VersionChain)] {
        &self.entries
    }

    /// Newest commit timestamp recorded for `key`
    pub fn newest_commit(&self, key: &Key) -> Option<Timestamp> {
        self.lookup(key).and_then(|chain| chain.newest_commit())
    }

    fn lookup(&self, key: &Key) -> Option<&VersionChain> {
        self.entries
            .binary_search_by(|(k, _)| k.cmp(key))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Index of the first entry with key `>= key`
    fn lower_index(&self, key: &Key) -> usize {
        self.entries.partition_point(|(k, _)| k < key)
    }

    /// Index of the first entry with key `> key`
    fn upper_index(&self, key: &Key) -> usize {
        self.entries.partition_point(|(k, _)| k <= key)
    }

    fn key_at(&self, idx: usize) -> Option<Key> {
        self.entries.get(idx).map(|(k, _)| k.clone())
    }

    /// Greatest key `<= key`
    pub fn floor(&self, key: &Key) -> Option<Key> {
        self.upper_index(key)
            .checked_sub(1)
            .and_then(|idx| self.key_at(idx))
    }

    /// Least key `>= key`
    pub fn ceiling(&self, key: &Key) -> Option<Key> {
        self.key_at(self.lower_index(key))
    }

    /// Greatest key `< key`
    pub fn predecessor(&self, key: &Key) -> Option<Key> {
        self.lower_index(key)
            .checked_sub(1)
            .and_then(|idx| self.key_at(idx))
    }

    /// Least key `> key`
    pub fn successor(&self, key: &Key) -> Option<Key> {
        self.key_at(self.upper_index(key))
    }

    /// Chain for `key`
    pub fn chain(&self, key: &Key) -> Option<VersionChain> {
        self.lookup(key).cloned()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the page into `dir` and return its path
    ///
    /// The image is written to a temporary file, synced, and renamed into
    /// place, so a reader never sees a half-written page.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let image = encode_page(self.generation, &self.entries)?;
        let path = page_path(dir, self.generation);
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&image)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(
            target: "nearseek::storage",
            generation = self.generation,
            keys = self.entries.len(),
            bytes = image.len(),
            "Wrote reconciled page"
        );
        Ok(path)
    }

    /// Load and verify a page from disk
    ///
    /// This is the blocking materialization step. Any read or verification
    /// failure is returned as a storage fault.
    pub fn load(path: &Path) -> Result<Self> {
        let image = fs::read(path)?;
        let (header, entries) = decode_page(&image).map_err(|e| {
            warn!(
                target: "nearseek::storage",
                path = %path.display(),
                error = %e,
                "Rejected reconciled page"
            );
            e
        })?;
        Ok(ReconciledPage {
            generation: header.generation,
            entries,
        })
    }
}

impl VersionedIndex for ReconciledPage {
    fn floor(&self, key: &Key) -> Result<Option<Key>> {
        Ok(ReconciledPage::floor(self, key))
    }

    fn ceiling(&self, key: &Key) -> Result<Option<Key>> {
        Ok(ReconciledPage::ceiling(self, key))
    }

    fn predecessor(&self, key: &Key) -> Result<Option<Key>> {
        Ok(ReconciledPage::predecessor(self, key))
    }

    fn successor(&self, key: &Key) -> Result<Option<Key>> {
        Ok(ReconciledPage::successor(self, key))
    }

    fn version_chain(&self, key: &Key) -> Result<Option<VersionChain>> {
        Ok(self.chain(key))
    }
}
