//! TieredIndex: resident map plus an evictable reconciled page
//!
//! New commits land in the resident map. `evict()` reconciles the resident
//! map, merged with the current page, into a new page file and releases both
//! the resident entries and the materialized copy of the page. The next read
//! materializes the page from disk again.
//!
//! # Residency transparency
//!
//! Every read goes through the same merge of both tiers, so whether a key is
//! resident, materialized, or only on disk is never visible to callers:
//!
//! - neighbor lookups take the nearer answer of the two tiers
//! - a key present in both tiers has its resident versions stacked on top of
//!   its page chain (resident versions are always strictly newer)
//!
//! # Locking
//!
//! `state` guards the resident map and the current page handle. `materialized`
//! caches the loaded page. Lock order is always `state` then `materialized`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use nearseek_core::{
    CommitTarget, Error, Key, Payload, Result, Timestamp, VersionChain, VersionedIndex,
};

use crate::format::page::find_latest_page;
use crate::reconciled::ReconciledPage;
use crate::resident::ResidentMap;

#[derive(Debug, Clone)]
struct PageHandle {
    generation: u64,
    path: PathBuf,
}

#[derive(Debug, Default)]
struct TierState {
    resident: ResidentMap,
    page: Option<PageHandle>,
}

/// Versioned index that can evict to, and materialize from, disk
#[derive(Debug)]
pub struct TieredIndex {
    dir: PathBuf,
    state: RwLock<TierState>,
    materialized: RwLock<Option<Arc<ReconciledPage>>>,
    max_resident_keys: Option<usize>,
    materializations: AtomicU64,
    evictions: AtomicU64,
}

impl TieredIndex {
    /// Open an index whose pages live in `dir`
    ///
    /// Creates `dir` if needed and picks up the latest existing page without
    /// loading it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let page = find_latest_page(&dir)?
            .map(|(generation, path)| PageHandle { generation, path });
        if let Some(handle) = &page {
            info!(
                target: "nearseek::storage",
                generation = handle.generation,
                "Found reconciled page"
            );
        }
        Ok(TieredIndex {
            dir,
            state: RwLock::new(TierState {
                resident: ResidentMap::new(),
                page,
            }),
            materialized: RwLock::new(None),
            max_resident_keys: None,
            materializations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Evict automatically once more than `limit` keys are resident
    pub fn with_max_resident_keys(mut self, limit: Option<usize>) -> Self {
        self.max_resident_keys = limit;
        self
    }

    /// Directory holding page files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of keys currently resident
    pub fn resident_len(&self) -> usize {
        self.state.read().resident.len()
    }

    /// Generation of the current page, if any
    pub fn generation(&self) -> Option<u64> {
        self.state.read().page.as_ref().map(|h| h.generation)
    }

    /// Path of the current page file, if any
    pub fn page_path(&self) -> Option<PathBuf> {
        self.state.read().page.as_ref().map(|h| h.path.clone())
    }

    /// Whether the current page is loaded in memory
    pub fn is_materialized(&self) -> bool {
        self.materialized.read().is_some()
    }

    /// How many times a page has been loaded from disk
    pub fn materialization_count(&self) -> u64 {
        self.materializations.load(Ordering::Relaxed)
    }

    /// How many evictions wrote a new page
    pub fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Greatest commit timestamp held in either tier
    ///
    /// Materializes the page if there is one.
    pub fn latest_commit(&self) -> Result<Timestamp> {
        self.read(|resident, page| {
            let resident_newest = resident.iter().filter_map(|(_, c)| c.newest_commit());
            let page_newest = page
                .map(|p| p.entries())
                .unwrap_or_default()
                .iter()
                .filter_map(|(_, c)| c.newest_commit());
            Ok(resident_newest
                .chain(page_newest)
                .max()
                .unwrap_or(Timestamp::ZERO))
        })
    }

    /// Drop the materialized page without touching resident data
    pub fn release(&self) {
        self.materialized.write().take();
    }

    /// Reconcile resident keys to a new page and release memory
    ///
    /// Returns the new generation, or `None` if nothing was resident (the
    /// materialized page is still released in that case).
    pub fn evict(&self) -> Result<Option<u64>> {
        let mut state = self.state.write();
        if state.resident.is_empty() {
            self.release();
            return Ok(None);
        }

        let base = match &state.page {
            Some(handle) => Some(self.load_page(handle)?),
            None => None,
        };

        let mut merged: BTreeMap<Key, VersionChain> = base
            .as_deref()
            .map(|page| page.entries().iter().cloned().collect())
            .unwrap_or_default();
        for (key, chain) in state.resident.iter() {
            let combined = match merged.get(key) {
                Some(older) => VersionChain::stack(chain, older)?,
                None => chain.clone(),
            };
            merged.insert(key.clone(), combined);
        }

        let generation = state.page.as_ref().map_or(1, |h| h.generation + 1);
        let page = ReconciledPage::new(generation, merged.into_iter().collect())?;
        let path = page.write_to(&self.dir)?;
        let evicted_keys = state.resident.len();

        let previous = state.page.replace(PageHandle {
            generation,
            path,
        });
        state.resident.take();
        self.release();
        self.evictions.fetch_add(1, Ordering::Relaxed);

        if let Some(old) = previous {
            if let Err(e) = std::fs::remove_file(&old.path) {
                warn!(
                    target: "nearseek::storage",
                    path = %old.path.display(),
                    error = %e,
                    "Failed to remove superseded page"
                );
            }
        }

        info!(
            target: "nearseek::storage",
            generation,
            evicted_keys,
            page_keys = page.len(),
            "Evicted resident keys to reconciled page"
        );
        Ok(Some(generation))
    }

    /// Materialize the page behind `handle`, reusing the cached copy
    fn load_page(&self, handle: &PageHandle) -> Result<Arc<ReconciledPage>> {
        if let Some(page) = self.materialized.read().as_ref() {
            if page.generation() == handle.generation {
                return Ok(Arc::clone(page));
            }
        }

        let mut slot = self.materialized.write();
        if let Some(page) = slot.as_ref() {
            if page.generation() == handle.generation {
                return Ok(Arc::clone(page));
            }
        }

        let page = Arc::new(ReconciledPage::load(&handle.path)?);
        if page.generation() != handle.generation {
            return Err(Error::corruption(format!(
                "page {} records generation {}, expected {}",
                handle.path.display(),
                page.generation(),
                handle.generation
            )));
        }
        self.materializations.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "nearseek::storage",
            generation = handle.generation,
            keys = page.len(),
            "Materialized reconciled page"
        );
        *slot = Some(Arc::clone(&page));
        Ok(page)
    }

    /// Run `f` against both tiers under one consistent view
    fn read<T>(
        &self,
        f: impl FnOnce(&ResidentMap, Option<&ReconciledPage>) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.read();
        let page = match &state.page {
            Some(handle) => Some(self.load_page(handle)?),
            None => None,
        };
        f(&state.resident, page.as_deref())
    }
}

fn nearer_below(a: Option<Key>, b: Option<Key>) -> Option<Key> {
    a.into_iter().chain(b).max()
}

fn nearer_above(a: Option<Key>, b: Option<Key>) -> Option<Key> {
    a.into_iter().chain(b).min()
}

impl VersionedIndex for TieredIndex {
    fn floor(&self, key: &Key) -> Result<Option<Key>> {
        self.read(|resident, page| {
            Ok(nearer_below(
                resident.floor(key),
                page.and_then(|p| p.floor(key)),
            ))
        })
    }

    fn ceiling(&self, key: &Key) -> Result<Option<Key>> {
        self.read(|resident, page| {
            Ok(nearer_above(
                resident.ceiling(key),
                page.and_then(|p| p.ceiling(key)),
            ))
        })
    }

    fn predecessor(&self, key: &Key) -> Result<Option<Key>> {
        self.read(|resident, page| {
            Ok(nearer_below(
                resident.predecessor(key),
                page.and_then(|p| p.predecessor(key)),
            ))
        })
    }

    fn successor(&self, key: &Key) -> Result<Option<Key>> {
        self.read(|resident, page| {
            Ok(nearer_above(
                resident.successor(key),
                page.and_then(|p| p.successor(key)),
            ))
        })
    }

    fn version_chain(&self, key: &Key) -> Result<Option<VersionChain>> {
        self.read(|resident, page| {
            match (resident.chain(key), page.and_then(|p| p.chain(key))) {
                (Some(newer), Some(older)) => Ok(Some(VersionChain::stack(&newer, &older)?)),
                (Some(chain), None) | (None, Some(chain)) => Ok(Some(chain)),
                (None, None) => Ok(None),
            }
        })
    }
}

impl CommitTarget for TieredIndex {
    fn commit(&self, writes: &[(Key, Payload)], commit_ts: Timestamp) -> Result<()> {
        let over_limit = {
            let mut state = self.state.write();

            // Keys that are only on the page must still be older than commit_ts.
            if let Some(handle) = state.page.clone() {
                let page = self.load_page(&handle)?;
                for (key, _) in writes {
                    if state.resident.contains(key) {
                        continue;
                    }
                    if let Some(newest) = page.newest_commit(key) {
                        if commit_ts <= newest {
                            return Err(Error::InvalidOperation(format!(
                                "commit timestamp {} for key {} is not newer than reconciled version at {}",
                                commit_ts, key, newest
                            )));
                        }
                    }
                }
            }

            state.resident.apply(writes, commit_ts)?;
            debug!(
                target: "nearseek::storage",
                commit_ts = commit_ts.as_u64(),
                writes = writes.len(),
                resident = state.resident.len(),
                "Applied write set to tiered index"
            );
            self.max_resident_keys
                .map_or(false, |limit| state.resident.len() > limit)
        };

        // The write set is already applied; a failed eviction leaves it resident.
        if over_limit {
            if let Err(e) = self.evict() {
                warn!(
                    target: "nearseek::storage",
                    commit_ts = commit_ts.as_u64(),
                    error = %e,
                    "Automatic eviction failed, keys stay resident"
                );
            }
        }
        Ok(())
    }
}
