//! Database struct and open logic
//!
//! This module provides the main Database struct that wires together:
//! - Configuration (`nearseek.toml`, written with defaults on first open)
//! - A `TieredIndex` over the data directory's page files
//! - A `TransactionManager` seeded with the newest commit on disk
//!
//! ## Usage
//!
//! ```text
//! let db = Database::open(dir)?;
//! let mut txn = db.begin_write();
//! txn.put("aaz", "v")?;
//! db.commit(&mut txn, Timestamp::new(50))?;
//!
//! let read = db.begin_read(Some(Timestamp::new(100)));
//! let mut cursor = db.open_cursor(&read);
//! cursor.set_key("az")?;
//! cursor.search_near()?;   // Smaller("aaz")
//! ```

pub mod config;

pub use config::{EngineConfig, CONFIG_FILE_NAME};

use std::path::{Path, PathBuf};

use nearseek_concurrency::{ReadTransaction, TransactionManager, WriteTransaction};
use nearseek_core::{Result, Timestamp};
use nearseek_storage::TieredIndex;
use tracing::info;

use crate::cursor::{Cursor, CursorConfig};

/// Subdirectory holding reconciled page files.
pub const PAGES_DIR: &str = "pages";

/// A nearseek database rooted at a data directory
pub struct Database {
    data_dir: PathBuf,
    config: EngineConfig,
    index: TieredIndex,
    txn_manager: TransactionManager,
}

impl Database {
    /// Open (or create) the database at `path`
    ///
    /// # Errors
    ///
    /// - `Config` if `nearseek.toml` cannot be read, written or parsed
    /// - `StorageFault` if the directory or the latest page cannot be read
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        EngineConfig::write_default_if_missing(&config_path)?;
        let config = EngineConfig::from_file(&config_path)?;

        Self::open_with_config(data_dir, config)
    }

    /// Open the database at `path` with an explicit config, ignoring
    /// `nearseek.toml`
    ///
    /// # Errors
    ///
    /// - `Config` if `config` fails validation
    /// - `StorageFault` if the directory or the latest page cannot be read
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let data_dir = path.as_ref().to_path_buf();

        let index = TieredIndex::open(data_dir.join(PAGES_DIR))?
            .with_max_resident_keys(config.max_resident_keys);
        let last_commit = index.latest_commit()?;
        // Page stays on disk until the first read.
        index.release();

        info!(
            target: "nearseek::db",
            path = ?data_dir,
            generation = ?index.generation(),
            last_commit = last_commit.as_u64(),
            max_resident_keys = ?config.max_resident_keys,
            "Database opened"
        );

        Ok(Database {
            data_dir,
            config,
            index,
            txn_manager: TransactionManager::new(last_commit),
        })
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying index
    pub fn index(&self) -> &TieredIndex {
        &self.index
    }

    /// Greatest commit timestamp applied so far
    pub fn last_commit(&self) -> Timestamp {
        self.txn_manager.last_commit()
    }

    /// Start a write transaction
    pub fn begin_write(&self) -> WriteTransaction {
        self.txn_manager.begin_write()
    }

    /// Commit `txn` at `commit_ts`
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` for a zero or out-of-order commit timestamp, or
    ///   a transaction that is no longer active
    /// - `StorageFault` if the current page cannot be read
    ///
    /// A failed automatic eviction does not fail the commit; the keys stay
    /// resident until the next eviction.
    pub fn commit(&self, txn: &mut WriteTransaction, commit_ts: Timestamp) -> Result<()> {
        self.txn_manager.commit(txn, &self.index, commit_ts)
    }

    /// Start a read transaction at `read_ts`, or at the latest commit
    pub fn begin_read(&self, read_ts: Option<Timestamp>) -> ReadTransaction {
        self.txn_manager.begin_read(read_ts)
    }

    /// Cursor with the configured defaults
    pub fn open_cursor(&self, txn: &ReadTransaction) -> Cursor<'_> {
        Cursor::new(&self.index, txn, self.config.cursor)
    }

    /// Cursor with explicit settings
    pub fn open_cursor_with(&self, txn: &ReadTransaction, config: CursorConfig) -> Cursor<'_> {
        Cursor::new(&self.index, txn, config)
    }

    /// Reconcile resident keys to a new page and release memory
    ///
    /// Returns the new page generation, or `None` if nothing was resident.
    ///
    /// # Errors
    ///
    /// `StorageFault` if the page cannot be written.
    pub fn evict(&self) -> Result<Option<u64>> {
        self.index.evict()
    }
}
