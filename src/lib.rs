//! # B+ Table Store
//!
//! A disk-backed B+ tree index store and a small table command language
//! built on top of it.
//!
//! ## Architecture
//!
//! - **Page Layer** (`page`): fixed-size node layout, manual byte encoding.
//! - **Storage Layer** (`storage`): page-granular disk I/O and tree metadata.
//! - **Cache Layer** (`cache`): bounded LRU map from page id to node image.
//! - **Manager Layer** (`manager`): the sole path from the tree down to the
//!   cache and pager, copying nodes in and out rather than handing out
//!   references into cache-owned storage.
//! - **B+ Tree Layer** (`btree`): search, insert, and erase over nodes
//!   obtained exclusively through the manager.
//! - **Command Layer** (`command`): a line-oriented table command language
//!   (CREATE/INSERT/ERASE/QUERY/DESTROY TABLE) driving a registry of open
//!   trees.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bplus_table_store::{Config, Tree};
//!
//! let config = Config::new("my_table.tree");
//! let mut tree = Tree::open(config)?;
//!
//! tree.insert(42)?;
//! assert!(tree.search(42)?);
//! tree.erase(42)?;
//!
//! tree.close()?;
//! ```

pub mod btree;
pub mod cache;
pub mod command;
pub mod error;
pub mod manager;
pub mod page;
pub mod storage;
pub mod types;

pub use error::{Result, StorageError};
pub use types::{PageId, DEFAULT_CACHE_CAPACITY, MAX_KEYS, MIN_KEYS, PAGE_SIZE};

use std::path::PathBuf;

use btree::BPlusTree;

/// Configuration for opening a tree.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the tree's backing file.
    pub path: PathBuf,
    /// Number of node images the cache keeps resident.
    pub cache_capacity: usize,
}

impl Config {
    /// Create a new configuration with the default cache capacity.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Override the cache capacity.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// A single open table: a B+ tree index over integer keys.
///
/// This is the primary public interface for the storage engine; the
/// command layer is built entirely on top of it.
pub struct Tree {
    inner: BPlusTree,
}

impl Tree {
    /// Open or create the tree described by `config`.
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self {
            inner: BPlusTree::open(&config.path, config.cache_capacity)?,
        })
    }

    /// Insert `key`. Returns `false` if `key` was already present (a no-op).
    pub fn insert(&mut self, key: i32) -> Result<bool> {
        self.inner.insert(key)
    }

    /// Returns `true` if `key` is present.
    pub fn search(&mut self, key: i32) -> Result<bool> {
        self.inner.search(key)
    }

    /// Remove `key`. Returns `false` if `key` was not present.
    pub fn erase(&mut self, key: i32) -> Result<bool> {
        self.inner.erase(key)
    }

    /// Flush cache contents and metadata, consuming the tree.
    pub fn close(self) -> Result<()> {
        self.inner.close()
    }
}
