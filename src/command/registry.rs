use std::collections::HashMap;
use std::path::PathBuf;

use log::debug;

use crate::error::Result;
use crate::{Config, Tree};

/// Maps table name to an open [`Tree`], rooted at one data directory.
///
/// This is the only piece of global, process-lifetime state in the crate;
/// the hard core (pager/cache/manager/tree) carries none of its own.
pub struct Registry {
    data_dir: PathBuf,
    cache_capacity: usize,
    trees: HashMap<String, Tree>,
}

impl Registry {
    pub fn new(data_dir: PathBuf, cache_capacity: usize) -> Self {
        Self {
            data_dir,
            cache_capacity,
            trees: HashMap::new(),
        }
    }

    fn path_for(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.tree"))
    }

    /// Return the open tree for `table`, opening (and creating, if absent)
    /// its backing file first if it isn't already open.
    pub fn get_or_open(&mut self, table: &str) -> Result<&mut Tree> {
        if !self.trees.contains_key(table) {
            debug!("opening table {table}");
            let config = Config::new(self.path_for(table)).cache_capacity(self.cache_capacity);
            let tree = Tree::open(config)?;
            self.trees.insert(table.to_string(), tree);
        }
        Ok(self.trees.get_mut(table).expect("just inserted"))
    }

    /// Close and remove `table`, then delete its backing file.
    pub fn destroy(&mut self, table: &str) -> Result<()> {
        self.get_or_open(table)?;
        if let Some(tree) = self.trees.remove(table) {
            tree.close()?;
        }
        let path = self.path_for(table);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Close every open table, flushing their contents.
    pub fn close_all(&mut self) -> Result<()> {
        for (_, tree) in self.trees.drain() {
            tree.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn get_or_open_creates_the_backing_file_once() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().to_path_buf(), 16);
        registry.get_or_open("t").unwrap().insert(5).unwrap();
        assert!(registry.get_or_open("t").unwrap().search(5).unwrap());
    }

    #[test]
    fn destroy_removes_the_file() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().to_path_buf(), 16);
        registry.get_or_open("t").unwrap().insert(1).unwrap();
        let path = dir.path().join("t.tree");
        assert!(path.exists());
        registry.destroy("t").unwrap();
        assert!(!path.exists());
    }
}
