use std::path::Path;

use log::trace;

use crate::cache::NodeCache;
use crate::error::Result;
use crate::page::Node;
use crate::storage::{Pager, TreeMetadata};
use crate::types::PageId;

/// Sole access path to nodes for [`crate::btree::BPlusTree`].
///
/// Every read and write copies a node image in or out — callers never receive
/// a reference that aliases a cache-owned entry, and the cache never receives
/// a reference it doesn't own. This value-semantics discipline is what rules
/// out the aliasing hazards that come from holding a pointer into a cache
/// entry while the cache concurrently evicts it.
pub struct NodeManager {
    pager: Pager,
    cache: NodeCache,
}

impl NodeManager {
    pub fn open(path: &Path, cache_capacity: usize) -> Result<Self> {
        Ok(Self {
            pager: Pager::open(path)?,
            cache: NodeCache::new(cache_capacity),
        })
    }

    pub fn file_size(&self) -> Result<u64> {
        self.pager.file_size()
    }

    pub fn read_metadata(&mut self) -> Result<TreeMetadata> {
        self.pager.read_metadata()
    }

    pub fn write_metadata(&mut self, metadata: &TreeMetadata) -> Result<()> {
        self.pager.write_metadata(metadata)
    }

    /// Fetch a copy of the node at `page_id`, faulting it in from the Pager on
    /// a cache miss.
    pub fn get_node(&mut self, page_id: PageId) -> Result<Node> {
        if let Some(node) = self.cache.get(page_id) {
            trace!("cache hit for page {page_id}");
            return Ok(node);
        }
        trace!("cache miss for page {page_id}, reading through pager");
        let node = self.pager.read_page(page_id)?;
        self.install(page_id, node)?;
        Ok(node)
    }

    /// Install a copy of `node` under `page_id`, promoting it to MRU.
    pub fn put_node(&mut self, page_id: PageId, node: Node) -> Result<()> {
        self.install(page_id, node)
    }

    fn install(&mut self, page_id: PageId, node: Node) -> Result<()> {
        if let Some((victim_id, victim_node)) = self.cache.put(page_id, node) {
            trace!("evicting page {victim_id} to make room for {page_id}");
            self.pager.write_page(victim_id, &victim_node)?;
        }
        Ok(())
    }

    /// Write every resident cache entry through the Pager. Called on teardown.
    pub fn flush(&mut self) -> Result<()> {
        let mut dirty = Vec::new();
        self.cache.traverse(|page_id, node| dirty.push((page_id, *node)));
        for (page_id, node) in dirty {
            self.pager.write_page(page_id, &node)?;
        }
        Ok(())
    }
}

impl Drop for NodeManager {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("failed to flush node cache on close: {e}");
        }
    }
}
