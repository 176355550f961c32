use std::collections::HashMap;

use super::lru::LruList;
use crate::page::Node;
use crate::types::PageId;

/// Bounded LRU map from page id to an owned node image.
///
/// The cache never talks to the Pager itself — no reverse edge from the cache
/// up to disk I/O. When [`NodeCache::put`] would exceed capacity, it evicts
/// the current LRU entry and hands it back to the caller (the
/// [`crate::manager::NodeManager`]), whose job it is to write that entry
/// through the Pager before the call returns.
pub struct NodeCache {
    capacity: usize,
    entries: HashMap<PageId, Node>,
    order: LruList,
}

impl NodeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::with_capacity(capacity),
            order: LruList::new(capacity),
        }
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.entries.contains_key(&page_id)
    }

    pub fn get(&mut self, page_id: PageId) -> Option<Node> {
        let node = *self.entries.get(&page_id)?;
        self.order.touch(page_id);
        Some(node)
    }

    /// Install `node` under `page_id`, evicting the LRU entry first if this
    /// insertion would otherwise exceed capacity. Returns the evicted
    /// `(page_id, node)` pair, if any, for the caller to write back.
    pub fn put(&mut self, page_id: PageId, node: Node) -> Option<(PageId, Node)> {
        let is_new = !self.entries.contains_key(&page_id);
        let evicted = if is_new && self.entries.len() >= self.capacity {
            self.order.pop_tail().and_then(|victim_id| {
                self.entries
                    .remove(&victim_id)
                    .map(|victim_node| (victim_id, victim_node))
            })
        } else {
            None
        };
        self.entries.insert(page_id, node);
        self.order.touch(page_id);
        evicted
    }

    /// Inspect (without removing) the current least-recently-used entry.
    pub fn tail(&self) -> Option<(PageId, Node)> {
        let page_id = self.order.tail()?;
        self.entries.get(&page_id).map(|node| (page_id, *node))
    }

    /// Iterate every resident `(page_id, node)` pair in unspecified order.
    pub fn traverse(&self, mut f: impl FnMut(PageId, &Node)) {
        for (page_id, node) in self.entries.iter() {
            f(*page_id, node);
        }
    }
}
