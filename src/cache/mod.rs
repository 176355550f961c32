//! Bounded, write-back cache of node images sitting between the tree and the Pager.

mod lru;
mod node_cache;

pub use node_cache::NodeCache;
