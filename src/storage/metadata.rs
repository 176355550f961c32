//! Tree metadata: the root and allocator state persisted at file offset 0.

use crate::error::{Result, StorageError};
use crate::types::PageId;

/// Persisted once at construction and once at destruction (see module docs on
/// [`crate::btree::BPlusTree`]): `rootPageId` and `nextPageId`, zero-padded to
/// fill the rest of the metadata page. No magic bytes, no checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMetadata {
    pub root_page_id: PageId,
    pub next_page_id: PageId,
}

impl TreeMetadata {
    pub const ON_DISK_SIZE: usize = 16;

    pub fn fresh() -> Self {
        Self {
            root_page_id: PageId::new(0),
            next_page_id: PageId::new(1),
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= Self::ON_DISK_SIZE);
        buf[0..8].copy_from_slice(&self.root_page_id.value().to_ne_bytes());
        buf[8..16].copy_from_slice(&self.next_page_id.value().to_ne_bytes());
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::ON_DISK_SIZE {
            return Err(StorageError::corruption(
                "metadata buffer shorter than the on-disk metadata record",
            ));
        }
        let root_page_id = PageId::new(u64::from_ne_bytes(buf[0..8].try_into().unwrap()));
        let next_page_id = PageId::new(u64::from_ne_bytes(buf[8..16].try_into().unwrap()));
        Ok(Self {
            root_page_id,
            next_page_id,
        })
    }
}
