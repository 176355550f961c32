//! Bit-exact page-granular I/O against a single tree file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, error, trace};

use crate::error::Result;
use crate::page::Node;
use crate::storage::TreeMetadata;
use crate::types::{PageId, PAGE_SIZE};

/// Owns the file handle for one tree and translates `pageId <-> page bytes`.
///
/// Byte offset `0` is reserved for [`TreeMetadata`]; node page `pageId` lives
/// at offset `PAGE_SIZE * (pageId + 1)` (see [`PageId::file_offset`]).
pub struct Pager {
    file: File,
}

impl Pager {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| {
                error!("failed to open tree file {:?}: {e}", path);
                e
            })?;
        Ok(Self { file })
    }

    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Guarantee the file is at least `(page_id + 2) * PAGE_SIZE` bytes long,
    /// extending with zero-byte chunks. Idempotent.
    pub fn ensure_page_exists(&mut self, page_id: PageId) -> Result<()> {
        let required = (page_id.value() + 2) * PAGE_SIZE as u64;
        let current = self.file_size()?;
        if current >= required {
            return Ok(());
        }
        debug!(
            "extending tree file from {current} to {required} bytes for page {page_id}"
        );
        self.file.seek(SeekFrom::End(0))?;
        let zeros = vec![0u8; PAGE_SIZE];
        let mut remaining = required - current;
        while remaining > 0 {
            let chunk = remaining.min(PAGE_SIZE as u64) as usize;
            self.file.write_all(&zeros[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    pub fn read_page(&mut self, page_id: PageId) -> Result<Node> {
        self.ensure_page_exists(page_id)?;
        let offset = page_id.file_offset(PAGE_SIZE);
        let mut buf = vec![0u8; PAGE_SIZE];
        if self.file.seek(SeekFrom::Start(offset)).is_ok() {
            let _ = self.file.read_exact(&mut buf);
        }
        trace!("read page {page_id} at offset {offset}");
        Node::decode(&buf)
    }

    pub fn write_page(&mut self, page_id: PageId, node: &Node) -> Result<()> {
        self.ensure_page_exists(page_id)?;
        let offset = page_id.file_offset(PAGE_SIZE);
        let mut buf = vec![0u8; PAGE_SIZE];
        node.encode(&mut buf);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&buf)?;
        self.file.flush()?;
        trace!("wrote page {page_id} at offset {offset}");
        Ok(())
    }

    pub fn read_metadata(&mut self) -> Result<TreeMetadata> {
        if self.file_size()? < TreeMetadata::ON_DISK_SIZE as u64 {
            return Ok(TreeMetadata::fresh());
        }
        let mut buf = vec![0u8; TreeMetadata::ON_DISK_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf)?;
        TreeMetadata::decode(&buf)
    }

    pub fn write_metadata(&mut self, metadata: &TreeMetadata) -> Result<()> {
        if self.file_size()? < PAGE_SIZE as u64 {
            self.file.set_len(PAGE_SIZE as u64)?;
        }
        let mut buf = vec![0u8; PAGE_SIZE];
        metadata.encode(&mut buf);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&buf[..PAGE_SIZE])?;
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if let Err(e) = self.file.sync_all() {
            error!("failed to flush tree file on close: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reading_an_unwritten_page_yields_an_empty_leaf() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(&dir.path().join("t.tree")).unwrap();
        let node = pager.read_page(PageId::new(5)).unwrap();
        assert!(node.is_leaf);
        assert_eq!(node.key_count, 0);
    }

    #[test]
    fn writes_round_trip() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(&dir.path().join("t.tree")).unwrap();
        let mut node = Node::new_leaf();
        node.insert_leaf_key(10);
        node.insert_leaf_key(20);
        pager.write_page(PageId::new(0), &node).unwrap();
        let read_back = pager.read_page(PageId::new(0)).unwrap();
        assert_eq!(read_back, node);
    }

    #[test]
    fn metadata_round_trips() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(&dir.path().join("t.tree")).unwrap();
        let meta = TreeMetadata {
            root_page_id: PageId::new(3),
            next_page_id: PageId::new(9),
        };
        pager.write_metadata(&meta).unwrap();
        assert_eq!(pager.read_metadata().unwrap(), meta);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("t.tree");
        let pager = Pager::open(&nested).unwrap();
        assert!(nested.exists());
        drop(pager);
    }
}
