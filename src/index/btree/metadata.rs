//! Tree-wide metadata and the on-disk header record.

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;
use crate::types::KeyType;

/// Identifies an index header written by this crate.
const HEADER_MAGIC: &[u8; 4] = b"BPT1";

/// Everything every node needs to reach its neighbours.
///
/// The order and key type are fixed at construction. The root page is the
/// only field that changes, and only through `&mut self`, so nodes share a
/// plain `&BPlusTreeMetadata`.
///
/// # Header record (page 0, after the page type byte)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     magic "BPT1"
/// 4       4     order (u32)
/// 8       1     key type tag
/// 9       4     key width in bytes (u32)
/// 13      4     root page (u32)
/// ```
pub struct BPlusTreeMetadata {
    disk: Mutex<DiskManager>,
    key_type: KeyType,
    order: usize,
    root: PageId,
}

impl BPlusTreeMetadata {
    const HEADER_RECORD_SIZE: usize = 17;

    /// Wrap a disk manager for a tree of the given key type and order.
    ///
    /// The root starts out as [`PageId::INVALID`] until the caller installs
    /// one with [`BPlusTreeMetadata::set_root`].
    pub fn new(disk: DiskManager, key_type: KeyType, order: usize) -> Self {
        Self {
            disk: Mutex::new(disk),
            key_type,
            order,
            root: PageId::INVALID,
        }
    }

    /// Rebuild metadata from the header page of an existing file.
    pub fn load(mut disk: DiskManager) -> Result<Self> {
        let record = disk.read_header()?;
        if record.len() < Self::HEADER_RECORD_SIZE || &record[0..4] != HEADER_MAGIC {
            return Err(Error::InvalidHeader("missing B+ tree magic".to_string()));
        }

        let order = u32::from_le_bytes([record[4], record[5], record[6], record[7]]) as usize;
        let tag = record[8];
        let width = u32::from_le_bytes([record[9], record[10], record[11], record[12]]);
        let root = PageId(u32::from_le_bytes([
            record[13], record[14], record[15], record[16],
        ]));

        let key_type = KeyType::from_tag(tag, width)
            .ok_or_else(|| Error::InvalidHeader(format!("unknown key type tag {}", tag)))?;
        if order == 0 {
            return Err(Error::InvalidHeader("order is zero".to_string()));
        }
        if !root.is_valid() || root.0 >= disk.page_count() {
            return Err(Error::InvalidHeader(format!("root {} out of range", root)));
        }

        Ok(Self {
            disk: Mutex::new(disk),
            key_type,
            order,
            root,
        })
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn root(&self) -> PageId {
        self.root
    }

    /// Point the tree at a new root. Call [`Self::write_header`] to persist.
    pub fn set_root(&mut self, root: PageId) {
        self.root = root;
    }

    /// Maximum number of entries (leaf) or keys (inner) in a node: `2d`.
    #[inline]
    pub fn max_keys(&self) -> usize {
        2 * self.order
    }

    /// Usable bytes per page of the backing storage.
    pub fn page_size(&self) -> usize {
        self.disk.lock().page_size()
    }

    pub(crate) fn allocate_page(&self) -> Result<PageId> {
        self.disk.lock().allocate_page()
    }

    pub(crate) fn read_page(&self, page_id: PageId) -> Result<Page> {
        self.disk.lock().read_page(page_id)
    }

    pub(crate) fn write_page(&self, page_id: PageId, page: &mut Page) -> Result<()> {
        self.disk.lock().write_page(page_id, page)
    }

    /// Persist order, key type and root page to the header page.
    pub fn write_header(&self) -> Result<()> {
        let mut record = Vec::with_capacity(Self::HEADER_RECORD_SIZE);
        record.extend_from_slice(HEADER_MAGIC);
        record.extend_from_slice(&(self.order as u32).to_le_bytes());
        record.push(self.key_type.tag());
        record.extend_from_slice(&(self.key_type.size_in_bytes() as u32).to_le_bytes());
        record.extend_from_slice(&self.root.0.to_le_bytes());
        self.disk.lock().write_header(&record)
    }

    /// Flush all written pages to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.disk.lock().sync()
    }
}
