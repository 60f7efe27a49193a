//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`]:
//! - CRC32 checksum over the payload
//! - [`PageType`] discriminator, which is also the first payload byte

use crate::common::config::PAGE_CHECKSUM_SIZE;

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation. The byte opens
/// the page payload, so node pages are self-describing and traversal never
/// needs out-of-band type information.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized or corrupted page.
    #[default]
    Invalid = 0,
    /// Index header page (page 0).
    Header = 1,
    /// B+ tree inner (routing) node.
    BTreeInner = 2,
    /// B+ tree leaf node.
    BTreeLeaf = 3,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Header,
            2 => PageType::BTreeInner,
            3 => PageType::BTreeLeaf,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (5 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     checksum (CRC32 of bytes 4.., little-endian)
/// 4       1     page_type (PageType as u8, first payload byte)
/// ```
///
/// The checksum covers the whole payload, so it never includes itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// CRC32 checksum of the page payload.
    pub checksum: u32,
    /// Type of this page.
    pub page_type: PageType,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = PAGE_CHECKSUM_SIZE + 1;

    /// Offset of each field within the header.
    pub const OFFSET_CHECKSUM: usize = 0;
    pub const OFFSET_PAGE_TYPE: usize = PAGE_CHECKSUM_SIZE;

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);
        let page_type = PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]);

        Self {
            checksum,
            page_type,
        }
    }

    /// Compute the CRC32 checksum of a page.
    ///
    /// Only the payload (everything after the checksum field) is hashed.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[PAGE_CHECKSUM_SIZE..]);
        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}
