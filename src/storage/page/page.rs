//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. The first bytes hold a CRC32 checksum; the rest
//! is the payload owned by a node or by the index header.

use crate::common::config::{PAGE_CHECKSUM_SIZE, PAGE_SIZE};

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code (copying 4KB should
/// be explicit). A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use bptree::storage::page::Page;
///
/// let mut page = Page::new();
/// page.payload_mut()[0] = 0xFF;
/// assert_eq!(page.payload()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Create a page whose payload starts with `payload`; the rest is zeroed.
    ///
    /// # Panics
    /// Panics if `payload` is larger than the page payload area.
    pub fn with_payload(payload: &[u8]) -> Self {
        let mut page = Self::new();
        page.payload_mut()[..payload.len()].copy_from_slice(payload);
        page
    }

    /// Get immutable slice of the whole page, checksum included.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of the whole page, checksum included.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes available to the page owner.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[PAGE_CHECKSUM_SIZE..]
    }

    /// Mutable bytes available to the page owner.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[PAGE_CHECKSUM_SIZE..]
    }

    /// Get the size of a page.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Type of the page, taken from the first payload byte.
    pub fn page_type(&self) -> PageType {
        self.header().page_type
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + PAGE_CHECKSUM_SIZE]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}
