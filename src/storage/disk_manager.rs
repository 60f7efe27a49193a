//! Disk Manager - low-level file I/O for index pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating new pages
//! - Persisting the one-page index header

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::trace;

use crate::common::config::{HEADER_PAGE_ID, MAX_PAGES, PAGE_PAYLOAD_SIZE, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageType};

/// Manages disk I/O for a single index file.
///
/// # File Layout
/// The index is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ header  │ node    │ node    │         │ node    │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`. Page 0 is allocated
/// when the file is created and is reserved for the header record.
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The owner wraps it in a mutex when
/// it must be reached through a shared reference.
///
/// # Durability
/// Writes go to the OS page cache. Call [`DiskManager::sync`] to make them
/// durable.
pub struct DiskManager {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a new index file with an empty header page.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        let mut dm = Self {
            file,
            page_count: 0,
        };
        let header = dm.allocate_page()?;
        debug_assert_eq!(header, HEADER_PAGE_ID);
        dm.write_header(&[])?;
        Ok(dm)
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Calculate page count from file size
        let metadata = file.metadata()?;
        let pages = metadata.len() / PAGE_SIZE as u64;
        let page_count = u32::try_from(pages)
            .ok()
            .filter(|&count| count <= MAX_PAGES)
            .ok_or_else(|| Error::InvalidHeader(format!("file holds {} pages", pages)))?;

        Ok(Self { file, page_count })
    }

    /// Bytes of every page usable by its owner.
    #[inline]
    pub fn page_size(&self) -> usize {
        PAGE_PAYLOAD_SIZE
    }

    /// Read a page from disk and verify its checksum.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist.
    /// - `Error::ChecksumMismatch` if the page bytes were damaged.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        if !page.verify_checksum() {
            return Err(Error::ChecksumMismatch(page_id.0));
        }
        Ok(page)
    }

    /// Write a page to disk, stamping its checksum first.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        page.update_checksum();
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;

        trace!(page = page_id.0, "wrote page");
        Ok(())
    }

    /// Allocate a new page at the end of the file.
    ///
    /// Returns the `PageId` of the newly allocated page. The page payload is
    /// zeroed and carries a valid checksum, so it can be read back at once.
    ///
    /// # Errors
    /// Returns `Error::OutOfPages` once `MAX_PAGES` pages exist.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count >= MAX_PAGES {
            return Err(Error::OutOfPages);
        }
        let page_id = PageId::new(self.page_count);

        let mut page = Page::new();
        page.update_checksum();

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Persist the header record on page 0.
    ///
    /// # Panics
    /// Panics if `record` does not fit in one page payload.
    pub fn write_header(&mut self, record: &[u8]) -> Result<()> {
        let mut page = Page::new();
        let payload = page.payload_mut();
        payload[0] = PageType::Header as u8;
        payload[1..=record.len()].copy_from_slice(record);
        self.write_page(HEADER_PAGE_ID, &mut page)
    }

    /// Read back the header record stored on page 0.
    ///
    /// Returns the payload after the page type byte.
    ///
    /// # Errors
    /// Returns `Error::InvalidHeader` if page 0 is not a header page.
    pub fn read_header(&mut self) -> Result<Vec<u8>> {
        if self.page_count == 0 {
            return Err(Error::InvalidHeader("file has no header page".to_string()));
        }
        let page = self.read_page(HEADER_PAGE_ID)?;
        if page.page_type() != PageType::Header {
            return Err(Error::InvalidHeader(format!(
                "page 0 has type {:?}",
                page.page_type()
            )));
        }
        Ok(page.payload()[1..].to_vec())
    }

    /// Flush written pages to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of pages in the file, header page included.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the total size of the index file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }
}
