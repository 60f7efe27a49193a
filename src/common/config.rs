//! Configuration constants for the index file layout.

use crate::common::PageId;

/// Size of a page in bytes (4KB).
///
/// This value is chosen to match:
/// - OS page size on most systems (4096 bytes)
/// - Common database page sizes
///
/// With 32-bit PageIds an index file tops out just under 16TB.
pub const PAGE_SIZE: usize = 4096;

/// Bytes reserved at the start of every page for its CRC32 checksum.
pub const PAGE_CHECKSUM_SIZE: usize = 4;

/// Bytes of every page available to its owner (node or header record).
pub const PAGE_PAYLOAD_SIZE: usize = PAGE_SIZE - PAGE_CHECKSUM_SIZE;

/// Page 0 holds the tree header (order, key type, root page).
pub const HEADER_PAGE_ID: PageId = PageId(0);

/// Maximum number of pages in one index file.
///
/// Ids run from 0 to `u32::MAX - 1`; `u32::MAX` is [`PageId::INVALID`].
pub const MAX_PAGES: u32 = u32::MAX;
