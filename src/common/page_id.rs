//! Page identifier type.

use std::fmt;

/// Identifies a page in the index file.
///
/// Every node is addressed by the page it lives on, never by an in-memory
/// pointer, so a tree can be rebuilt from disk by page number alone.
///
/// # Example
/// ```
/// use bptree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Written in place of an absent page reference, e.g. the right sibling
    /// of the rightmost leaf.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Serialized width in bytes.
    pub const SIZE: usize = 4;

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Encode an optional page reference, using [`PageId::INVALID`] for none.
    #[inline]
    pub fn encode_optional(page: Option<PageId>) -> [u8; Self::SIZE] {
        page.unwrap_or(Self::INVALID).0.to_le_bytes()
    }

    /// Decode a page reference written by [`PageId::encode_optional`].
    #[inline]
    pub fn decode_optional(bytes: [u8; Self::SIZE]) -> Option<PageId> {
        let page = PageId(u32::from_le_bytes(bytes));
        page.is_valid().then_some(page)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
