//! Row locator stored in the leaves of the index.

use std::fmt;

/// Identifies a stored row by the page it lives on and its slot there.
///
/// # Layout (6 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     page_num
/// 4       2     entry_num
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_num: u32,
    pub entry_num: u16,
}

impl RecordId {
    /// Serialized width in bytes.
    pub const SIZE: usize = 6;

    #[inline]
    pub fn new(page_num: u32, entry_num: u16) -> Self {
        Self {
            page_num,
            entry_num,
        }
    }

    /// Append the serialized form to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.page_num.to_le_bytes());
        buf.extend_from_slice(&self.entry_num.to_le_bytes());
    }

    /// Decode a record id from the first [`RecordId::SIZE`] bytes of `data`.
    ///
    /// # Panics
    /// Panics if `data` is shorter than [`RecordId::SIZE`].
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for RecordId");
        Self {
            page_num: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            entry_num: u16::from_le_bytes([data[4], data[5]]),
        }
    }
}

/// Renders as `(page slot)`, the form used in tree dumps.
impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.page_num, self.entry_num)
    }
}
