//! Error types for the B+ tree index.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index and its storage layer.
///
/// Every error is synchronous and local. Precondition failures such as a
/// duplicate key or a non-empty bulk load leave the tree as it was.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// The stored CRC32 of a page does not match its contents.
    #[error("Checksum mismatch on page {0}")]
    ChecksumMismatch(u32),

    /// A page holds bytes that do not decode to a node or header.
    #[error("Corrupted page {page}: {reason}")]
    Corrupted { page: u32, reason: String },

    /// The header page is missing or was written by something else.
    #[error("Invalid index header: {0}")]
    InvalidHeader(String),

    /// Insertion of a key that is already present.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Bulk load against a tree or leaf that already holds entries.
    #[error("Bulk load requires an empty tree")]
    NonEmptyBulkLoad,

    /// Bulk load input whose keys are not strictly increasing.
    #[error("Bulk load input out of order: {next} follows {previous}")]
    UnsortedBulkLoad { previous: String, next: String },

    /// The index file has used up every addressable page.
    #[error("Index file is full: no page ids left")]
    OutOfPages,

    /// A scan was advanced past its last element.
    #[error("No more elements in scan")]
    IteratorExhausted,

    /// The configured order cannot be stored in a page.
    #[error("Invalid order {order}: must be between 1 and {max}")]
    InvalidOrder { order: usize, max: usize },

    /// Fill factor outside of `(0, 1]`.
    #[error("Invalid fill factor {0}: must be in (0, 1]")]
    InvalidFillFactor(f32),

    /// A key that does not conform to the tree's key type.
    #[error("Key type mismatch: expected {expected}, found {found}")]
    KeyTypeMismatch { expected: String, found: String },
}
