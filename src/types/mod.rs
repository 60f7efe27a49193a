//! Value types stored in the index.
//!
//! - [`Key`] / [`KeyType`] - Fixed-width ordered keys
//! - [`RecordId`] - Row locator (page + slot)

mod key;
mod record_id;

pub use key::{Key, KeyType};
pub use record_id::RecordId;
