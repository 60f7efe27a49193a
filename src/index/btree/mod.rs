//! Disk-resident B+ tree.
//!
//! # Components
//! - [`BPlusTree`] - The tree facade: create/open, point operations, scans
//! - [`Node`] - Sum of [`LeafNode`] and [`InnerNode`], one per page
//! - [`InsertOutcome`] - Split results passed back up the recursion
//! - [`ScanIter`] - Lazy scan over the leaf chain
//! - [`BPlusTreeMetadata`] - Order, key type, root page and the storage handle

mod inner;
mod iter;
mod leaf;
mod metadata;
mod node;
mod tree;

pub use inner::InnerNode;
pub use iter::ScanIter;
pub use leaf::LeafNode;
pub use metadata::BPlusTreeMetadata;
pub use node::{InsertOutcome, Node};
pub use tree::BPlusTree;
