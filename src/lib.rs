//! bptree - A disk-resident B+ tree index.
//!
//! Maps fixed-width, totally ordered keys to record ids. Every node lives on
//! its own page of a single backing file; page 0 is the header.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             bptree                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Tree Facade (index/btree/tree)              │   │
//! │  │   create/open · get/put/remove · bulk_load · scans       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Nodes (index/btree/)                     │   │
//! │  │     Node = Leaf | Inner,  splits returned upward as      │   │
//! │  │              InsertOutcome::Split                        │   │
//! │  │   ScanIter follows right-sibling links between leaves    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        BPlusTreeMetadata (order, key type, root)         │   │
//! │  │            Mutex<DiskManager> shared by nodes            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │     DiskManager + Page + PageHeader (CRC32 checksums)    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`types`] - Keys, key types and record ids
//! - [`storage`] - Disk I/O and page formats
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```no_run
//! use bptree::{BPlusTree, Key, KeyType, RecordId};
//!
//! let mut tree = BPlusTree::create("people.idx", KeyType::Int, 2)?;
//! tree.bulk_load((0..100).map(|i| (Key::Int(i), RecordId::new(i as u32, 0))), 0.75)?;
//!
//! for rid in tree.scan_greater_equal(&Key::Int(90))? {
//!     println!("{}", rid?);
//! }
//! tree.flush()?;
//! # Ok::<(), bptree::Error>(())
//! ```

pub mod common;
pub mod index;
pub mod storage;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, PageId, Result};

pub use index::btree::{BPlusTree, InsertOutcome, ScanIter};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
pub use types::{Key, KeyType, RecordId};
