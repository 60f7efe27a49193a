//! Forward scans over the leaf chain.

use std::iter::FusedIterator;
use std::vec;

use crate::common::{Error, PageId, Result};
use crate::index::btree::leaf::LeafNode;
use crate::index::btree::metadata::BPlusTreeMetadata;
use crate::types::RecordId;

/// Lazy, forward-only scan of record ids in key order.
///
/// The iterator buffers the record ids of one leaf at a time. When they run
/// out it re-reads that leaf to pick up its current right sibling, then
/// moves on. Empty leaves are skipped. A scan cannot be restarted; ask the
/// tree for a new one.
///
/// Storage errors are yielded once, after which the iterator is finished.
pub struct ScanIter<'a> {
    meta: &'a BPlusTreeMetadata,
    leaf: PageId,
    rids: vec::IntoIter<RecordId>,
    finished: bool,
}

impl<'a> ScanIter<'a> {
    /// Start at position `start` of `leaf`.
    pub(crate) fn new(meta: &'a BPlusTreeMetadata, leaf: &LeafNode, start: usize) -> Self {
        let rids = leaf.rids().get(start..).unwrap_or_default().to_vec();
        Self {
            meta,
            leaf: leaf.page_id(),
            rids: rids.into_iter(),
            finished: false,
        }
    }

    /// The next record id.
    ///
    /// # Errors
    /// `Error::IteratorExhausted` once the scan has passed the last entry.
    pub fn advance(&mut self) -> Result<RecordId> {
        self.next().unwrap_or(Err(Error::IteratorExhausted))
    }

    /// Move to the next leaf in the chain. Returns `false` at the end.
    fn load_next_leaf(&mut self) -> Result<bool> {
        let current = LeafNode::from_page(self.meta, self.leaf)?;
        let Some(next) = current.right_sibling() else {
            return Ok(false);
        };
        let next = LeafNode::from_page(self.meta, next)?;
        self.leaf = next.page_id();
        self.rids = next.rids().to_vec().into_iter();
        Ok(true)
    }
}

impl Iterator for ScanIter<'_> {
    type Item = Result<RecordId>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if let Some(rid) = self.rids.next() {
                return Some(Ok(rid));
            }
            match self.load_next_leaf() {
                Ok(true) => {}
                Ok(false) => self.finished = true,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl FusedIterator for ScanIter<'_> {}
