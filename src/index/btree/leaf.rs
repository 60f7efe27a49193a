//! Leaf nodes: sorted `(key, record id)` runs linked left to right.

use std::iter::Peekable;

use tracing::trace;

use crate::common::{Error, PageId, Result};
use crate::index::btree::iter::ScanIter;
use crate::index::btree::metadata::BPlusTreeMetadata;
use crate::index::btree::node::{
    self, dot_escape, dot_node_name, InsertOutcome, Node, PayloadReader,
};
use crate::storage::page::PageType;
use crate::types::{Key, KeyType, RecordId};

/// A leaf node.
///
/// # Layout
/// ```text
/// Offset  Size          Field
/// ------  ----          -----
/// 0       1             PageType::BTreeLeaf
/// 1       4             right sibling page (PageId::INVALID if none)
/// 5       4             entry count n
/// 9       n×(k+6)       entries: key bytes ‖ record id bytes
/// ```
///
/// A leaf may hold anywhere from zero to `2d` entries; deletion never
/// merges or redistributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    page_id: PageId,
    keys: Vec<Key>,
    rids: Vec<RecordId>,
    right_sibling: Option<PageId>,
}

impl LeafNode {
    /// Bytes before the first entry.
    pub const HEADER_SIZE: usize = 1 + PageId::SIZE + 4;

    /// Allocate a page for a new leaf and write it out.
    ///
    /// # Panics
    /// Panics if `keys` and `rids` differ in length.
    pub fn new(
        meta: &BPlusTreeMetadata,
        keys: Vec<Key>,
        rids: Vec<RecordId>,
        right_sibling: Option<PageId>,
    ) -> Result<Self> {
        assert_eq!(keys.len(), rids.len(), "every key needs a record id");
        let leaf = Self {
            page_id: meta.allocate_page()?,
            keys,
            rids,
            right_sibling,
        };
        leaf.sync(meta)?;
        Ok(leaf)
    }

    /// Read the leaf stored on `page_id`.
    pub fn from_page(meta: &BPlusTreeMetadata, page_id: PageId) -> Result<Self> {
        match Node::load(meta, page_id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Inner(_) => Err(node::corrupted(page_id, "expected a leaf, found an inner node")),
        }
    }

    pub fn from_bytes(key_type: KeyType, page_id: PageId, payload: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(page_id, payload);
        if reader.u8()? != PageType::BTreeLeaf as u8 {
            return Err(node::corrupted(page_id, "not a leaf"));
        }
        let right_sibling = reader.optional_page_id()?;
        let n = reader.count(key_type.size_in_bytes() + RecordId::SIZE)?;

        let mut keys = Vec::with_capacity(n);
        let mut rids = Vec::with_capacity(n);
        for _ in 0..n {
            keys.push(reader.key(key_type)?);
            rids.push(reader.record_id()?);
        }

        Ok(Self {
            page_id,
            keys,
            rids,
            right_sibling,
        })
    }

    pub fn to_bytes(&self, key_type: KeyType) -> Vec<u8> {
        let entry_size = key_type.size_in_bytes() + RecordId::SIZE;
        let mut buf = Vec::with_capacity(Self::HEADER_SIZE + self.keys.len() * entry_size);
        buf.push(PageType::BTreeLeaf as u8);
        buf.extend_from_slice(&PageId::encode_optional(self.right_sibling));
        buf.extend_from_slice(&(self.keys.len() as u32).to_le_bytes());
        for (key, rid) in self.keys.iter().zip(&self.rids) {
            key.write_to(key_type, &mut buf);
            rid.write_to(&mut buf);
        }
        buf
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[inline]
    pub fn rids(&self) -> &[RecordId] {
        &self.rids
    }

    #[inline]
    pub fn right_sibling(&self) -> Option<PageId> {
        self.right_sibling
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A leaf is responsible for every key routed to it.
    pub fn get(self, _key: &Key) -> LeafNode {
        self
    }

    pub fn leftmost_leaf(self) -> LeafNode {
        self
    }

    pub fn get_key(&self, key: &Key) -> Option<RecordId> {
        self.keys.binary_search(key).ok().map(|i| self.rids[i])
    }

    /// Insert `key`, splitting if the leaf grows past `2d` entries.
    ///
    /// # Errors
    /// `Error::DuplicateKey` if `key` is present; the leaf is not modified.
    pub fn put(&mut self, meta: &BPlusTreeMetadata, key: Key, rid: RecordId) -> Result<InsertOutcome> {
        let idx = match self.keys.binary_search(&key) {
            Ok(_) => return Err(Error::DuplicateKey(key.to_string())),
            Err(idx) => idx,
        };
        self.keys.insert(idx, key);
        self.rids.insert(idx, rid);

        if self.keys.len() > meta.max_keys() {
            return self.split(meta);
        }
        self.sync(meta)?;
        Ok(InsertOutcome::Absorbed)
    }

    /// Delete `key` if present. The leaf may become empty.
    pub fn remove(&mut self, meta: &BPlusTreeMetadata, key: &Key) -> Result<()> {
        if let Ok(idx) = self.keys.binary_search(key) {
            self.keys.remove(idx);
            self.rids.remove(idx);
            self.sync(meta)?;
        }
        Ok(())
    }

    /// Fill this (empty) leaf from a sorted stream.
    ///
    /// The leaf takes `⌈2d · fill_factor⌉` entries. If input remains, an
    /// empty right sibling is allocated and linked, and its page is returned
    /// together with the next input key; the caller continues the chain by
    /// bulk loading that sibling.
    ///
    /// # Errors
    /// - `Error::NonEmptyBulkLoad` if the leaf already holds entries.
    /// - `Error::InvalidFillFactor` if `fill_factor` is outside `(0, 1]`.
    /// - `Error::DuplicateKey` / `Error::UnsortedBulkLoad` if the stream is
    ///   not strictly increasing, checked up to and including the key handed
    ///   back as separator. Nothing is written in that case.
    pub fn bulk_load<I>(
        &mut self,
        meta: &BPlusTreeMetadata,
        data: &mut Peekable<I>,
        fill_factor: f32,
    ) -> Result<InsertOutcome>
    where
        I: Iterator<Item = (Key, RecordId)>,
    {
        if !self.is_empty() {
            return Err(Error::NonEmptyBulkLoad);
        }
        let target = node::fill_target(meta.max_keys(), fill_factor)?;

        while self.keys.len() < target {
            let Some((key, rid)) = data.next() else { break };
            meta.key_type().check(&key)?;
            check_ascending(self.keys.last(), &key)?;
            self.keys.push(key);
            self.rids.push(rid);
        }

        let outcome = match data.peek() {
            Some((next, _)) => {
                // The sibling's first key must still follow this leaf's last.
                check_ascending(self.keys.last(), next)?;
                let separator = next.clone();
                let sibling = LeafNode::new(meta, Vec::new(), Vec::new(), self.right_sibling)?;
                self.right_sibling = Some(sibling.page_id);
                InsertOutcome::Split {
                    separator,
                    sibling: sibling.page_id,
                }
            }
            None => InsertOutcome::Absorbed,
        };
        self.sync(meta)?;
        Ok(outcome)
    }

    /// Record ids of this leaf and every leaf to its right, in key order.
    pub fn scan_all<'a>(&self, meta: &'a BPlusTreeMetadata) -> ScanIter<'a> {
        ScanIter::new(meta, self, 0)
    }

    /// Record ids of keys `>= key`, continuing through right siblings.
    pub fn scan_greater_equal<'a>(&self, meta: &'a BPlusTreeMetadata, key: &Key) -> ScanIter<'a> {
        let start = self.keys.partition_point(|k| k < key);
        ScanIter::new(meta, self, start)
    }

    /// Largest order `d` such that `2d` entries fit in `page_size` bytes.
    pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
        let entry_size = key_type.size_in_bytes() + RecordId::SIZE;
        page_size.saturating_sub(Self::HEADER_SIZE) / (2 * entry_size)
    }

    /// `()` for an empty leaf, otherwise `((k (p s)) (k (p s)) ...)`.
    pub fn to_sexp(&self) -> String {
        let entries: Vec<String> = self
            .keys
            .iter()
            .zip(&self.rids)
            .map(|(key, rid)| format!("({} {})", key, rid))
            .collect();
        format!("({})", entries.join(" "))
    }

    pub(crate) fn write_dot(&self, out: &mut String) {
        out.push_str(&format!("  {}[label = \"", dot_node_name(self.page_id)));
        for (i, (key, rid)) in self.keys.iter().zip(&self.rids).enumerate() {
            if i > 0 {
                out.push('|');
            }
            dot_escape(&format!("{}: {}", key, rid), out);
        }
        out.push_str("\"];\n");
    }

    fn split(&mut self, meta: &BPlusTreeMetadata) -> Result<InsertOutcome> {
        // Keep ⌈(2d+1)/2⌉ = d+1 entries, move the other d.
        let keep = meta.order() + 1;
        let right_keys = self.keys.split_off(keep);
        let right_rids = self.rids.split_off(keep);
        let separator = right_keys[0].clone();

        let right = LeafNode::new(meta, right_keys, right_rids, self.right_sibling)?;
        self.right_sibling = Some(right.page_id);
        self.sync(meta)?;

        trace!(
            leaf = self.page_id.0,
            sibling = right.page_id.0,
            separator = %separator,
            "split leaf"
        );
        Ok(InsertOutcome::Split {
            separator,
            sibling: right.page_id,
        })
    }

    fn sync(&self, meta: &BPlusTreeMetadata) -> Result<()> {
        node::write_node(meta, self.page_id, &self.to_bytes(meta.key_type()))
    }
}

/// Bulk load input must be strictly increasing.
fn check_ascending(previous: Option<&Key>, next: &Key) -> Result<()> {
    match previous {
        Some(prev) if prev == next => Err(Error::DuplicateKey(next.to_string())),
        Some(prev) if prev > next => Err(Error::UnsortedBulkLoad {
            previous: prev.to_string(),
            next: next.to_string(),
        }),
        _ => Ok(()),
    }
}
