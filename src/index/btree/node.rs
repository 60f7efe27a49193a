//! The node sum type shared by leaves and inner nodes.
//!
//! Every operation returns its split information to the caller instead of
//! reaching for a parent pointer. A node that overflowed reports
//! [`InsertOutcome::Split`] and the parent absorbs the separator.

use std::iter::Peekable;

use crate::common::{Error, PageId, Result};
use crate::index::btree::inner::InnerNode;
use crate::index::btree::leaf::LeafNode;
use crate::index::btree::metadata::BPlusTreeMetadata;
use crate::storage::page::{Page, PageType};
use crate::types::{Key, KeyType, RecordId};

/// Result of an operation that may have split a node.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The node absorbed the change.
    Absorbed,
    /// The node split. `separator` is the smallest key reachable through
    /// `sibling`, the newly allocated right neighbour.
    Split { separator: Key, sibling: PageId },
}

/// A B+ tree node, addressed by the page it lives on.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Inner(InnerNode),
}

impl Node {
    /// Read and decode the node stored on `page_id`.
    pub fn load(meta: &BPlusTreeMetadata, page_id: PageId) -> Result<Node> {
        let page = meta.read_page(page_id)?;
        Self::from_bytes(meta.key_type(), page_id, page.payload())
    }

    /// Decode a node payload, dispatching on its discriminant byte.
    pub fn from_bytes(key_type: KeyType, page_id: PageId, payload: &[u8]) -> Result<Node> {
        let tag = payload
            .first()
            .copied()
            .ok_or_else(|| corrupted(page_id, "empty payload"))?;
        match PageType::from_u8(tag) {
            PageType::BTreeLeaf => Ok(Node::Leaf(LeafNode::from_bytes(key_type, page_id, payload)?)),
            PageType::BTreeInner => Ok(Node::Inner(InnerNode::from_bytes(key_type, page_id, payload)?)),
            other => Err(corrupted(page_id, format!("expected a node, found {:?}", other))),
        }
    }

    pub fn to_bytes(&self, key_type: KeyType) -> Vec<u8> {
        match self {
            Node::Leaf(leaf) => leaf.to_bytes(key_type),
            Node::Inner(inner) => inner.to_bytes(key_type),
        }
    }

    pub fn page_id(&self) -> PageId {
        match self {
            Node::Leaf(leaf) => leaf.page_id(),
            Node::Inner(inner) => inner.page_id(),
        }
    }

    /// True for a leaf holding no entries, i.e. the root of an empty tree.
    pub fn is_empty_leaf(&self) -> bool {
        matches!(self, Node::Leaf(leaf) if leaf.is_empty())
    }

    /// The leaf responsible for `key`.
    pub fn get(self, meta: &BPlusTreeMetadata, key: &Key) -> Result<LeafNode> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.get(key)),
            Node::Inner(inner) => inner.get(meta, key),
        }
    }

    pub fn leftmost_leaf(self, meta: &BPlusTreeMetadata) -> Result<LeafNode> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.leftmost_leaf()),
            Node::Inner(inner) => inner.leftmost_leaf(meta),
        }
    }

    pub fn put(&mut self, meta: &BPlusTreeMetadata, key: Key, rid: RecordId) -> Result<InsertOutcome> {
        match self {
            Node::Leaf(leaf) => leaf.put(meta, key, rid),
            Node::Inner(inner) => inner.put(meta, key, rid),
        }
    }

    pub fn remove(&mut self, meta: &BPlusTreeMetadata, key: &Key) -> Result<()> {
        match self {
            Node::Leaf(leaf) => leaf.remove(meta, key),
            Node::Inner(inner) => inner.remove(meta, key),
        }
    }

    pub fn bulk_load<I>(
        &mut self,
        meta: &BPlusTreeMetadata,
        data: &mut Peekable<I>,
        fill_factor: f32,
    ) -> Result<InsertOutcome>
    where
        I: Iterator<Item = (Key, RecordId)>,
    {
        match self {
            Node::Leaf(leaf) => leaf.bulk_load(meta, data, fill_factor),
            Node::Inner(inner) => inner.bulk_load(meta, data, fill_factor),
        }
    }

    pub fn to_sexp(&self, meta: &BPlusTreeMetadata) -> Result<String> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.to_sexp()),
            Node::Inner(inner) => inner.to_sexp(meta),
        }
    }

    /// Append Graphviz statements for this subtree to `out`.
    pub fn write_dot(&self, meta: &BPlusTreeMetadata, out: &mut String) -> Result<()> {
        match self {
            Node::Leaf(leaf) => {
                leaf.write_dot(out);
                Ok(())
            }
            Node::Inner(inner) => inner.write_dot(meta, out),
        }
    }
}

/// Number of entries a bulk-loaded leaf is packed with.
///
/// `fill_factor` must lie in `(0, 1]`. The result is at least one entry and
/// at most `max_keys`.
pub(crate) fn fill_target(max_keys: usize, fill_factor: f32) -> Result<usize> {
    if !(fill_factor > 0.0 && fill_factor <= 1.0) {
        return Err(Error::InvalidFillFactor(fill_factor));
    }
    // Absorb one ulp of rounding in products such as 10 * 0.8.
    let product = max_keys as f64 * fill_factor as f64;
    let target = (product - product * f64::from(f32::EPSILON)).ceil() as usize;
    Ok(target.clamp(1, max_keys.max(1)))
}

/// Write a serialized node to its page.
pub(crate) fn write_node(meta: &BPlusTreeMetadata, page_id: PageId, bytes: &[u8]) -> Result<()> {
    debug_assert!(
        bytes.len() <= meta.page_size(),
        "node on {} does not fit its page",
        page_id
    );
    let mut page = Page::with_payload(bytes);
    meta.write_page(page_id, &mut page)
}

pub(crate) fn corrupted(page: PageId, reason: impl Into<String>) -> Error {
    Error::Corrupted {
        page: page.0,
        reason: reason.into(),
    }
}

/// Escape a label fragment for Graphviz record shapes.
pub(crate) fn dot_escape(text: &str, out: &mut String) {
    for ch in text.chars() {
        if matches!(ch, '"' | '|' | '{' | '}' | '<' | '>' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
}

pub(crate) fn dot_node_name(page_id: PageId) -> String {
    format!("node{}", page_id.0)
}

/// Bounds-checked cursor over a node payload.
pub(crate) struct PayloadReader<'a> {
    page: PageId,
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(page: PageId, data: &'a [u8]) -> Self {
        Self { page, data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or_else(|| corrupted(self.page, format!("truncated at byte {}", self.pos)))?;
        self.pos += len;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn page_id(&mut self) -> Result<PageId> {
        Ok(PageId(self.u32()?))
    }

    pub(crate) fn optional_page_id(&mut self) -> Result<Option<PageId>> {
        let b = self.take(PageId::SIZE)?;
        Ok(PageId::decode_optional([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn key(&mut self, key_type: KeyType) -> Result<Key> {
        let page = self.page;
        let bytes = self.take(key_type.size_in_bytes())?;
        key_type
            .decode(bytes)
            .ok_or_else(|| corrupted(page, format!("undecodable {} key", key_type)))
    }

    pub(crate) fn record_id(&mut self) -> Result<RecordId> {
        Ok(RecordId::from_bytes(self.take(RecordId::SIZE)?))
    }

    /// Validate a count read from disk against the bytes actually left.
    pub(crate) fn count(&mut self, item_size: usize) -> Result<usize> {
        let count = self.u32()? as usize;
        let remaining = self.data.len() - self.pos;
        if count.saturating_mul(item_size) > remaining {
            return Err(corrupted(
                self.page,
                format!("count {} exceeds payload", count),
            ));
        }
        Ok(count)
    }
}
