//! Inner nodes: separator keys routing to child pages.

use std::iter::Peekable;

use tracing::trace;

use crate::common::{PageId, Result};
use crate::index::btree::leaf::LeafNode;
use crate::index::btree::metadata::BPlusTreeMetadata;
use crate::index::btree::node::{
    self, dot_escape, dot_node_name, InsertOutcome, Node, PayloadReader,
};
use crate::storage::page::PageType;
use crate::types::{Key, KeyType, RecordId};

/// An inner node with `n` keys and `n + 1` children.
///
/// Every key reachable through `children[i]` is `< keys[i]`, and every key
/// reachable through `children[i + 1]` is `>= keys[i]`.
///
/// # Layout
/// ```text
/// Offset    Size      Field
/// ------    ----      -----
/// 0         1         PageType::BTreeInner
/// 1         4         key count n
/// 5         4         child count (n + 1)
/// 9         n×k       keys
/// 9 + n×k   (n+1)×4   child page ids
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InnerNode {
    page_id: PageId,
    keys: Vec<Key>,
    children: Vec<PageId>,
}

impl InnerNode {
    /// Bytes before the first key.
    pub const HEADER_SIZE: usize = 1 + 4 + 4;

    /// Allocate a page for a new inner node and write it out.
    pub fn new(meta: &BPlusTreeMetadata, keys: Vec<Key>, children: Vec<PageId>) -> Result<Self> {
        assert_eq!(keys.len() + 1, children.len(), "n keys need n + 1 children");
        let inner = Self {
            page_id: meta.allocate_page()?,
            keys,
            children,
        };
        inner.sync(meta)?;
        Ok(inner)
    }

    pub fn from_page(meta: &BPlusTreeMetadata, page_id: PageId) -> Result<Self> {
        match Node::load(meta, page_id)? {
            Node::Inner(inner) => Ok(inner),
            Node::Leaf(_) => Err(node::corrupted(page_id, "expected an inner node, found a leaf")),
        }
    }

    pub fn from_bytes(key_type: KeyType, page_id: PageId, payload: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(page_id, payload);
        if reader.u8()? != PageType::BTreeInner as u8 {
            return Err(node::corrupted(page_id, "not an inner node"));
        }
        let n_keys = reader.count(key_type.size_in_bytes())?;
        let n_children = reader.count(0)?;
        if n_children != n_keys + 1 {
            return Err(node::corrupted(
                page_id,
                format!("{} keys but {} children", n_keys, n_children),
            ));
        }

        let keys = (0..n_keys)
            .map(|_| reader.key(key_type))
            .collect::<Result<Vec<_>>>()?;
        let children = (0..n_children)
            .map(|_| reader.page_id())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            page_id,
            keys,
            children,
        })
    }

    pub fn to_bytes(&self, key_type: KeyType) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            Self::HEADER_SIZE
                + self.keys.len() * key_type.size_in_bytes()
                + self.children.len() * PageId::SIZE,
        );
        buf.push(PageType::BTreeInner as u8);
        buf.extend_from_slice(&(self.keys.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.children.len() as u32).to_le_bytes());
        for key in &self.keys {
            key.write_to(key_type, &mut buf);
        }
        for child in &self.children {
            buf.extend_from_slice(&child.0.to_le_bytes());
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
    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    /// Index of the child responsible for `key`: the first `i` with
    /// `key < keys[i]`, or the last child.
    fn child_index(&self, key: &Key) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    fn child(&self, meta: &BPlusTreeMetadata, index: usize) -> Result<Node> {
        Node::load(meta, self.children[index])
    }

    /// The leaf responsible for `key`.
    pub fn get(&self, meta: &BPlusTreeMetadata, key: &Key) -> Result<LeafNode> {
        self.child(meta, self.child_index(key))?.get(meta, key)
    }

    pub fn leftmost_leaf(&self, meta: &BPlusTreeMetadata) -> Result<LeafNode> {
        self.child(meta, 0)?.leftmost_leaf(meta)
    }

    pub fn put(&mut self, meta: &BPlusTreeMetadata, key: Key, rid: RecordId) -> Result<InsertOutcome> {
        let index = self.child_index(&key);
        let mut child = self.child(meta, index)?;
        match child.put(meta, key, rid)? {
            InsertOutcome::Absorbed => Ok(InsertOutcome::Absorbed),
            InsertOutcome::Split { separator, sibling } => {
                self.insert_child(index, separator, sibling);
                self.overflow_or_sync(meta)
            }
        }
    }

    pub fn remove(&mut self, meta: &BPlusTreeMetadata, key: &Key) -> Result<()> {
        let index = self.child_index(key);
        self.child(meta, index)?.remove(meta, key)
    }

    /// Feed a sorted stream into the rightmost subtree until the stream runs
    /// dry or this node overflows.
    pub fn bulk_load<I>(
        &mut self,
        meta: &BPlusTreeMetadata,
        data: &mut Peekable<I>,
        fill_factor: f32,
    ) -> Result<InsertOutcome>
    where
        I: Iterator<Item = (Key, RecordId)>,
    {
        while data.peek().is_some() && self.keys.len() <= meta.max_keys() {
            let last = self.children.len() - 1;
            let mut child = self.child(meta, last)?;
            if let InsertOutcome::Split { separator, sibling } =
                child.bulk_load(meta, data, fill_factor)?
            {
                self.insert_child(last, separator, sibling);
            }
        }
        self.overflow_or_sync(meta)
    }

    /// Largest order `d` such that `2d` keys and `2d + 1` children fit in
    /// `page_size` bytes.
    pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
        let overhead = Self::HEADER_SIZE + PageId::SIZE;
        page_size.saturating_sub(overhead) / (2 * (key_type.size_in_bytes() + PageId::SIZE))
    }

    /// `(c0 k0 c1 k1 ... cn)`, with every child rendered recursively.
    pub fn to_sexp(&self, meta: &BPlusTreeMetadata) -> Result<String> {
        let mut parts = Vec::with_capacity(self.keys.len() + self.children.len());
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                parts.push(self.keys[i - 1].to_string());
            }
            parts.push(Node::load(meta, *child)?.to_sexp(meta)?);
        }
        Ok(format!("({})", parts.join(" ")))
    }

    pub(crate) fn write_dot(&self, meta: &BPlusTreeMetadata, out: &mut String) -> Result<()> {
        let name = dot_node_name(self.page_id);
        out.push_str(&format!("  {}[label = \"", name));
        for i in 0..self.children.len() {
            if i > 0 {
                out.push('|');
                dot_escape(&self.keys[i - 1].to_string(), out);
                out.push('|');
            }
            out.push_str(&format!("<f{}>", i));
        }
        out.push_str("\"];\n");

        for (i, child) in self.children.iter().enumerate() {
            Node::load(meta, *child)?.write_dot(meta, out)?;
            out.push_str(&format!("  \"{}\":f{} -> \"{}\";\n", name, i, dot_node_name(*child)));
        }
        Ok(())
    }

    /// Group one level of `(separator, page)` entries under new inner nodes.
    ///
    /// `first` is the leftmost page of the level and `rest` the remaining
    /// pages, each paired with the smallest key reachable through it. Every
    /// new node takes up to `2d + 1` children; a trailing node that would get
    /// a single child borrows one from its left neighbour instead. Returns the
    /// level above in the same shape.
    pub(crate) fn build_level(
        meta: &BPlusTreeMetadata,
        first: PageId,
        rest: Vec<(Key, PageId)>,
    ) -> Result<(PageId, Vec<(Key, PageId)>)> {
        let fanout = meta.max_keys() + 1;
        let total = rest.len() + 1;

        let mut sizes = vec![fanout; total / fanout];
        match total % fanout {
            0 => {}
            1 if !sizes.is_empty() => {
                if let Some(last) = sizes.last_mut() {
                    *last -= 1;
                }
                sizes.push(2);
            }
            remainder => sizes.push(remainder),
        }

        let mut entries = std::iter::once((None, first))
            .chain(rest.into_iter().map(|(key, page)| (Some(key), page)));
        let mut parent_first = first;
        let mut parent_rest = Vec::with_capacity(sizes.len().saturating_sub(1));

        for size in sizes {
            let mut chunk = entries.by_ref().take(size);
            let Some((separator, head)) = chunk.next() else {
                break;
            };
            let mut keys = Vec::with_capacity(size - 1);
            let mut children = vec![head];
            for (key, child) in chunk {
                keys.extend(key);
                children.push(child);
            }

            let inner = InnerNode::new(meta, keys, children)?;
            match separator {
                None => parent_first = inner.page_id,
                Some(key) => parent_rest.push((key, inner.page_id)),
            }
        }

        trace!(
            nodes = parent_rest.len() + 1,
            children = total,
            "built inner level"
        );
        Ok((parent_first, parent_rest))
    }

    fn insert_child(&mut self, index: usize, separator: Key, sibling: PageId) {
        self.keys.insert(index, separator);
        self.children.insert(index + 1, sibling);
    }

    fn overflow_or_sync(&mut self, meta: &BPlusTreeMetadata) -> Result<InsertOutcome> {
        if self.keys.len() > meta.max_keys() {
            return self.split(meta);
        }
        self.sync(meta)?;
        Ok(InsertOutcome::Absorbed)
    }

    fn split(&mut self, meta: &BPlusTreeMetadata) -> Result<InsertOutcome> {
        let d = meta.order();
        let mut right_keys = self.keys.split_off(d);
        let separator = right_keys.remove(0);
        let right_children = self.children.split_off(d + 1);

        let right = InnerNode::new(meta, right_keys, right_children)?;
        self.sync(meta)?;

        trace!(
            inner = self.page_id.0,
            sibling = right.page_id.0,
            separator = %separator,
            "split inner node"
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
