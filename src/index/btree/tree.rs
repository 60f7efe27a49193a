//! The B+ tree facade.

use std::path::Path;

use tracing::debug;

use crate::common::config::PAGE_PAYLOAD_SIZE;
use crate::common::{Error, PageId, Result};
use crate::index::btree::inner::InnerNode;
use crate::index::btree::iter::ScanIter;
use crate::index::btree::leaf::LeafNode;
use crate::index::btree::metadata::BPlusTreeMetadata;
use crate::index::btree::node::{self, InsertOutcome, Node};
use crate::storage::DiskManager;
use crate::types::{Key, KeyType, RecordId};

/// A disk-resident B+ tree mapping unique keys to record ids.
///
/// Every node lives on its own page of the backing file and is written back
/// after each mutation. Page 0 holds the header (order, key type, root).
///
/// # Example
/// ```no_run
/// use bptree::{BPlusTree, Key, KeyType, RecordId};
///
/// let mut tree = BPlusTree::create("orders.idx", KeyType::Int, 2)?;
/// tree.put(Key::Int(7), RecordId::new(3, 1))?;
/// assert_eq!(tree.get(&Key::Int(7))?, Some(RecordId::new(3, 1)));
/// # Ok::<(), bptree::Error>(())
/// ```
pub struct BPlusTree {
    meta: BPlusTreeMetadata,
}

impl BPlusTree {
    /// Create a new tree backed by a new file at `path`.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `order` is 0 or too large for one page.
    ///   Nothing is written in that case.
    /// - `Error::KeyTypeMismatch` for a zero-width key type, which the
    ///   header could not describe on reopen.
    /// - `Error::Io` if the file exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, key_type: KeyType, order: usize) -> Result<Self> {
        if key_type.size_in_bytes() == 0 {
            return Err(Error::KeyTypeMismatch {
                expected: "a key type at least one byte wide".to_string(),
                found: key_type.to_string(),
            });
        }
        let max = Self::max_order(PAGE_PAYLOAD_SIZE, key_type);
        if order == 0 || order > max {
            return Err(Error::InvalidOrder { order, max });
        }

        let disk = DiskManager::create(path.as_ref())?;
        let mut meta = BPlusTreeMetadata::new(disk, key_type, order);
        let root = LeafNode::new(&meta, Vec::new(), Vec::new(), None)?;
        meta.set_root(root.page_id());
        meta.write_header()?;

        debug!(
            path = %path.as_ref().display(),
            key_type = %key_type,
            order,
            "created B+ tree"
        );
        Ok(Self { meta })
    }

    /// Open an existing tree, reading order, key type and root from its
    /// header page.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let disk = DiskManager::open(path.as_ref())?;
        let meta = BPlusTreeMetadata::load(disk)?;

        let max = Self::max_order(PAGE_PAYLOAD_SIZE, meta.key_type());
        if meta.order() > max {
            return Err(Error::InvalidHeader(format!(
                "order {} exceeds the maximum {} for {} keys",
                meta.order(),
                max,
                meta.key_type()
            )));
        }

        debug!(
            path = %path.as_ref().display(),
            key_type = %meta.key_type(),
            order = meta.order(),
            root = meta.root().0,
            "opened B+ tree"
        );
        Ok(Self { meta })
    }

    /// Largest order whose nodes fit in `page_size` bytes.
    pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
        LeafNode::max_order(page_size, key_type).min(InnerNode::max_order(page_size, key_type))
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.meta.key_type()
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.meta.order()
    }

    #[inline]
    pub fn root_page_id(&self) -> PageId {
        self.meta.root()
    }

    fn root(&self) -> Result<Node> {
        Node::load(&self.meta, self.meta.root())
    }

    pub fn get(&self, key: &Key) -> Result<Option<RecordId>> {
        self.meta.key_type().check(key)?;
        let leaf = self.root()?.get(&self.meta, key)?;
        Ok(leaf.get_key(key))
    }

    /// Insert a new mapping. Grows a new root when the old one splits.
    ///
    /// # Errors
    /// `Error::DuplicateKey` if `key` is already present. The tree is left
    /// unchanged.
    pub fn put(&mut self, key: Key, rid: RecordId) -> Result<()> {
        self.meta.key_type().check(&key)?;
        let mut root = self.root()?;
        if let InsertOutcome::Split { separator, sibling } = root.put(&self.meta, key, rid)? {
            self.grow_root(root.page_id(), separator, sibling)?;
        }
        Ok(())
    }

    /// Delete `key` if present. Nodes are never merged.
    pub fn remove(&mut self, key: &Key) -> Result<()> {
        self.meta.key_type().check(key)?;
        self.root()?.remove(&self.meta, key)
    }

    /// Build the tree from a stream sorted by strictly increasing key.
    ///
    /// Leaves are packed to `⌈2d · fill_factor⌉` entries. Inner nodes are
    /// packed as full as possible, level by level, so the whole load is a
    /// single pass over the data.
    ///
    /// # Errors
    /// - `Error::NonEmptyBulkLoad` unless the root is a leaf with no
    ///   entries. A tree whose root is an inner node is never empty, even if
    ///   every key has been removed.
    /// - `Error::InvalidFillFactor` if `fill_factor` is outside `(0, 1]`.
    ///
    /// Both are raised before any page is written.
    ///
    /// The new tree is built on freshly allocated pages and only becomes
    /// the root once the whole stream has loaded. If a later key is rejected
    /// (`KeyTypeMismatch`, `DuplicateKey`, `UnsortedBulkLoad`) the tree keeps
    /// its old empty root and the partial build is left unreachable.
    pub fn bulk_load<I>(&mut self, data: I, fill_factor: f32) -> Result<()>
    where
        I: IntoIterator<Item = (Key, RecordId)>,
    {
        if !self.root()?.is_empty_leaf() {
            return Err(Error::NonEmptyBulkLoad);
        }
        node::fill_target(self.meta.max_keys(), fill_factor)?;

        let mut data = data.into_iter().peekable();
        if data.peek().is_none() {
            return Ok(());
        }

        let mut leaf = LeafNode::new(&self.meta, Vec::new(), Vec::new(), None)?;
        let first = leaf.page_id();
        let mut rest = Vec::new();
        while let InsertOutcome::Split { separator, sibling } =
            leaf.bulk_load(&self.meta, &mut data, fill_factor)?
        {
            rest.push((separator, sibling));
            leaf = LeafNode::from_page(&self.meta, sibling)?;
        }
        let leaves = rest.len() + 1;

        let mut level = (first, rest);
        let mut height = 1;
        while !level.1.is_empty() {
            level = InnerNode::build_level(&self.meta, level.0, level.1)?;
            height += 1;
        }

        let (root, _) = level;
        self.meta.set_root(root);
        self.meta.write_header()?;
        debug!(leaves, height, root = root.0, "bulk loaded B+ tree");
        Ok(())
    }

    /// Every record id in key order.
    pub fn scan_all(&self) -> Result<ScanIter<'_>> {
        let leaf = self.root()?.leftmost_leaf(&self.meta)?;
        Ok(leaf.scan_all(&self.meta))
    }

    /// Record ids of every key `>= key`, in key order.
    pub fn scan_greater_equal(&self, key: &Key) -> Result<ScanIter<'_>> {
        self.meta.key_type().check(key)?;
        let leaf = self.root()?.get(&self.meta, key)?;
        Ok(leaf.scan_greater_equal(&self.meta, key))
    }

    /// S-expression rendering of the whole tree; `()` when empty.
    pub fn to_sexp(&self) -> Result<String> {
        self.root()?.to_sexp(&self.meta)
    }

    /// Graphviz DOT rendering of the whole tree.
    pub fn to_dot(&self) -> Result<String> {
        let mut out = String::from("digraph g {\n  node [shape=record, height=0.1];\n");
        self.root()?.write_dot(&self.meta, &mut out)?;
        out.push_str("}\n");
        Ok(out)
    }

    /// Make every page written so far durable.
    pub fn flush(&self) -> Result<()> {
        self.meta.sync()
    }

    fn grow_root(&mut self, old_root: PageId, separator: Key, sibling: PageId) -> Result<()> {
        let root = InnerNode::new(&self.meta, vec![separator], vec![old_root, sibling])?;
        self.meta.set_root(root.page_id());
        self.meta.write_header()?;
        debug!(old_root = old_root.0, new_root = root.page_id().0, "grew new root");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn tree(key_type: KeyType, order: usize) -> (BPlusTree, TempDir) {
        let dir = tempdir().unwrap();
        let tree = BPlusTree::create(dir.path().join("tree.idx"), key_type, order).unwrap();
        (tree, dir)
    }

    fn rid(i: i32) -> RecordId {
        RecordId::new(i as u32, i as u16)
    }

    #[test]
    fn test_create_rejects_bad_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.idx");

        assert!(matches!(
            BPlusTree::create(&path, KeyType::Int, 0),
            Err(Error::InvalidOrder { order: 0, .. })
        ));
        let max = BPlusTree::max_order(PAGE_PAYLOAD_SIZE, KeyType::Int);
        assert!(matches!(
            BPlusTree::create(&path, KeyType::Int, max + 1),
            Err(Error::InvalidOrder { .. })
        ));
        assert!(!path.exists());

        assert!(BPlusTree::create(&path, KeyType::Int, max).is_ok());
    }

    #[test]
    fn test_create_rejects_zero_width_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zero.idx");

        assert!(matches!(
            BPlusTree::create(&path, KeyType::String(0), 2),
            Err(Error::KeyTypeMismatch { .. })
        ));
        assert!(!path.exists());

        // Any width that is accepted survives a reopen
        drop(BPlusTree::create(&path, KeyType::String(1), 2).unwrap());
        assert_eq!(BPlusTree::open(&path).unwrap().key_type(), KeyType::String(1));
    }

    #[test]
    fn test_empty_tree() {
        let (tree, _dir) = tree(KeyType::Int, 2);
        assert_eq!(tree.to_sexp().unwrap(), "()");
        assert_eq!(tree.get(&Key::Int(1)).unwrap(), None);
        assert_eq!(tree.scan_all().unwrap().count(), 0);
        assert_eq!(tree.order(), 2);
        assert_eq!(tree.key_type(), KeyType::Int);
    }

    #[test]
    fn test_root_split_grows_tree() {
        let (mut tree, _dir) = tree(KeyType::Int, 1);
        let first_root = tree.root_page_id();

        tree.put(Key::Int(1), rid(1)).unwrap();
        tree.put(Key::Int(2), rid(2)).unwrap();
        assert_eq!(tree.root_page_id(), first_root);

        tree.put(Key::Int(3), rid(3)).unwrap();
        assert_ne!(tree.root_page_id(), first_root);
        assert_eq!(
            tree.to_sexp().unwrap(),
            "(((1 (1 1)) (2 (2 2))) 3 ((3 (3 3))))"
        );
    }

    #[test]
    fn test_key_type_mismatch() {
        let (mut tree, _dir) = tree(KeyType::Int, 2);
        assert!(matches!(
            tree.put(Key::Long(1), rid(1)),
            Err(Error::KeyTypeMismatch { .. })
        ));
        assert!(tree.get(&Key::from("a")).is_err());
        assert!(tree.remove(&Key::Bool(true)).is_err());
        assert!(tree.scan_greater_equal(&Key::Float(1.0)).is_err());
    }

    #[test]
    fn test_bulk_load_rejects_bad_fill_factor_before_writing() {
        let (mut tree, _dir) = tree(KeyType::Int, 2);
        let data = (1..10).map(|i| (Key::Int(i), rid(i)));
        assert!(matches!(
            tree.bulk_load(data, 1.5),
            Err(Error::InvalidFillFactor(_))
        ));
        assert_eq!(tree.to_sexp().unwrap(), "()");
    }

    #[test]
    fn test_bulk_load_empty_stream() {
        let (mut tree, _dir) = tree(KeyType::Int, 2);
        tree.bulk_load(std::iter::empty(), 0.75).unwrap();
        assert_eq!(tree.to_sexp().unwrap(), "()");

        // Still empty, so a second load is allowed
        tree.bulk_load((1..4).map(|i| (Key::Int(i), rid(i))), 0.75).unwrap();
        assert_eq!(tree.to_sexp().unwrap(), "((1 (1 1)) (2 (2 2)) (3 (3 3)))");
    }

    #[test]
    fn test_failed_bulk_load_leaves_tree_empty() {
        let (mut tree, _dir) = tree(KeyType::Int, 2);
        let root = tree.root_page_id();

        let data = (1..=10)
            .map(|i| (Key::Int(i), rid(i)))
            .chain(std::iter::once((Key::Long(11), rid(11))));
        assert!(matches!(
            tree.bulk_load(data, 0.75),
            Err(Error::KeyTypeMismatch { .. })
        ));

        assert_eq!(tree.root_page_id(), root);
        assert_eq!(tree.to_sexp().unwrap(), "()");
        assert_eq!(tree.scan_all().unwrap().count(), 0);
        assert_eq!(tree.get(&Key::Int(1)).unwrap(), None);

        // The tree is still empty, so loading again works
        tree.bulk_load((1..=11).map(|i| (Key::Int(i), rid(i))), 0.75).unwrap();
        assert_eq!(tree.scan_all().unwrap().count(), 11);
        assert_ne!(tree.root_page_id(), root);
    }

    #[test]
    fn test_bulk_load_rejects_duplicate_on_leaf_boundary() {
        let (mut tree, _dir) = tree(KeyType::Int, 1);

        // With d = 1 and a full fill, the second 2 opens the next leaf
        let data = vec![
            (Key::Int(1), rid(1)),
            (Key::Int(2), rid(2)),
            (Key::Int(2), rid(99)),
            (Key::Int(3), rid(3)),
        ];
        assert!(matches!(
            tree.bulk_load(data, 1.0),
            Err(Error::DuplicateKey(_))
        ));
        assert_eq!(tree.to_sexp().unwrap(), "()");

        tree.bulk_load((1..=3).map(|i| (Key::Int(i), rid(i))), 1.0).unwrap();
        assert_eq!(
            tree.to_sexp().unwrap(),
            "(((1 (1 1)) (2 (2 2))) 3 ((3 (3 3))))"
        );
    }

    #[test]
    fn test_bulk_load_rejects_unsorted_input() {
        let (mut tree, _dir) = tree(KeyType::Int, 1);

        // Out of order inside a leaf
        let data = vec![(Key::Int(5), rid(5)), (Key::Int(4), rid(4))];
        assert!(matches!(
            tree.bulk_load(data, 1.0),
            Err(Error::UnsortedBulkLoad { .. })
        ));

        // Out of order across a leaf boundary
        let data = vec![
            (Key::Int(1), rid(1)),
            (Key::Int(5), rid(5)),
            (Key::Int(3), rid(3)),
        ];
        assert!(matches!(
            tree.bulk_load(data, 1.0),
            Err(Error::UnsortedBulkLoad { .. })
        ));
        assert_eq!(tree.to_sexp().unwrap(), "()");
    }

    #[test]
    fn test_to_dot() {
        let (mut tree, _dir) = tree(KeyType::Int, 1);
        for i in 1..=3 {
            tree.put(Key::Int(i), rid(i)).unwrap();
        }

        let dot = tree.to_dot().unwrap();
        assert!(dot.starts_with("digraph g {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("<f0>|3|<f1>"));
        assert!(dot.contains("1: (1 1)|2: (2 2)"));
        assert_eq!(dot.matches("->").count(), 2);
    }

    #[test]
    fn test_max_order() {
        assert_eq!(BPlusTree::max_order(100, KeyType::Int), 4);
        assert_eq!(BPlusTree::max_order(0, KeyType::Int), 0);
        assert!(BPlusTree::max_order(PAGE_PAYLOAD_SIZE, KeyType::String(32)) > 0);
    }
}
