//! B+ Tree Tests
//!
//! Scenario tests for the tree facade: exact shapes after inserts and bulk
//! loads, bulk-load preconditions, scans over partially emptied trees, and
//! reopening from disk.

use bptree::index::btree::{InnerNode, LeafNode};
use bptree::{BPlusTree, Error, Key, KeyType, RecordId};
use tempfile::{tempdir, TempDir};

fn create_tree(order: usize) -> (BPlusTree, TempDir) {
    let dir = tempdir().unwrap();
    let tree = BPlusTree::create(dir.path().join("test.idx"), KeyType::Int, order).unwrap();
    (tree, dir)
}

fn rid(i: i32) -> RecordId {
    RecordId::new(i as u32, i as u16)
}

fn entry(i: i32) -> (Key, RecordId) {
    (Key::Int(i), rid(i))
}

fn scan(tree: &BPlusTree) -> Vec<RecordId> {
    tree.scan_all().unwrap().map(|r| r.unwrap()).collect()
}

/// Render a leaf the way `to_sexp` does.
fn leaf_sexp(keys: &[i32]) -> String {
    let entries: Vec<String> = keys
        .iter()
        .map(|&k| format!("({} ({} {}))", k, k, k))
        .collect();
    format!("({})", entries.join(" "))
}

/// `(L 4 L 7 L 10 L)` over the leaves {1,2,3} {4,5,6} {7,8,9} {10,11}.
fn one_to_eleven_sexp() -> String {
    format!(
        "({} 4 {} 7 {} 10 {})",
        leaf_sexp(&[1, 2, 3]),
        leaf_sexp(&[4, 5, 6]),
        leaf_sexp(&[7, 8, 9]),
        leaf_sexp(&[10, 11])
    )
}

// ============================================================================
// Shapes
// ============================================================================

/// Sequential inserts split every leaf at d + 1 entries.
#[test]
fn test_sequential_puts_shape() {
    let (mut tree, _dir) = create_tree(2);
    for i in 1..=11 {
        tree.put(Key::Int(i), rid(i)).unwrap();
    }

    assert_eq!(tree.to_sexp().unwrap(), one_to_eleven_sexp());
}

/// Bulk load with fill factor 0.75 packs three entries per leaf.
#[test]
fn test_bulk_load_shape() {
    let (mut tree, _dir) = create_tree(2);
    tree.bulk_load((1..=11).map(entry), 0.75).unwrap();

    assert_eq!(tree.to_sexp().unwrap(), one_to_eleven_sexp());
    for i in 1..=11 {
        assert_eq!(tree.get(&Key::Int(i)).unwrap(), Some(rid(i)));
    }
    assert_eq!(tree.get(&Key::Int(12)).unwrap(), None);
}

/// A large bulk load builds several inner levels with no single-child node.
#[test]
fn test_bulk_load_multiple_levels() {
    let (mut tree, _dir) = create_tree(1);
    tree.bulk_load((0..200).map(entry), 1.0).unwrap();

    assert_eq!(scan(&tree), (0..200).map(rid).collect::<Vec<_>>());
    for i in (0..200).step_by(7) {
        assert_eq!(tree.get(&Key::Int(i)).unwrap(), Some(rid(i)));
    }

    // The tree keeps accepting inserts after a bulk load
    tree.put(Key::Int(500), rid(500)).unwrap();
    tree.put(Key::Int(-1), RecordId::new(0, 0)).unwrap();
    assert_eq!(tree.scan_all().unwrap().count(), 202);
}

#[test]
fn test_max_order() {
    assert_eq!(LeafNode::max_order(100, KeyType::Int), 4);
    assert_eq!(InnerNode::max_order(100, KeyType::Int), 5);
    assert_eq!(BPlusTree::max_order(100, KeyType::Int), 4);
}

// ============================================================================
// Bulk load preconditions
// ============================================================================

#[test]
fn test_bulk_load_non_empty_tree() {
    let (mut tree, _dir) = create_tree(2);
    tree.put(Key::Int(0), rid(0)).unwrap();

    let result = tree.bulk_load((1..10).map(entry), 0.75);
    assert!(matches!(result, Err(Error::NonEmptyBulkLoad)));
    // Fails regardless of the arguments
    let result = tree.bulk_load(std::iter::empty(), 5.0);
    assert!(matches!(result, Err(Error::NonEmptyBulkLoad)));

    assert_eq!(scan(&tree), vec![rid(0)]);
}

/// Removing every key does not make a tree with an inner root empty.
#[test]
fn test_bulk_load_after_removing_everything() {
    let (mut tree, _dir) = create_tree(2);
    for i in 1..=11 {
        tree.put(Key::Int(i), rid(i)).unwrap();
    }
    for i in 1..=11 {
        tree.remove(&Key::Int(i)).unwrap();
    }

    assert_eq!(tree.scan_all().unwrap().count(), 0);
    let result = tree.bulk_load((20..30).map(entry), 0.75);
    assert!(matches!(result, Err(Error::NonEmptyBulkLoad)));
}

/// A root leaf emptied by removals is an empty tree again.
#[test]
fn test_bulk_load_after_emptying_root_leaf() {
    let (mut tree, _dir) = create_tree(2);
    tree.put(Key::Int(1), rid(1)).unwrap();
    tree.remove(&Key::Int(1)).unwrap();

    tree.bulk_load((1..=11).map(entry), 0.75).unwrap();
    assert_eq!(tree.to_sexp().unwrap(), one_to_eleven_sexp());
}

/// A bad entry deep in the stream leaves no half-built tree behind.
#[test]
fn test_bulk_load_fails_mid_stream_then_reloads() {
    let (mut tree, _dir) = create_tree(2);
    let data = (1..=10)
        .map(entry)
        .chain(std::iter::once((Key::Long(11), rid(11))));

    let result = tree.bulk_load(data, 0.75);
    assert!(matches!(result, Err(Error::KeyTypeMismatch { .. })));
    assert_eq!(tree.to_sexp().unwrap(), "()");
    assert!(scan(&tree).is_empty());
    assert_eq!(tree.get(&Key::Int(1)).unwrap(), None);

    tree.bulk_load((1..=11).map(entry), 0.75).unwrap();
    assert_eq!(tree.to_sexp().unwrap(), one_to_eleven_sexp());
}

#[test]
fn test_bulk_load_rejects_repeated_key() {
    let (mut tree, _dir) = create_tree(1);
    let data = vec![entry(1), entry(2), (Key::Int(2), RecordId::new(99, 99)), entry(3)];

    let result = tree.bulk_load(data, 1.0);
    assert!(matches!(result, Err(Error::DuplicateKey(_))));
    assert_eq!(tree.to_sexp().unwrap(), "()");
    assert_eq!(tree.get(&Key::Int(2)).unwrap(), None);
}

// ============================================================================
// Point operations
// ============================================================================

#[test]
fn test_duplicate_put_keeps_first_mapping() {
    let (mut tree, _dir) = create_tree(2);
    for i in 0..20 {
        tree.put(Key::Int(i), rid(i)).unwrap();
    }
    let before = tree.to_sexp().unwrap();

    let result = tree.put(Key::Int(7), RecordId::new(999, 9));
    assert!(matches!(result, Err(Error::DuplicateKey(_))));
    assert_eq!(tree.get(&Key::Int(7)).unwrap(), Some(rid(7)));
    assert_eq!(tree.to_sexp().unwrap(), before);
}

#[test]
fn test_remove_then_put_again() {
    let (mut tree, _dir) = create_tree(2);
    for i in 0..30 {
        tree.put(Key::Int(i), rid(i)).unwrap();
    }

    tree.remove(&Key::Int(12)).unwrap();
    assert_eq!(tree.get(&Key::Int(12)).unwrap(), None);
    // Removing twice is harmless
    tree.remove(&Key::Int(12)).unwrap();

    tree.put(Key::Int(12), RecordId::new(1, 2)).unwrap();
    assert_eq!(tree.get(&Key::Int(12)).unwrap(), Some(RecordId::new(1, 2)));
}

// ============================================================================
// Scans
// ============================================================================

/// Scans walk over leaves that removals left empty.
#[test]
fn test_partially_empty_scans() {
    let (mut tree, _dir) = create_tree(2);
    for i in 0..100 {
        tree.put(Key::Int(i), rid(i)).unwrap();
    }
    for i in 25..75 {
        tree.remove(&Key::Int(i)).unwrap();
    }

    let expected: Vec<RecordId> = (0..25).chain(75..100).map(rid).collect();
    assert_eq!(scan(&tree), expected);

    let from_42: Vec<RecordId> = tree
        .scan_greater_equal(&Key::Int(42))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(from_42, (75..100).map(rid).collect::<Vec<_>>());
}

#[test]
fn test_scan_greater_equal_bounds() {
    let (mut tree, _dir) = create_tree(3);
    tree.bulk_load((0..50).map(|i| entry(i * 2)), 0.5).unwrap();

    let from = |k: i32| -> Vec<RecordId> {
        tree.scan_greater_equal(&Key::Int(k))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    };

    assert_eq!(from(-10).len(), 50);
    assert_eq!(from(0).len(), 50);
    assert_eq!(from(31), (16..50).map(|i| rid(i * 2)).collect::<Vec<_>>());
    assert_eq!(from(98), vec![rid(98)]);
    assert!(from(99).is_empty());
}

#[test]
fn test_iterator_exhaustion() {
    let (mut tree, _dir) = create_tree(2);
    for i in 0..3 {
        tree.put(Key::Int(i), rid(i)).unwrap();
    }

    let mut iter = tree.scan_all().unwrap();
    for i in 0..3 {
        assert_eq!(iter.advance().unwrap(), rid(i));
    }
    assert!(matches!(iter.advance(), Err(Error::IteratorExhausted)));
    assert!(iter.next().is_none());
}

// ============================================================================
// Other key types
// ============================================================================

#[test]
fn test_string_keys() {
    let dir = tempdir().unwrap();
    let mut tree =
        BPlusTree::create(dir.path().join("names.idx"), KeyType::String(8), 2).unwrap();

    let names = ["mallory", "alice", "trent", "bob", "eve", "carol", "dave"];
    for (i, name) in names.iter().enumerate() {
        tree.put(Key::from(*name), RecordId::new(i as u32, 0)).unwrap();
    }

    assert_eq!(tree.get(&Key::from("eve")).unwrap(), Some(RecordId::new(4, 0)));
    let order: Vec<u32> = tree.scan_all().unwrap().map(|r| r.unwrap().page_num).collect();
    // alice bob carol dave eve mallory trent
    assert_eq!(order, vec![1, 3, 5, 6, 4, 0, 2]);

    let too_long = tree.put(Key::from("frederick"), RecordId::new(9, 0));
    assert!(matches!(too_long, Err(Error::KeyTypeMismatch { .. })));
}

#[test]
fn test_float_keys() {
    let dir = tempdir().unwrap();
    let mut tree = BPlusTree::create(dir.path().join("f.idx"), KeyType::Float, 2).unwrap();

    for (i, v) in [0.5f32, -3.25, 10.0, 2.0, -0.0].iter().enumerate() {
        tree.put(Key::Float(*v), RecordId::new(i as u32, 0)).unwrap();
    }
    let order: Vec<u32> = tree.scan_all().unwrap().map(|r| r.unwrap().page_num).collect();
    assert_eq!(order, vec![1, 4, 0, 3, 2]);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_reopen_after_bulk_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen.idx");

    let before = {
        let mut tree = BPlusTree::create(&path, KeyType::Int, 3).unwrap();
        tree.bulk_load((0..500).map(entry), 0.8).unwrap();
        tree.flush().unwrap();
        (scan(&tree), tree.to_sexp().unwrap(), tree.root_page_id())
    };

    let tree = BPlusTree::open(&path).unwrap();
    assert_eq!(tree.order(), 3);
    assert_eq!(tree.key_type(), KeyType::Int);
    assert_eq!(tree.root_page_id(), before.2);
    assert_eq!(scan(&tree), before.0);
    assert_eq!(tree.to_sexp().unwrap(), before.1);
}

#[test]
fn test_create_refuses_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exists.idx");
    drop(BPlusTree::create(&path, KeyType::Int, 2).unwrap());

    assert!(matches!(
        BPlusTree::create(&path, KeyType::Int, 2),
        Err(Error::Io(_))
    ));
}
