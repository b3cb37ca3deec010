//! Round-trips across process-style boundaries: build a tree, tear the
//! pool down, reopen the same file without truncation, and read everything
//! back. The root id and allocation counter are not stored in the file, so
//! the reopening side passes the values it saved at teardown.

use buzzdb::btree::LEAF_CAPACITY;
use buzzdb::storage::PageId;
use buzzdb::{BTree, BufferPool};
use tempfile::tempdir;

#[test]
fn tree_survives_pool_teardown_and_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("buzzdb.dat");
    let n = 40 * LEAF_CAPACITY as u64;

    let (root, next_page_id) = {
        let pool = BufferPool::open(&path, true).unwrap();
        let mut tree: BTree<u64, u64> = BTree::new(&pool);

        for k in 0..n {
            tree.insert(k, 2 * k).unwrap();
        }
        for k in 0..n {
            assert_eq!(tree.lookup(&k).unwrap(), Some(2 * k));
        }

        let saved = (tree.root(), tree.next_page_id());
        drop(tree);
        pool.flush_all().unwrap();
        saved
    };

    let pool = BufferPool::open(&path, false).unwrap();
    let tree: BTree<u64, u64> = BTree::with_root(&pool, root, next_page_id);

    for k in 0..n {
        assert_eq!(tree.lookup(&k).unwrap(), Some(2 * k), "key {k} after reopen");
    }
    assert_eq!(tree.lookup(&n).unwrap(), None);
}

#[test]
fn reopened_tree_accepts_further_inserts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("buzzdb.dat");

    let (root, next_page_id) = {
        let pool = BufferPool::open(&path, true).unwrap();
        let mut tree: BTree<u64, u64> = BTree::new(&pool);
        for k in 0..LEAF_CAPACITY as u64 {
            tree.insert(k, k).unwrap();
        }
        (tree.root(), tree.next_page_id())
    };

    let pool = BufferPool::open(&path, false).unwrap();
    let mut tree: BTree<u64, u64> = BTree::with_root(&pool, root, next_page_id);

    // Push the reopened tree through its first split.
    let n = 4 * LEAF_CAPACITY as u64;
    for k in LEAF_CAPACITY as u64..n {
        tree.insert(k, k).unwrap();
    }
    for k in 0..n {
        assert_eq!(tree.lookup(&k).unwrap(), Some(k), "key {k}");
    }
}

#[test]
fn erasures_persist_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("buzzdb.dat");
    let n = 2 * LEAF_CAPACITY as u64;

    let (root, next_page_id) = {
        let pool = BufferPool::open(&path, true).unwrap();
        let mut tree: BTree<u64, u64> = BTree::new(&pool);
        for k in 0..n {
            tree.insert(k, 2 * k).unwrap();
        }
        for k in (0..n).step_by(2) {
            tree.erase(&k).unwrap();
        }
        (tree.root(), tree.next_page_id())
    };

    let pool = BufferPool::open(&path, false).unwrap();
    let tree: BTree<u64, u64> = BTree::with_root(&pool, root, next_page_id);

    for k in 0..n {
        let expected = if k % 2 == 0 { None } else { Some(2 * k) };
        assert_eq!(tree.lookup(&k).unwrap(), expected, "key {k}");
    }
}

#[test]
fn saved_root_and_counter_round_trip_as_plain_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("buzzdb.dat");

    let (root, next_page_id): (Option<PageId>, PageId) = {
        let pool = BufferPool::open(&path, true).unwrap();
        let mut tree: BTree<u64, u64> = BTree::new(&pool);
        tree.insert(1, 1).unwrap();
        (tree.root(), tree.next_page_id())
    };

    assert_eq!(root, Some(1));
    assert_eq!(next_page_id, 2);

    // A second truncating open wipes the file; the stale root then reads
    // as an empty (zeroed) leaf and every lookup is absent.
    let pool = BufferPool::open(&path, true).unwrap();
    let tree: BTree<u64, u64> = BTree::with_root(&pool, root, next_page_id);
    assert_eq!(tree.lookup(&1).unwrap(), None);
}
