//! # B+Tree
//!
//! The tree proper: an ordered, unique-key map from fixed-width keys to
//! fixed-width values. Nodes live in pages fetched through the buffer pool;
//! the tree itself holds only the root page id and a monotonic allocation
//! counter.
//!
//! ## Insert Algorithm
//!
//! ```text
//! 1. No root yet: allocate a page, stamp an empty leaf, insert, done.
//! 2. Descend from the root, recording the interior path.
//! 3. At the leaf: overwrite on key match; plain insert when there is
//!    room; otherwise split into a fresh sibling and insert into the
//!    side the ordering dictates.
//! 4. Propagate the separator up the recorded path. A parent that
//!    reaches capacity splits in turn; when the path runs out, a new
//!    root is created above the old one.
//! ```
//!
//! ## Persistence Contract
//!
//! Page ids are allocated from 1 (page 0 is reserved) and never reused.
//! The root id and the allocation counter are not persisted in the file:
//! a caller reopening an existing file must pass the values it saved at
//! teardown to [`BTree::with_root`]. Deletion never merges, never
//! rebalances, and never collapses the root, so a tree emptied by `erase`
//! keeps its structure and simply answers every lookup with absent.
//!
//! ## Failure Semantics
//!
//! I/O errors abort the running operation without rollback; with no
//! write-ahead log the on-disk tree may then be inconsistent, which this
//! engine accepts by design. Structural violations (a split that would
//! overflow a node, a split child missing from its parent, running out of
//! pages) are fatal assertions.

use std::marker::PhantomData;
use std::mem::size_of;

use eyre::Result;
use smallvec::SmallVec;

use super::interior::{InteriorNode, InteriorNodeMut, INTERIOR_CAPACITY};
use super::leaf::{LeafNode, LeafNodeMut, SearchResult, LEAF_CAPACITY};
use super::node::{FixedEntry, NodeHeader, NODE_HEADER_SIZE};
use crate::config::{MAX_PAGES, PAGE_SIZE};
use crate::storage::{BufferPool, PageId};

/// Page 0 is reserved; allocation starts here.
const FIRST_ALLOC_PAGE: PageId = 1;

type PathStack = SmallVec<[PageId; 8]>;

pub struct BTree<'p, K, V> {
    pool: &'p BufferPool,
    root: Option<PageId>,
    next_page_id: PageId,
    _entries: PhantomData<(K, V)>,
}

impl<'p, K: FixedEntry + Ord, V: FixedEntry> BTree<'p, K, V> {
    /// An empty tree over `pool`.
    pub fn new(pool: &'p BufferPool) -> Self {
        Self::with_root(pool, None, FIRST_ALLOC_PAGE)
    }

    /// A tree over an existing file. `root` and `next_page_id` are the
    /// values the caller saved before tearing the previous pool down; the
    /// file itself does not record them.
    pub fn with_root(pool: &'p BufferPool, root: Option<PageId>, next_page_id: PageId) -> Self {
        Self::assert_node_layout();
        assert!(
            next_page_id >= FIRST_ALLOC_PAGE,
            "next_page_id {next_page_id} would allocate the reserved page 0"
        );
        Self {
            pool,
            root,
            next_page_id,
            _entries: PhantomData,
        }
    }

    fn assert_node_layout() {
        let leaf_bytes = NODE_HEADER_SIZE + LEAF_CAPACITY * (size_of::<K>() + size_of::<V>());
        assert!(
            leaf_bytes <= PAGE_SIZE,
            "leaf layout ({leaf_bytes} bytes) does not fit a {PAGE_SIZE}-byte page"
        );
        let interior_bytes = NODE_HEADER_SIZE
            + (INTERIOR_CAPACITY - 1) * size_of::<K>()
            + INTERIOR_CAPACITY * size_of::<u64>();
        assert!(
            interior_bytes <= PAGE_SIZE,
            "interior layout ({interior_bytes} bytes) does not fit a {PAGE_SIZE}-byte page"
        );
    }

    /// Root page id, if any entry was ever inserted.
    pub fn root(&self) -> Option<PageId> {
        self.root
    }

    /// Next page id the tree would allocate. Saved together with the root
    /// id by callers that reopen the file later.
    pub fn next_page_id(&self) -> PageId {
        self.next_page_id
    }

    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        assert!(
            (page_id as usize) < MAX_PAGES,
            "page allocation exhausted the {MAX_PAGES}-page file"
        );
        self.next_page_id += 1;
        page_id
    }

    /// Looks up `key`, returning its value or `None`.
    pub fn lookup(&self, key: &K) -> Result<Option<V>> {
        let Some(root) = self.root else {
            return Ok(None);
        };

        let mut current = root;
        loop {
            let guard = self.pool.fix_page(current)?;
            let data = guard.data();

            if NodeHeader::from_bytes(data)?.is_leaf() {
                let leaf = LeafNode::<K, V>::from_page(data)?;
                return Ok(match leaf.find_key(key) {
                    SearchResult::Found(pos) => Some(leaf.value_at(pos)),
                    SearchResult::NotFound(_) => None,
                });
            }

            let interior = InteriorNode::<K>::from_page(data)?;
            current = interior.child_at(interior.lower_bound(key));
        }
    }

    /// Inserts `key` with `value`, overwriting silently on key match.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let Some(root) = self.root else {
            let page_id = self.allocate_page();
            let mut guard = self.pool.fix_page(page_id)?;
            let mut leaf = LeafNodeMut::<K, V>::init(guard.data_mut(), page_id)?;
            leaf.insert_at(0, key, value);
            self.root = Some(page_id);
            return Ok(());
        };

        let mut path = PathStack::new();
        let mut current = root;
        loop {
            let guard = self.pool.fix_page(current)?;
            let data = guard.data();
            if NodeHeader::from_bytes(data)?.is_leaf() {
                break;
            }
            let interior = InteriorNode::<K>::from_page(data)?;
            path.push(current);
            current = interior.child_at(interior.lower_bound(&key));
        }

        let (separator, right_id) = {
            let mut guard = self.pool.fix_page(current)?;
            let mut leaf = LeafNodeMut::<K, V>::from_page(guard.data_mut())?;

            match leaf.find_key(&key) {
                SearchResult::Found(pos) => {
                    leaf.set_value_at(pos, value);
                    return Ok(());
                }
                SearchResult::NotFound(pos) if leaf.count() < LEAF_CAPACITY => {
                    leaf.insert_at(pos, key, value);
                    return Ok(());
                }
                SearchResult::NotFound(_) => {
                    let right_id = self.allocate_page();
                    let mut right_guard = self.pool.fix_page(right_id)?;
                    let mut right = LeafNodeMut::<K, V>::init(right_guard.data_mut(), right_id)?;

                    let separator = leaf.split_into(&mut right);
                    if key < separator {
                        leaf.insert(key, value);
                    } else {
                        right.insert(key, value);
                    }

                    (separator, right_id)
                }
            }
        };

        self.propagate_split(path, separator, current, right_id)
    }

    /// Walks the recorded path upward, landing `separator` between `left`
    /// and `right` and splitting any parent that fills up along the way.
    fn propagate_split(
        &mut self,
        mut path: PathStack,
        mut separator: K,
        mut left: PageId,
        mut right: PageId,
    ) -> Result<()> {
        while let Some(parent_id) = path.pop() {
            let mut guard = self.pool.fix_page(parent_id)?;
            let mut parent = InteriorNodeMut::<K>::from_page(guard.data_mut())?;

            let slot = parent.child_slot(left).unwrap_or_else(|| {
                panic!("split child {left} is not referenced by its parent {parent_id}")
            });
            parent.insert_at(slot, separator, right);

            if parent.count() < INTERIOR_CAPACITY {
                return Ok(());
            }

            let new_page_id = self.allocate_page();
            let mut new_guard = self.pool.fix_page(new_page_id)?;
            let mut sibling =
                InteriorNodeMut::<K>::init(new_guard.data_mut(), new_page_id, parent.level())?;

            separator = parent.split_into(&mut sibling);
            left = parent_id;
            right = new_page_id;
        }

        // The split reached the old root; grow the tree by one level.
        let left_level = {
            let guard = self.pool.fix_page(left)?;
            NodeHeader::from_bytes(guard.data())?.level()
        };

        let new_root_id = self.allocate_page();
        let mut guard = self.pool.fix_page(new_root_id)?;
        let mut new_root =
            InteriorNodeMut::<K>::init(guard.data_mut(), new_root_id, left_level + 1)?;
        new_root.set_first_child(left);
        new_root.insert_at(0, separator, right);

        self.root = Some(new_root_id);
        Ok(())
    }

    /// Removes `key` if present; absent keys are a silent no-op.
    pub fn erase(&mut self, key: &K) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };

        let mut current = root;
        loop {
            let guard = self.pool.fix_page(current)?;
            let data = guard.data();
            if NodeHeader::from_bytes(data)?.is_leaf() {
                break;
            }
            let interior = InteriorNode::<K>::from_page(data)?;
            current = interior.child_at(interior.lower_bound(key));
        }

        let mut guard = self.pool.fix_page(current)?;
        let mut leaf = LeafNodeMut::<K, V>::from_page(guard.data_mut())?;
        if let SearchResult::Found(pos) = leaf.find_key(key) {
            leaf.remove_at(pos);
        }

        Ok(())
    }
}
