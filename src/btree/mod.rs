//! # B+Tree Index
//!
//! An ordered, unique-key map from fixed-width keys to fixed-width values,
//! stored as a tree of pages fetched through the buffer pool.
//!
//! ## Node Types
//!
//! - **Leaf nodes** (level 0) hold up to [`LEAF_CAPACITY`] key/value pairs
//!   in ascending key order.
//! - **Interior nodes** (level > 0) hold up to [`INTERIOR_CAPACITY`] child
//!   page ids and one separator key between each adjacent pair of children.
//!   All keys in `children[i]`'s subtree are strictly less than `keys[i]`;
//!   all keys in `children[i+1]`'s subtree are greater or equal.
//!
//! Every node occupies exactly one page and is mutated in place through a
//! pool guard, so buffer-pool eviction is the only write-back path.
//!
//! ## Page Layout
//!
//! ```text
//! +---------------------+
//! | NodeHeader (32B)    |  level, count, bookkeeping
//! +---------------------+
//! | keys                |  [K; LEAF_CAPACITY] / [K; INTERIOR_CAPACITY - 1]
//! +---------------------+
//! | values / children   |  [V; LEAF_CAPACITY] / [u64; INTERIOR_CAPACITY]
//! +---------------------+
//! ```
//!
//! Entries are moved in and out of the page by copy, so the layout works at
//! any buffer alignment; the header itself is an alignment-1 overlay.
//!
//! ## Splitting
//!
//! A full leaf splits by moving its upper half into a freshly allocated
//! sibling; the sibling's first key becomes the separator promoted into the
//! parent. A parent that reaches capacity splits by promoting its middle
//! key, and the process recurses until a parent absorbs the separator or a
//! new root is created above the old one.
//!
//! Deletion removes the entry from its leaf and stops: no merging, no
//! rebalancing, no root collapse. Trees shrink logically but never
//! structurally.

mod interior;
mod leaf;
mod node;
mod tree;

pub use interior::{InteriorNode, InteriorNodeMut, INTERIOR_CAPACITY};
pub use leaf::{LeafNode, LeafNodeMut, SearchResult, LEAF_CAPACITY};
pub use node::{FixedEntry, NodeHeader, NODE_HEADER_SIZE};
pub use tree::BTree;
