//! # Storage Module
//!
//! The storage layer owns everything below the B+Tree: a pre-allocated
//! fixed-size page file, the replacement policies that decide which resident
//! page to give up, and the buffer pool that ties the two together.
//!
//! ## Architecture Overview
//!
//! ```text
//! BufferPool::fix_page(id) ──hit──> pinned PageGuard into a resident frame
//!        │
//!        └──miss──> ReplacementPolicy::evict() ──> PageStore::flush(victim)
//!                   PageStore::load(id)        ──> new resident frame
//! ```
//!
//! The pool is the only component that reads or writes pages through the
//! store. Callers never see the file; they see page buffers.
//!
//! ## Residency Model
//!
//! At most [`BUFFER_POOL_CAPACITY`] pages are resident at once. A page is
//! brought in on first access and stays until the policy chooses it as a
//! victim. Pages mutated through a guard are flushed on eviction and on pool
//! teardown; until then the file holds stale bytes. Durability is
//! "survives process exit": writes reach the OS immediately, and teardown
//! additionally syncs the file. There is no write-ahead log.
//!
//! ## Safety Model
//!
//! A [`PageGuard`] pins its frame, and eviction skips pinned frames, so a
//! held guard stays valid across further `fix_page` calls. This expresses
//! the classic buffer-manager aliasing hazard (fixing page B may evict
//! page A) structurally instead of by convention.
//!
//! ## Thread Safety
//!
//! The engine is single-threaded by design. The mutexes inside
//! [`PageStore`] and [`BufferPool`] are defensive structure, not a
//! concurrency story.

mod policy;
mod pool;
mod store;

pub use policy::{FifoPolicy, LruPolicy, ReplacementPolicy};
pub use pool::{BufferPool, PageGuard};
pub use store::PageStore;

pub use crate::config::{BUFFER_POOL_CAPACITY, MAX_PAGES, PAGE_SIZE};

/// Index of a page within the backing file. Page 0 is reserved for callers;
/// the B+Tree allocates from 1 upward.
pub type PageId = u16;
