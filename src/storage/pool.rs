//! # Buffer Pool
//!
//! A bounded residency cache in front of [`PageStore`]. The single public
//! primitive is [`BufferPool::fix_page`], which brings a page into memory
//! (evicting another if the pool is full) and returns a pinned
//! [`PageGuard`] through which the caller reads and mutates the page
//! buffer in place.
//!
//! ## Fix Protocol
//!
//! 1. Hit: the policy is told about the access and the frame is pinned.
//! 2. Miss with a full pool: the policy names victims until an unpinned
//!    one is found; a dirty victim is flushed to the store before its
//!    frame is dropped. If every resident frame is pinned, fixing fails.
//! 3. The page is loaded from the store into a fresh frame, pinned, and
//!    tracked by the policy.
//!
//! ## Pin/Unpin
//!
//! A guard pins its frame for its whole lifetime and unpins on drop.
//! Eviction skips pinned frames, so a guard held across further
//! `fix_page` calls stays valid. This rules out the classic buffer-manager
//! aliasing hazard ("fixing page B may evict page A") structurally.
//!
//! Fixing the same page twice yields two guards over one frame; callers
//! must not do this while mutating. The tree never does: it holds at most
//! one guard per distinct page (leaf + split sibling + parent).
//!
//! ## Write-Back
//!
//! Only frames mutated through [`PageGuard::data_mut`] are marked dirty.
//! Dirty frames reach the file on eviction and on [`BufferPool::flush_all`],
//! which `Drop` runs best-effort; a clean frame is byte-identical to disk
//! and is simply dropped.

use std::collections::HashMap;

use eyre::{bail, Result};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::policy::{LruPolicy, ReplacementPolicy};
use super::store::PageStore;
use super::PageId;
use crate::config::{BUFFER_POOL_CAPACITY, PAGE_SIZE};

struct Frame {
    data: Box<[u8; PAGE_SIZE]>,
    pin_count: u32,
    dirty: bool,
}

pub struct BufferPool {
    store: Mutex<PageStore>,
    frames: Mutex<HashMap<PageId, Frame>>,
    policy: Mutex<Box<dyn ReplacementPolicy>>,
    capacity: usize,
}

impl BufferPool {
    /// Opens `path` (truncating when asked) behind a pool of
    /// [`BUFFER_POOL_CAPACITY`] frames with LRU replacement.
    pub fn open<P: AsRef<std::path::Path>>(path: P, truncate: bool) -> Result<Self> {
        let store = PageStore::open(path, truncate)?;
        Ok(Self::with_policy(
            store,
            Box::new(LruPolicy::new(BUFFER_POOL_CAPACITY)),
            BUFFER_POOL_CAPACITY,
        ))
    }

    /// Builds a pool over an already-open store with an explicit policy and
    /// capacity. The policy's capacity must match `capacity`, since the
    /// policy tracks exactly the resident set.
    pub fn with_policy(
        store: PageStore,
        policy: Box<dyn ReplacementPolicy>,
        capacity: usize,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            frames: Mutex::new(HashMap::with_capacity(capacity)),
            policy: Mutex::new(policy),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn resident_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn page_count(&self) -> usize {
        self.store.lock().page_count()
    }

    /// Brings `page_id` into memory and returns a pinned guard over its
    /// buffer. Fails if the store errors or if the pool is full of pinned
    /// pages.
    pub fn fix_page(&self, page_id: PageId) -> Result<PageGuard<'_>> {
        let mut frames = self.frames.lock();

        if let Some(frame) = frames.get_mut(&page_id) {
            frame.pin_count += 1;
            self.policy.lock().touch(page_id);
            return Ok(PageGuard { pool: self, page_id });
        }

        if frames.len() >= self.capacity {
            self.evict_one(&mut frames)?;
        }

        let data = {
            let mut store = self.store.lock();
            // The file is pre-sized to MAX_PAGES; this covers ids past the
            // current extent.
            store.extend_to(page_id)?;
            store.load(page_id)?
        };

        frames.insert(
            page_id,
            Frame {
                data,
                pin_count: 1,
                dirty: false,
            },
        );
        self.policy.lock().touch(page_id);

        Ok(PageGuard { pool: self, page_id })
    }

    fn evict_one(&self, frames: &mut HashMap<PageId, Frame>) -> Result<()> {
        let mut policy = self.policy.lock();

        let mut skipped: SmallVec<[PageId; 4]> = SmallVec::new();
        let mut victim = None;
        while let Some(candidate) = policy.evict() {
            if frames.get(&candidate).is_some_and(|f| f.pin_count > 0) {
                skipped.push(candidate);
                continue;
            }
            victim = Some(candidate);
            break;
        }

        // Pinned pages stay resident; put them back in recency order.
        for &page_id in &skipped {
            policy.touch(page_id);
        }
        drop(policy);

        let Some(victim) = victim else {
            bail!(
                "buffer pool is full and every resident page is pinned (capacity={})",
                self.capacity
            );
        };

        if let Some(frame) = frames.get(&victim) {
            if frame.dirty {
                self.store.lock().flush(victim, &frame.data)?;
            }
        }
        frames.remove(&victim);

        Ok(())
    }

    /// Writes every dirty resident frame back to the store, syncs the file,
    /// and returns how many frames were flushed.
    pub fn flush_all(&self) -> Result<usize> {
        let mut frames = self.frames.lock();
        let mut store = self.store.lock();

        let mut flushed = 0;
        for (&page_id, frame) in frames.iter_mut() {
            if frame.dirty {
                store.flush(page_id, &frame.data)?;
                frame.dirty = false;
                flushed += 1;
            }
        }

        store.sync()?;
        Ok(flushed)
    }

    fn data(&self, page_id: PageId) -> Option<&[u8]> {
        let frames = self.frames.lock();
        frames.get(&page_id).map(|frame| {
            let ptr = frame.data.as_ptr();
            // SAFETY: frame.data is a Box<[u8; PAGE_SIZE]>, valid for
            // PAGE_SIZE bytes, and the heap allocation is stable even when
            // the frame table rehashes. A pinned frame is never evicted, so
            // the slice remains valid while the caller's PageGuard (which
            // holds the pin) is alive.
            unsafe { std::slice::from_raw_parts(ptr, PAGE_SIZE) }
        })
    }

    // SAFETY: returns a mutable slice whose lifetime outlives the short
    // frame-table lock. The caller must guarantee exclusive access; this is
    // private and only reachable from PageGuard::data_mut, which takes
    // &mut self, so exclusivity holds at the guard level.
    #[allow(clippy::mut_from_ref)]
    unsafe fn data_mut_unchecked(&self, page_id: PageId) -> Option<&mut [u8]> {
        let mut frames = self.frames.lock();
        frames.get_mut(&page_id).map(|frame| {
            frame.dirty = true;
            let ptr = frame.data.as_mut_ptr();
            // SAFETY: same validity and stability argument as in data(); the
            // pin held by the guard keeps the frame resident.
            std::slice::from_raw_parts_mut(ptr, PAGE_SIZE)
        })
    }

    fn unpin(&self, page_id: PageId) {
        let mut frames = self.frames.lock();
        if let Some(frame) = frames.get_mut(&page_id) {
            debug_assert!(frame.pin_count > 0, "unpin of an unpinned page");
            frame.pin_count -= 1;
        }
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Teardown write-back is best effort; errors have nowhere to go
        // from Drop.
        let _ = self.flush_all();
    }
}

/// A pinned reference to a resident page. The page buffer may be mutated in
/// place through [`data_mut`](PageGuard::data_mut); write-back happens on
/// eviction or pool teardown.
pub struct PageGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard").field("page_id", &self.page_id).finish()
    }
}

impl PageGuard<'_> {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        self.pool.data(self.page_id).expect("page not resident") // INVARIANT: a PageGuard pins its frame
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        // SAFETY: &mut self gives exclusive access through this guard, and
        // the pinned frame cannot be evicted while the guard exists.
        unsafe {
            self.pool
                .data_mut_unchecked(self.page_id)
                .expect("page not resident") // INVARIANT: a PageGuard pins its frame
        }
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin(self.page_id);
    }
}
