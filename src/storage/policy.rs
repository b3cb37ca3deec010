//! # Replacement Policies
//!
//! A policy is a decision engine over page ids: it is told about every
//! access and, when asked, names the next victim. It never holds a page
//! buffer, and the pool never sees the concrete policy shape, only the
//! two-method [`ReplacementPolicy`] capability.
//!
//! [`LruPolicy`] is the production policy. [`FifoPolicy`] never reorders on
//! re-access, which makes eviction order a pure function of first-touch
//! order; tests substitute it when they need to predict the victim.

use std::collections::VecDeque;

use super::PageId;

pub trait ReplacementPolicy {
    /// Records an access to `page_id` and returns whether the id was
    /// already tracked. If tracking the id would exceed capacity, the
    /// policy first evicts one id itself, then inserts.
    fn touch(&mut self, page_id: PageId) -> bool;

    /// Removes and returns the next victim, or `None` when nothing is
    /// tracked.
    fn evict(&mut self) -> Option<PageId>;
}

/// Least-recently-used eviction. Most recent at the front of the queue;
/// `touch` moves an existing id to the front, `evict` pops the back.
#[derive(Debug)]
pub struct LruPolicy {
    queue: VecDeque<PageId>,
    capacity: usize,
}

impl LruPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl ReplacementPolicy for LruPolicy {
    fn touch(&mut self, page_id: PageId) -> bool {
        let found = match self.queue.iter().position(|&id| id == page_id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        };

        if self.queue.len() == self.capacity {
            self.evict();
        }
        if self.queue.len() < self.capacity {
            self.queue.push_front(page_id);
        }

        found
    }

    fn evict(&mut self) -> Option<PageId> {
        self.queue.pop_back()
    }
}

/// First-in-first-out eviction. Re-access does not reorder, so the victim
/// sequence is fully determined by first-touch order.
#[derive(Debug)]
pub struct FifoPolicy {
    queue: VecDeque<PageId>,
    capacity: usize,
}

impl FifoPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn touch(&mut self, page_id: PageId) -> bool {
        if self.queue.contains(&page_id) {
            return true;
        }

        if self.queue.len() == self.capacity {
            self.evict();
        }
        if self.queue.len() < self.capacity {
            self.queue.push_back(page_id);
        }

        false
    }

    fn evict(&mut self) -> Option<PageId> {
        self.queue.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_least_recently_touched() {
        let mut policy = LruPolicy::new(3);

        policy.touch(1);
        policy.touch(2);
        policy.touch(3);

        assert_eq!(policy.evict(), Some(1));
        assert_eq!(policy.evict(), Some(2));
        assert_eq!(policy.evict(), Some(3));
        assert_eq!(policy.evict(), None);
    }

    #[test]
    fn lru_touch_moves_to_front() {
        let mut policy = LruPolicy::new(3);

        policy.touch(1);
        policy.touch(2);
        policy.touch(3);
        policy.touch(1);

        assert_eq!(policy.evict(), Some(2));
        assert_eq!(policy.evict(), Some(3));
        assert_eq!(policy.evict(), Some(1));
    }

    #[test]
    fn lru_touch_reports_presence() {
        let mut policy = LruPolicy::new(2);

        assert!(!policy.touch(5));
        assert!(policy.touch(5));
    }

    #[test]
    fn lru_touch_at_capacity_evicts_internally() {
        let mut policy = LruPolicy::new(2);

        policy.touch(1);
        policy.touch(2);
        policy.touch(3);

        // 1 was dropped internally; 2 is now the oldest.
        assert_eq!(policy.evict(), Some(2));
        assert_eq!(policy.evict(), Some(3));
        assert_eq!(policy.evict(), None);
    }

    #[test]
    fn fifo_ignores_reaccess_order() {
        let mut policy = FifoPolicy::new(3);

        policy.touch(1);
        policy.touch(2);
        policy.touch(3);
        assert!(policy.touch(1));

        assert_eq!(policy.evict(), Some(1));
        assert_eq!(policy.evict(), Some(2));
        assert_eq!(policy.evict(), Some(3));
    }

    #[test]
    fn fifo_touch_at_capacity_evicts_oldest() {
        let mut policy = FifoPolicy::new(2);

        policy.touch(1);
        policy.touch(2);
        policy.touch(3);

        assert_eq!(policy.evict(), Some(2));
        assert_eq!(policy.evict(), Some(3));
        assert_eq!(policy.evict(), None);
    }
}
