//! # Engine Constants
//!
//! All sizing constants for the storage engine live here. The values are
//! deliberately small: the engine is a teaching-grade design and the file,
//! pool, and node geometry are chosen so every interesting state (eviction,
//! leaf splits, interior splits, multi-level trees) is reachable with short
//! workloads.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (4096)
//!       │
//!       └─> file size = MAX_PAGES * PAGE_SIZE (pre-allocated at open)
//!
//! MAX_PAGES (1000)
//!       │
//!       └─> upper bound for B+Tree page allocation (ids are never reused)
//!
//! BUFFER_POOL_CAPACITY (10)
//!       │
//!       └─> replacement policy capacity (the policy tracks exactly the
//!           resident set, so the two must match)
//! ```

/// Size of each page in bytes. This is the unit of I/O and of caching, and
/// every B+Tree node occupies exactly one page.
pub const PAGE_SIZE: usize = 4096;

/// Number of pages in the backing file. The file is pre-allocated and
/// zero-filled to this size at open; it is never shrunk.
pub const MAX_PAGES: usize = 1000;

/// Maximum number of pages resident in the buffer pool at once.
pub const BUFFER_POOL_CAPACITY: usize = 10;

/// Conventional name for the backing file. Every store is parameterized by
/// an explicit path; this is only the customary default.
pub const DEFAULT_FILE_NAME: &str = "buzzdb.dat";

const _: () = assert!(PAGE_SIZE.is_power_of_two(), "PAGE_SIZE must be a power of two");

const _: () = assert!(
    BUFFER_POOL_CAPACITY <= MAX_PAGES,
    "the pool cannot hold more pages than the file contains"
);

const _: () = assert!(
    MAX_PAGES <= u16::MAX as usize,
    "page ids are 16-bit; MAX_PAGES must fit"
);
