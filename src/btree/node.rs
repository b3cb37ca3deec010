//! # Node Header and Entry Traits
//!
//! Every B+Tree node begins with a 32-byte header overlaid on byte 0 of its
//! page. The header fields use little-endian wrapper types, which keeps the
//! struct alignment-1 (overlayable anywhere in a byte buffer) and makes the
//! on-disk layout identical across mount/unmount.
//!
//! ## Header Layout (32 bytes)
//!
//! ```text
//! Offset  Size  Field     Description
//! ------  ----  --------  -----------------------------------------
//! 0       2     level     0 for leaves, >0 for interior nodes
//! 2       2     count     leaf: #pairs; interior: #children
//! 4       8     page_id   id of the page holding this node
//! 12      2     splits    reserved bookkeeping
//! 14      8     parent    reserved bookkeeping
//! 22      1     dirty     reserved (the pool tracks dirtiness itself)
//! 23      9     reserved  pads the header to 32 bytes
//! ```
//!
//! ## Entry Types
//!
//! Keys and values are fixed-width plain-data types; [`FixedEntry`] names
//! the zerocopy bounds they need. Entries are read and written by copy
//! through their byte representations, so arbitrary entry alignment inside
//! the page is fine.

use eyre::{ensure, Result};
use zerocopy::little_endian::{U16, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::storage::PageId;

pub const NODE_HEADER_SIZE: usize = 32;

/// Bounds required of a fixed-width key or value stored inside a node page.
pub trait FixedEntry: FromBytes + IntoBytes + Immutable + KnownLayout + Copy {}

impl<T: FromBytes + IntoBytes + Immutable + KnownLayout + Copy> FixedEntry for T {}

/// Copies one entry out of its exactly-sized slice. Entries are moved by
/// copy instead of reference so the page buffer needs no particular
/// alignment.
pub(crate) fn read_entry<T: FixedEntry>(bytes: &[u8]) -> T {
    let mut entry = T::new_zeroed();
    entry.as_mut_bytes().copy_from_slice(bytes);
    entry
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NodeHeader {
    level: U16,
    count: U16,
    page_id: U64,
    splits: U16,
    parent: U64,
    dirty: u8,
    reserved: [u8; 9],
}

const _: () = assert!(
    std::mem::size_of::<NodeHeader>() == NODE_HEADER_SIZE,
    "NodeHeader layout drifted from its on-disk size"
);

impl NodeHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            NODE_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            NODE_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut data[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    /// Stamps a fresh header over `data`, clearing every field.
    pub fn init(data: &mut [u8], level: u16, page_id: PageId) -> Result<&mut Self> {
        let header = Self::from_bytes_mut(data)?;
        header.level = U16::new(level);
        header.count = U16::new(0);
        header.page_id = U64::new(page_id as u64);
        header.splits = U16::new(0);
        header.parent = U64::new(0);
        header.dirty = 0;
        header.reserved = [0; 9];
        Ok(header)
    }

    pub fn level(&self) -> u16 {
        self.level.get()
    }

    pub fn is_leaf(&self) -> bool {
        self.level.get() == 0
    }

    pub fn count(&self) -> u16 {
        self.count.get()
    }

    pub fn set_count(&mut self, count: u16) {
        self.count = U16::new(count);
    }

    pub fn page_id(&self) -> u64 {
        self.page_id.get()
    }
}
