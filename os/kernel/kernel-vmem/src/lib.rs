//! # Virtual Memory Interface
//!
//! The memory-management core does not walk or build page tables itself; it
//! consumes them through the [`PageTable`] trait and manipulates individual
//! leaf entries through [`PageTableEntry`].
//!
//! ## RISC-V Sv39 Leaf Entries
//!
//! ```text
//! | 63‒54    | 53‒10 | 9   | 8   | 7 | 6 | 5 | 4 | 3 | 2 | 1 | 0 |
//! | reserved |  PPN  | RSW | COW | D | A | G | U | X | W | R | V |
//! ```
//!
//! Bit 8 is the first of the two RSW bits the hardware leaves to software;
//! the kernel uses it to mark a page that is shared copy-on-write. A COW
//! entry is never writable: the first store faults, and the fault handler
//! either takes the frame over or gives the writer a private copy.
//!
//! ## What lives here
//! - [`PageTableEntry`]: the 64-bit leaf entry as a bitfield.
//! - [`PageTable`]: lookup (`walk`) and installation (`map_pages`) of leaf
//!   mappings, implemented by the process address-space code.
//! - [`MapError`]: why installing a mapping failed.
//! - [`MAXVA`]: one past the highest user virtual address.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod entry;

pub use crate::entry::PageTableEntry;
pub use kernel_info::memory::MAXVA;

use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// A page table rooted somewhere in physical memory.
///
/// Implementations may assume every `va` they receive is below [`MAXVA`];
/// callers that take addresses from a trap check the bound first.
pub trait PageTable {
    /// The leaf entry for `va`, if the intermediate tables exist.
    ///
    /// The returned entry may itself be invalid (`V = 0`). Never allocates.
    fn walk(&self, va: VirtualAddress) -> Option<PageTableEntry>;

    /// Mutable access to the leaf entry for `va`, if the intermediate tables
    /// exist. Never allocates.
    fn walk_mut(&mut self, va: VirtualAddress) -> Option<&mut PageTableEntry>;

    /// Map `[va, va + size)` to `[pa, pa + size)` with the permission bits of
    /// `flags`, allocating intermediate tables as needed. The new leaves are
    /// marked valid.
    ///
    /// # Errors
    /// - [`MapError::OutOfMemory`] if an intermediate table could not be allocated.
    /// - [`MapError::Remap`] if one of the pages already has a valid leaf.
    fn map_pages(
        &mut self,
        va: VirtualAddress,
        size: u64,
        pa: PhysicalAddress,
        flags: PageTableEntry,
    ) -> Result<(), MapError>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error("out of memory while allocating a page-table page")]
    OutOfMemory,
    #[error("virtual address {0} is already mapped")]
    Remap(VirtualAddress),
}
