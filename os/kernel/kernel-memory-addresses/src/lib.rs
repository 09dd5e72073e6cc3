//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses used by the page
//! allocator, the copy-on-write fault handler and the page-table interface.
//!
//! ## Overview
//!
//! | Wrapper | Meaning |
//! |----------|----------|
//! | [`PhysicalAddress`] | A byte address in physical RAM; frames are identified by their page-aligned base. |
//! | [`VirtualAddress`] | A byte address in a (user) virtual address space, translated by a page table. |
//!
//! Both are `#[repr(transparent)]` over `u64`, implement `Copy`, `Eq`, `Ord` and
//! `Hash`, and provide the page rounding helpers the memory code needs
//! ([`page_round_down`](PhysicalAddress::page_round_down),
//! [`page_round_up`](PhysicalAddress::page_round_up),
//! [`is_page_aligned`](PhysicalAddress::is_page_aligned)). The page size is
//! [`PAGE_SIZE`](kernel_info::memory::PAGE_SIZE) (4 KiB); Sv39 super pages are
//! never produced by the allocator and are not modelled here.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0000_0000_0040_1234);
//! assert_eq!(va.page_round_down().as_u64(), 0x0040_1000);
//! assert_eq!(va.page_offset(), 0x234);
//!
//! let pa = PhysicalAddress::new(0x8000_2000);
//! assert!(pa.is_page_aligned());
//! assert_eq!(pa.checked_sub(PhysicalAddress::new(0x8000_0000)), Some(0x2000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod physical_address;
mod virtual_address;

pub use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE};
pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;

/// Round `x` down to a multiple of [`PAGE_SIZE`].
#[inline(always)]
#[must_use]
pub(crate) const fn align_down(x: u64) -> u64 {
    x & !(PAGE_SIZE - 1)
}

/// Round `x` up to a multiple of [`PAGE_SIZE`], saturating at the last page.
#[inline(always)]
#[must_use]
pub(crate) const fn align_up(x: u64) -> u64 {
    align_down(x.saturating_add(PAGE_SIZE - 1))
}
