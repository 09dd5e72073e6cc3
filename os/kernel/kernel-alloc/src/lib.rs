//! # Physical Page Allocation and Copy-on-Write
//!
//! The kernel hands out physical memory in 4 KiB frames. Each frame carries a
//! reference count so that a frame can be mapped into several address spaces
//! at once after `fork`, and is only recycled when the last mapping lets go.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 CopyOnWrite                         │
//! │    • share pages on fork (COW, read-only)           │
//! │    • resolve store faults: take over or copy        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 PageAllocator                       │
//! │    • free-frame stack under one spin lock           │
//! │    • junk fill on alloc and free                    │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 PageRefTable                        │
//! │    • one spin-locked count per frame                │
//! │    • indexed by (pa - KERNEL_BASE) / PAGE_SIZE      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The allocator reaches frame contents through a [`PhysMapper`], and COW
//! handling edits mappings through the [`PageTable`](kernel_vmem::PageTable)
//! trait; neither the page-table walker nor the physical memory map lives in
//! this crate.
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_alloc::{IdentityPhysMapper, MemoryLayout, PageAllocator};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! # let end_of_kernel_image = 0x8004_0000;
//! let layout = MemoryLayout::qemu_virt(PhysicalAddress::new(end_of_kernel_image))?;
//! let kmem = PageAllocator::new(layout, IdentityPhysMapper);
//! if let Some(pa) = kmem.alloc_page() {
//!     kmem.free_page(pa);
//! }
//! # Ok::<(), kernel_alloc::LayoutError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod cow;
mod layout;
mod page_alloc;
mod page_ref;
mod phys_mapper;

pub use cow::{CopyOnWrite, CowError};
pub use layout::{LayoutError, MemoryLayout};
pub use page_alloc::{ALLOC_JUNK, FREE_JUNK, PageAllocator};
pub use page_ref::{PageRefError, PageRefTable};
pub use phys_mapper::{Frame, IdentityPhysMapper, PhysMapper};
