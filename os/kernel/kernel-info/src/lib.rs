//! # Kernel Configuration
//!
//! This crate is the single source of truth for the compile-time constants
//! shared by the memory-management crates: where physical RAM lives, how
//! large a page is, how far the user virtual address space reaches, and how
//! the disk block cache is sized.
//!
//! ## Physical Memory Layout
//!
//! The layout follows the QEMU `virt` RISC-V machine, where RAM starts at
//! [`KERNEL_BASE`](memory::KERNEL_BASE) and the kernel image is loaded at its
//! very beginning:
//!
//! ```text
//! KERNEL_BASE ┌─────────────────────────────────┐ 0x8000_0000
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS)             │
//! end         ├─────────────────────────────────┤ (linker symbol)
//!             │    Available RAM                │
//!             │  (Managed by the page allocator)│
//! PHYSTOP     └─────────────────────────────────┘ KERNEL_BASE + 128 MiB
//! ```
//!
//! Every frame in `[KERNEL_BASE, PHYSTOP)` owns one entry in the page
//! reference table; only frames in `[end, PHYSTOP)` are ever handed out.
//!
//! ## Parameters ([`param`])
//!
//! Sizing of the buffer cache (`NBUF` buffers spread over `NBUCKET` hash
//! buckets) and the size of a disk block (`BSIZE`).
//!
//! Runtime structures in the other crates default to these values but accept
//! smaller ones, which is how the host tests exercise eviction with a handful
//! of buffers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
pub mod param;
