//! # Memory Layout

/// Size of one physical frame and of one virtual page, in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// `log2(PAGE_SIZE)`; number of offset bits in an address.
pub const PAGE_SHIFT: u32 = 12;

/// First byte of physical RAM. The kernel image is loaded here.
pub const KERNEL_BASE: u64 = 0x8000_0000;

/// Amount of RAM the kernel manages.
pub const PHYS_MEM_SIZE: u64 = 128 * 1024 * 1024;

/// One past the last byte of managed physical RAM.
pub const PHYSTOP: u64 = KERNEL_BASE + PHYS_MEM_SIZE;

/// One beyond the highest possible user virtual address.
///
/// Sv39 has 39 address bits, but the top one is left unused so that
/// addresses never need sign extension.
pub const MAXVA: u64 = 1 << (9 + 9 + 9 + PAGE_SHIFT - 1);

/// Number of frames covered by the page reference table.
#[allow(clippy::cast_possible_truncation)]
pub const FRAME_COUNT: usize = (PHYS_MEM_SIZE / PAGE_SIZE) as usize;

const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
    assert!(KERNEL_BASE.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP > KERNEL_BASE);
};
