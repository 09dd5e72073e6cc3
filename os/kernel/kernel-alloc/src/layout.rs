//! Physical memory layout handed to the page allocator at boot.

use kernel_info::memory::{KERNEL_BASE, PHYSTOP};
use kernel_memory_addresses::PhysicalAddress;

/// The physical range the allocator manages.
///
/// ```text
/// kernel_base          kernel_end               phys_top
///      │ kernel image      │ free pages             │
///      ├───────────────────┼────────────────────────┤
///      │◄──────── page reference table ────────────►│
/// ```
///
/// Frames in `[kernel_base, kernel_end)` keep a permanent reference count of
/// one and are never handed out.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryLayout {
    kernel_base: PhysicalAddress,
    kernel_end: PhysicalAddress,
    phys_top: PhysicalAddress,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("{0} is not page aligned")]
    Unaligned(PhysicalAddress),
    #[error("kernel image end {end} lies outside [{base}, {top}]")]
    KernelEndOutOfRange {
        base: PhysicalAddress,
        end: PhysicalAddress,
        top: PhysicalAddress,
    },
}

impl MemoryLayout {
    /// # Errors
    /// [`LayoutError::Unaligned`] if `kernel_base` or `phys_top` is not page
    /// aligned, [`LayoutError::KernelEndOutOfRange`] unless
    /// `kernel_base <= kernel_end <= phys_top`.
    pub const fn new(
        kernel_base: PhysicalAddress,
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    ) -> Result<Self, LayoutError> {
        if !kernel_base.is_page_aligned() {
            return Err(LayoutError::Unaligned(kernel_base));
        }
        if !phys_top.is_page_aligned() {
            return Err(LayoutError::Unaligned(phys_top));
        }
        if kernel_end.as_u64() < kernel_base.as_u64() || kernel_end.as_u64() > phys_top.as_u64() {
            return Err(LayoutError::KernelEndOutOfRange {
                base: kernel_base,
                end: kernel_end,
                top: phys_top,
            });
        }
        Ok(Self {
            kernel_base,
            kernel_end,
            phys_top,
        })
    }

    /// The QEMU `virt` machine: RAM from [`KERNEL_BASE`] to [`PHYSTOP`].
    ///
    /// `kernel_end` is the first address after the kernel image, i.e. the
    /// linker's `end` symbol.
    ///
    /// # Errors
    /// See [`MemoryLayout::new`].
    pub const fn qemu_virt(kernel_end: PhysicalAddress) -> Result<Self, LayoutError> {
        Self::new(
            PhysicalAddress::new(KERNEL_BASE),
            kernel_end,
            PhysicalAddress::new(PHYSTOP),
        )
    }

    #[must_use]
    pub const fn kernel_base(&self) -> PhysicalAddress {
        self.kernel_base
    }

    #[must_use]
    pub const fn kernel_end(&self) -> PhysicalAddress {
        self.kernel_end
    }

    #[must_use]
    pub const fn phys_top(&self) -> PhysicalAddress {
        self.phys_top
    }

    /// Number of frames between `kernel_base` and `phys_top`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn frame_count(&self) -> usize {
        ((self.phys_top.as_u64() - self.kernel_base.as_u64()) >> kernel_info::memory::PAGE_SHIFT)
            as usize
    }

    /// Whether `pa` is a frame the allocator may hand out or take back.
    #[must_use]
    pub const fn is_allocatable(&self, pa: PhysicalAddress) -> bool {
        pa.is_page_aligned()
            && pa.as_u64() >= self.kernel_end.as_u64()
            && pa.as_u64() < self.phys_top.as_u64()
    }
}
