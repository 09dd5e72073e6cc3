//! # Reaching physical frames from kernel code
//!
//! Code can only dereference virtual addresses. The allocator needs to touch
//! the frames it manages (junk fill on alloc and free, the copy in a COW
//! fault), so it goes through a [`PhysMapper`] that turns a physical address
//! into a usable reference.
//!
//! On the QEMU `virt` machine the kernel runs with RAM identity mapped, which
//! is what [`IdentityPhysMapper`] implements. Host tests substitute a mapper
//! backed by ordinary heap memory.

use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::PhysicalAddress;

/// Contents of one physical frame.
#[repr(C, align(4096))]
pub struct Frame(pub [u8; PAGE_SIZE as usize]);

impl Frame {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; PAGE_SIZE as usize])
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Turns physical addresses into references the kernel can use.
pub trait PhysMapper: Sync {
    /// Map a physical address to a mutable reference of type `T`.
    ///
    /// # Safety
    /// - `pa` must be mapped and suitably aligned for `T`.
    /// - The caller must guarantee exclusive access for the lifetime `'a`;
    ///   for frames this means owning the frame, i.e. holding a reference
    ///   count on it or having just taken it off the free list.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// [`PhysMapper`] for a kernel that maps RAM at its physical address.
#[derive(Debug, Copy, Clone, Default)]
pub struct IdentityPhysMapper;

impl PhysMapper for IdentityPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let ptr = core::ptr::with_exposed_provenance_mut::<T>(pa.as_u64() as usize);
        // SAFETY: Caller guarantees the address is mapped, aligned and unaliased.
        unsafe { &mut *ptr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mapper_returns_the_same_memory() {
        let mut frame = Box::new(Frame::zeroed());
        frame.0[17] = 0xAB;
        let addr = core::ptr::from_mut(&mut *frame).expose_provenance() as u64;
        let pa = PhysicalAddress::new(addr);
        assert!(pa.is_page_aligned());

        let seen: &mut Frame = unsafe { IdentityPhysMapper.phys_to_mut(pa) };
        assert_eq!(seen.0[17], 0xAB);
        seen.0[18] = 0xCD;
        assert_eq!(frame.0[18], 0xCD);
    }
}
