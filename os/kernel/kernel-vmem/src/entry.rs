use bitfield_struct::bitfield;
use kernel_info::memory::PAGE_SHIFT;
use kernel_memory_addresses::PhysicalAddress;

/// A single 64-bit Sv39 page table entry.
///
/// ### Example
/// ```rust
/// # use kernel_vmem::PageTableEntry;
/// # use kernel_memory_addresses::PhysicalAddress;
/// let e = PageTableEntry::new()
///     .with_valid(true)
///     .with_readable(true)
///     .with_cow(true)
///     .with_physical_address(PhysicalAddress::new(0x8020_3000));
/// assert_eq!(e.physical_address().as_u64(), 0x8020_3000);
/// assert!(e.flags().cow());
/// assert_eq!(e.flags().ppn(), 0);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// Valid (V, bit 0).
    pub valid: bool,
    /// Readable (R, bit 1).
    pub readable: bool,
    /// Writable (W, bit 2).
    pub writable: bool,
    /// Executable (X, bit 3).
    pub executable: bool,
    /// Accessible from user mode (U, bit 4).
    pub user: bool,
    /// Global mapping (G, bit 5).
    pub global: bool,
    /// Accessed (A, bit 6).
    pub accessed: bool,
    /// Dirty (D, bit 7).
    pub dirty: bool,
    /// Copy-on-write (first RSW bit, bit 8).
    ///
    /// Set on both the parent's and the child's mapping when a writable page
    /// is shared by `fork`; `writable` is cleared at the same time.
    pub cow: bool,
    /// Second software-reserved bit (bit 9), unused.
    #[bits(1)]
    pub rsw: u8,
    /// Physical page number (bits 10‒53).
    #[bits(44)]
    pub ppn: u64,
    #[bits(10)]
    __: u16,
}

impl PageTableEntry {
    /// Physical base address of the frame this entry maps.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.ppn() << PAGE_SHIFT)
    }

    /// This entry pointing at the frame containing `pa`.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(self, pa: PhysicalAddress) -> Self {
        self.with_ppn(pa.as_u64() >> PAGE_SHIFT)
    }

    /// The low ten flag bits, with the frame number cleared.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> Self {
        self.with_ppn(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits_match_the_hardware_layout() {
        assert_eq!(PageTableEntry::new().with_valid(true).into_bits(), 1 << 0);
        assert_eq!(PageTableEntry::new().with_writable(true).into_bits(), 1 << 2);
        assert_eq!(PageTableEntry::new().with_user(true).into_bits(), 1 << 4);
        assert_eq!(PageTableEntry::new().with_cow(true).into_bits(), 1 << 8);
    }

    #[test]
    fn ppn_starts_at_bit_ten() {
        let e = PageTableEntry::new().with_physical_address(PhysicalAddress::new(0x8000_1000));
        assert_eq!(e.into_bits(), (0x8000_1000 >> 12) << 10);
        assert_eq!(e.physical_address(), PhysicalAddress::new(0x8000_1000));
    }

    #[test]
    fn flags_strip_only_the_frame_number() {
        let e = PageTableEntry::new()
            .with_valid(true)
            .with_readable(true)
            .with_user(true)
            .with_cow(true)
            .with_physical_address(PhysicalAddress::new(0x8765_4000));
        let f = e.flags();
        assert_eq!(f.ppn(), 0);
        assert!(f.valid() && f.readable() && f.user() && f.cow());
        assert_eq!(f.into_bits(), e.into_bits() & 0x3ff);
    }

    #[test]
    fn offset_bits_are_dropped_from_the_frame_address() {
        let e = PageTableEntry::new().with_physical_address(PhysicalAddress::new(0x8000_1fff));
        assert_eq!(e.physical_address(), PhysicalAddress::new(0x8000_1000));
    }
}
