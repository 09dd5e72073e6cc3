//! Per-frame reference counts.

use alloc::boxed::Box;
use kernel_info::memory::PAGE_SHIFT;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{SpinLock, SpinLockGuard};

use crate::MemoryLayout;

/// A dense side table holding one lock-protected count per physical frame.
///
/// Frames are indexed by `(pa - kernel_base) / PAGE_SIZE`. Every count starts
/// at one; the allocator's boot pass brings the free frames down to zero.
pub struct PageRefTable {
    base: PhysicalAddress,
    counts: Box<[SpinLock<u32>]>,
}

/// Why a physical address has no entry in the [`PageRefTable`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PageRefError {
    #[error("{0} is not page aligned")]
    Unaligned(PhysicalAddress),
    #[error("{0} is outside managed physical memory")]
    OutOfRange(PhysicalAddress),
}

impl PageRefTable {
    #[must_use]
    pub fn new(layout: &MemoryLayout) -> Self {
        let counts = (0..layout.frame_count()).map(|_| SpinLock::new(1)).collect();
        Self {
            base: layout.kernel_base(),
            counts,
        }
    }

    /// Number of frames covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Frame number of `pa`.
    ///
    /// # Errors
    /// [`PageRefError::Unaligned`] or [`PageRefError::OutOfRange`].
    pub fn index(&self, pa: PhysicalAddress) -> Result<usize, PageRefError> {
        if !pa.is_page_aligned() {
            return Err(PageRefError::Unaligned(pa));
        }
        let offset = pa
            .checked_sub(self.base)
            .ok_or(PageRefError::OutOfRange(pa))?;
        let index = usize::try_from(offset >> PAGE_SHIFT).map_err(|_| PageRefError::OutOfRange(pa))?;
        if index < self.counts.len() {
            Ok(index)
        } else {
            Err(PageRefError::OutOfRange(pa))
        }
    }

    /// Lock the count of the frame at `pa`.
    ///
    /// # Errors
    /// See [`PageRefTable::index`].
    pub fn lock(&self, pa: PhysicalAddress) -> Result<SpinLockGuard<'_, u32>, PageRefError> {
        let index = self.index(pa)?;
        Ok(self.counts[index].lock())
    }

    /// Snapshot of the count of the frame at `pa`.
    ///
    /// # Errors
    /// See [`PageRefTable::index`].
    pub fn count(&self, pa: PhysicalAddress) -> Result<u32, PageRefError> {
        self.lock(pa).map(|count| *count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_info::memory::PAGE_SIZE;

    const BASE: u64 = 0x8000_0000;

    fn table(frames: u64) -> PageRefTable {
        let layout = MemoryLayout::new(
            PhysicalAddress::new(BASE),
            PhysicalAddress::new(BASE),
            PhysicalAddress::new(BASE + frames * PAGE_SIZE),
        )
        .unwrap();
        PageRefTable::new(&layout)
    }

    #[test]
    fn every_frame_starts_referenced_once() {
        let t = table(4);
        assert_eq!(t.len(), 4);
        for i in 0..4 {
            assert_eq!(t.count(PhysicalAddress::new(BASE + i * PAGE_SIZE)), Ok(1));
        }
    }

    #[test]
    fn index_is_the_frame_number_from_the_base() {
        let t = table(8);
        assert_eq!(t.index(PhysicalAddress::new(BASE)), Ok(0));
        assert_eq!(t.index(PhysicalAddress::new(BASE + 5 * PAGE_SIZE)), Ok(5));
    }

    #[test]
    fn translation_is_bounds_checked() {
        let t = table(2);
        let below = PhysicalAddress::new(BASE - PAGE_SIZE);
        let above = PhysicalAddress::new(BASE + 2 * PAGE_SIZE);
        let odd = PhysicalAddress::new(BASE + 12);
        assert_eq!(t.index(below), Err(PageRefError::OutOfRange(below)));
        assert_eq!(t.index(above), Err(PageRefError::OutOfRange(above)));
        assert_eq!(t.index(odd), Err(PageRefError::Unaligned(odd)));
    }

    #[test]
    fn counts_are_independent() {
        let t = table(2);
        *t.lock(PhysicalAddress::new(BASE)).unwrap() += 2;
        assert_eq!(t.count(PhysicalAddress::new(BASE)), Ok(3));
        assert_eq!(t.count(PhysicalAddress::new(BASE + PAGE_SIZE)), Ok(1));
    }
}
