//! Reference-counted physical page allocator.

use alloc::vec::Vec;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{SpinLock, SpinLockGuard};
use log::{error, info, trace};

use crate::{CopyOnWrite, Frame, MemoryLayout, PageRefError, PageRefTable, PhysMapper};

/// Byte pattern written over a frame when it is handed out.
pub const ALLOC_JUNK: u8 = 0x05;

/// Byte pattern written over a frame when it goes back on the free list.
pub const FREE_JUNK: u8 = 0x01;

/// Hands out whole 4 KiB frames and tracks how many owners each frame has.
///
/// A frame returns to the free list only when its last owner frees it, which
/// is what lets `fork` share pages copy-on-write.
///
/// Two lock levels are involved and never nest: the free-list lock guards
/// the stack of free frames, and each frame's count is guarded by its own
/// entry in the [`PageRefTable`].
pub struct PageAllocator<M: PhysMapper> {
    layout: MemoryLayout,
    mapper: M,
    refs: PageRefTable,
    free: SpinLock<Vec<PhysicalAddress>>,
}

impl<M: PhysMapper> PageAllocator<M> {
    /// Set up the reference table and put every whole frame between the end
    /// of the kernel image and the top of RAM on the free list.
    #[must_use]
    pub fn new(layout: MemoryLayout, mapper: M) -> Self {
        let this = Self {
            refs: PageRefTable::new(&layout),
            free: SpinLock::new(Vec::with_capacity(layout.frame_count())),
            layout,
            mapper,
        };
        this.free_range(layout.kernel_end(), layout.phys_top());
        info!(
            "kalloc: {} free pages in [{}, {})",
            this.free_pages(),
            layout.kernel_end().page_round_up(),
            layout.phys_top()
        );
        this
    }

    fn free_range(&self, start: PhysicalAddress, end: PhysicalAddress) {
        let mut pa = start.page_round_up();
        while pa.as_u64() + PAGE_SIZE <= end.as_u64() {
            self.free_page(pa);
            pa += PAGE_SIZE;
        }
    }

    /// Take a frame off the free list.
    ///
    /// The frame comes back filled with [`ALLOC_JUNK`] and with a reference
    /// count of one. Returns `None` when physical memory is exhausted.
    #[must_use]
    pub fn alloc_page(&self) -> Option<PhysicalAddress> {
        let Some(pa) = self.free.lock().pop() else {
            trace!("kalloc: out of memory");
            return None;
        };

        // SAFETY: The frame was on the free list, so nobody else refers to it.
        unsafe { self.frame(pa) }.0.fill(ALLOC_JUNK);
        *self.ref_entry(pa) = 1;
        trace!("kalloc: {pa}");
        Some(pa)
    }

    /// Drop one reference to the frame at `pa`, freeing it with the last one.
    ///
    /// # Panics
    /// If `pa` is not page aligned, lies inside the kernel image or beyond
    /// the top of RAM, or if the frame has no references left (double free).
    pub fn free_page(&self, pa: PhysicalAddress) {
        if !self.layout.is_allocatable(pa) {
            error!("kfree: invalid address {pa}");
            panic!("kfree: invalid address {pa}");
        }

        {
            let mut count = self.ref_entry(pa);
            let Some(rest) = count.checked_sub(1) else {
                error!("kfree: {pa} has no references left");
                panic!("kfree: double free of {pa}");
            };
            *count = rest;
            if rest > 0 {
                trace!("kfree: {pa} still has {rest} references");
                return;
            }
        }

        // SAFETY: The count just dropped to zero, so this was the last owner.
        unsafe { self.frame(pa) }.0.fill(FREE_JUNK);
        self.free.lock().push(pa);
        trace!("kfree: {pa}");
    }

    /// Record one more owner of the frame at `pa` and return the new count.
    ///
    /// # Errors
    /// [`PageRefError::Unaligned`] if `pa` is not page aligned,
    /// [`PageRefError::OutOfRange`] if it is not an allocatable frame.
    pub fn add_page_ref(&self, pa: PhysicalAddress) -> Result<u32, PageRefError> {
        if !pa.is_page_aligned() {
            return Err(PageRefError::Unaligned(pa));
        }
        if !self.layout.is_allocatable(pa) {
            return Err(PageRefError::OutOfRange(pa));
        }
        let mut count = self.refs.lock(pa)?;
        *count += 1;
        Ok(*count)
    }

    /// Current reference count of the frame at `pa`.
    ///
    /// # Errors
    /// See [`PageRefTable::index`].
    pub fn page_ref_count(&self, pa: PhysicalAddress) -> Result<u32, PageRefError> {
        self.refs.count(pa)
    }

    /// Number of frames on the free list.
    #[must_use]
    pub fn free_pages(&self) -> usize {
        self.free.lock().len()
    }

    #[must_use]
    pub const fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Copy-on-write fault handling on top of this allocator.
    #[must_use]
    pub const fn cow(&self) -> CopyOnWrite<'_, M> {
        CopyOnWrite::new(self)
    }

    pub(crate) const fn refs(&self) -> &PageRefTable {
        &self.refs
    }

    /// # Safety
    /// The caller must own the frame at `pa` for as long as the reference lives.
    pub(crate) unsafe fn frame(&self, pa: PhysicalAddress) -> &mut Frame {
        unsafe { self.mapper.phys_to_mut(pa) }
    }

    fn ref_entry(&self, pa: PhysicalAddress) -> SpinLockGuard<'_, u32> {
        match self.refs.lock(pa) {
            Ok(count) => count,
            Err(e) => {
                error!("kalloc: no reference entry for a managed frame: {e}");
                panic!("kalloc: {e}");
            }
        }
    }
}
