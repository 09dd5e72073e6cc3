//! # Copy-on-write
//!
//! `fork` does not copy user memory. [`CopyOnWrite::share`] maps each parent
//! frame into the child as well, clears `W`, sets the `COW` bit and takes an
//! extra reference on the frame. The first store to such a page traps, and
//! the trap handler calls [`CopyOnWrite::is_cow_fault`] and then
//! [`CopyOnWrite::resolve_cow`]:
//!
//! ```text
//!            count == 1                       count > 1
//!   ┌────────────────────────┐   ┌───────────────────────────────────────┐
//!   │ clear COW, set W       │   │ alloc new frame, copy 4 KiB,          │
//!   │ keep the same frame    │   │ invalidate old PTE, map new frame     │
//!   │                        │   │ with W and without COW, drop one ref  │
//!   └────────────────────────┘   └───────────────────────────────────────┘
//! ```

use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::{MAXVA, MapError, PageTable};
use log::{debug, trace, warn};

use crate::{PageAllocator, PageRefError, PhysMapper};

/// Why a copy-on-write fault could not be resolved.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CowError {
    #[error("no valid mapping at {0}")]
    NotMapped(VirtualAddress),
    #[error("mapping at {0} is not copy-on-write")]
    NotCow(VirtualAddress),
    #[error("out of memory while copying a shared page")]
    OutOfMemory,
    #[error("mapped frame is not managed by the allocator: {0}")]
    Frame(#[from] PageRefError),
    #[error("failed to map the private copy: {0}")]
    Map(#[from] MapError),
}

/// Copy-on-write protocol over a [`PageAllocator`].
pub struct CopyOnWrite<'a, M: PhysMapper> {
    alloc: &'a PageAllocator<M>,
}

impl<'a, M: PhysMapper> CopyOnWrite<'a, M> {
    #[must_use]
    pub const fn new(alloc: &'a PageAllocator<M>) -> Self {
        Self { alloc }
    }

    /// Whether a store fault at `va` hit a valid copy-on-write mapping.
    #[must_use]
    pub fn is_cow_fault(&self, table: &impl PageTable, va: VirtualAddress) -> bool {
        if va.as_u64() >= MAXVA {
            return false;
        }
        table.walk(va).is_some_and(|pte| pte.valid() && pte.cow())
    }

    /// Give the faulting address space a private, writable copy of the page
    /// containing `va` and return the frame now mapped there.
    ///
    /// If the frame has no other owner it is taken over in place.
    ///
    /// # Errors
    /// - [`CowError::NotMapped`] / [`CowError::NotCow`] if `va` has no valid
    ///   copy-on-write mapping; the table is left untouched.
    /// - [`CowError::OutOfMemory`] if no frame was free for the copy.
    /// - [`CowError::Map`] if the copy could not be mapped; the original
    ///   mapping is restored.
    pub fn resolve_cow(
        &self,
        table: &mut impl PageTable,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, CowError> {
        let va = va.page_round_down();
        if va.as_u64() >= MAXVA {
            return Err(CowError::NotMapped(va));
        }
        let pte = table
            .walk_mut(va)
            .filter(|pte| pte.valid())
            .ok_or(CowError::NotMapped(va))?;
        if !pte.cow() {
            return Err(CowError::NotCow(va));
        }
        let pa = pte.physical_address();

        {
            let count = self.alloc.refs().lock(pa)?;
            if *count == 1 {
                pte.set_cow(false);
                pte.set_writable(true);
                trace!("cow: {va} takes over {pa}");
                return Ok(pa);
            }
        }

        // The count lock is released before allocating; alloc takes it too.
        let Some(copy) = self.alloc.alloc_page() else {
            warn!("cow: out of memory copying {pa} for {va}");
            return Err(CowError::OutOfMemory);
        };
        // SAFETY: `copy` is fresh off the free list and `pa` is kept alive by
        // the reference this mapping still holds.
        unsafe {
            let (src, dst) = (self.alloc.frame(pa), self.alloc.frame(copy));
            dst.0.copy_from_slice(&src.0);
        }

        pte.set_valid(false);
        let flags = pte.flags().with_writable(true).with_cow(false);
        if let Err(e) = table.map_pages(va, PAGE_SIZE, copy, flags) {
            if let Some(pte) = table.walk_mut(va) {
                pte.set_valid(true);
            }
            self.alloc.free_page(copy);
            warn!("cow: mapping copy of {pa} at {va} failed: {e}");
            return Err(CowError::Map(e));
        }

        self.alloc.free_page(pa);
        debug!("cow: copied {pa} to {copy} for {va}");
        Ok(copy)
    }

    /// Share the page `parent` maps at `va` with `child` for `fork`.
    ///
    /// A writable parent mapping becomes read-only copy-on-write, the child
    /// gets the same frame with the same permissions, and the frame gains
    /// one reference. Read-only pages are shared as they are.
    ///
    /// # Errors
    /// [`CowError::NotMapped`] if `parent` has no valid mapping at `va`,
    /// [`CowError::Frame`] if the frame is not allocator memory and
    /// [`CowError::Map`] if the child mapping failed. The parent mapping is
    /// only changed once the child mapping is in place.
    pub fn share(
        &self,
        parent: &mut impl PageTable,
        child: &mut impl PageTable,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, CowError> {
        let va = va.page_round_down();
        let pte = parent
            .walk(va)
            .filter(|pte| pte.valid())
            .ok_or(CowError::NotMapped(va))?;
        let pa = pte.physical_address();
        let flags = if pte.writable() {
            pte.flags().with_writable(false).with_cow(true)
        } else {
            pte.flags()
        };

        self.alloc.add_page_ref(pa)?;
        if let Err(e) = child.map_pages(va, PAGE_SIZE, pa, flags) {
            self.alloc.free_page(pa);
            return Err(CowError::Map(e));
        }
        if let Some(pte) = parent.walk_mut(va) {
            pte.set_writable(flags.writable());
            pte.set_cow(flags.cow());
        }
        trace!("cow: sharing {pa} at {va}");
        Ok(pa)
    }
}
