use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use kernel_info::param::BSIZE;
use kernel_sync::{Scheduler, SleepLockGuard};

use crate::{BlockDevice, BufferCache};

/// A locked buffer, as returned by [`BufferCache::read`].
///
/// Dereferences to the block's bytes. Dropping it releases the content lock
/// and then the buffer's reference, like [`BufferCache::release`] does.
pub struct Buf<'a, D: BlockDevice, S: Scheduler> {
    cache: &'a BufferCache<D, S>,
    slot: usize,
    dev: u32,
    blockno: u32,
    guard: ManuallyDrop<SleepLockGuard<'a, [u8; BSIZE]>>,
}

impl<'a, D: BlockDevice, S: Scheduler> Buf<'a, D, S> {
    /// Wait for the content lock of `slot`. The caller already holds a
    /// reference on it.
    pub(crate) fn lock(cache: &'a BufferCache<D, S>, slot: usize, dev: u32, blockno: u32) -> Self {
        let guard = cache.slot_data(slot).lock(cache.scheduler());
        Self {
            cache,
            slot,
            dev,
            blockno,
            guard: ManuallyDrop::new(guard),
        }
    }

    pub(crate) const fn slot(&self) -> usize {
        self.slot
    }

    #[must_use]
    pub const fn dev(&self) -> u32 {
        self.dev
    }

    #[must_use]
    pub const fn blockno(&self) -> u32 {
        self.blockno
    }

    /// Whether the running context holds this buffer's lock.
    #[must_use]
    pub fn held_by_current(&self) -> bool {
        self.guard.held_by_current()
    }
}

impl<D: BlockDevice, S: Scheduler> Deref for Buf<'_, D, S> {
    type Target = [u8; BSIZE];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<D: BlockDevice, S: Scheduler> DerefMut for Buf<'_, D, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<D: BlockDevice, S: Scheduler> Drop for Buf<'_, D, S> {
    fn drop(&mut self) {
        // SAFETY: The guard is dropped exactly once, here.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.cache.put(self.slot, self.blockno);
    }
}

impl<D: BlockDevice, S: Scheduler> fmt::Debug for Buf<'_, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buf")
            .field("slot", &self.slot)
            .field("dev", &self.dev)
            .field("blockno", &self.blockno)
            .finish_non_exhaustive()
    }
}
