use alloc::{boxed::Box, vec::Vec};
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use kernel_info::param::BSIZE;
use kernel_sync::{Scheduler, SleepLock, SpinLock};
use log::{debug, error, info, trace};

use crate::{BlockDevice, Buf, BufferCacheConfig};

/// Storage for one cached block.
pub(crate) struct Slot {
    /// Whether `data` holds the block currently keyed to this slot.
    pub(crate) valid: AtomicBool,
    pub(crate) data: SleepLock<[u8; BSIZE]>,
}

/// Cache membership of one slot, owned by the bucket of its block.
#[derive(Debug)]
struct Entry {
    slot: usize,
    dev: u32,
    blockno: u32,
    refcnt: u32,
    last_release: u64,
}

impl Entry {
    const fn is(&self, dev: u32, blockno: u32) -> bool {
        self.dev == dev && self.blockno == blockno
    }
}

/// The disk block cache.
///
/// Lock order: a bucket lock may be followed by the pool-size lock; the
/// eviction lock may be followed by one bucket lock at a time. No two bucket
/// locks are ever held together, and no spin lock is held while waiting for
/// a buffer's content lock.
pub struct BufferCache<D: BlockDevice, S: Scheduler> {
    slots: Box<[Slot]>,
    buckets: Box<[SpinLock<Vec<Entry>>]>,
    /// Number of slots handed out at least once. Never decreases.
    claimed: SpinLock<usize>,
    evict_lock: SpinLock<()>,
    clock: AtomicU64,
    evictions: AtomicUsize,
    device: D,
    scheduler: S,
}

impl<D: BlockDevice, S: Scheduler> BufferCache<D, S> {
    #[must_use]
    pub fn new(config: BufferCacheConfig, device: D, scheduler: S) -> Self {
        let slots = (0..config.buffers())
            .map(|_| Slot {
                valid: AtomicBool::new(false),
                data: SleepLock::new([0; BSIZE]),
            })
            .collect();
        // Every bucket can take the whole pool, so relinking never allocates.
        let buckets = (0..config.buckets())
            .map(|_| SpinLock::new(Vec::with_capacity(config.buffers())))
            .collect();
        info!(
            "bcache: {} buffers of {BSIZE} bytes in {} buckets",
            config.buffers(),
            config.buckets()
        );
        Self {
            slots,
            buckets,
            claimed: SpinLock::new(0),
            evict_lock: SpinLock::new(()),
            clock: AtomicU64::new(0),
            evictions: AtomicUsize::new(0),
            device,
            scheduler,
        }
    }

    /// Return a locked buffer holding the contents of block `blockno` on
    /// device `dev`, reading it from disk if it is not cached.
    ///
    /// # Panics
    /// If every buffer is in use (`bget: no buffers`).
    pub fn read(&self, dev: u32, blockno: u32) -> Buf<'_, D, S> {
        let mut buf = self.get(dev, blockno);
        let valid = &self.slots[buf.slot()].valid;
        if !valid.load(Ordering::Acquire) {
            self.device.read_block(dev, blockno, &mut buf);
            valid.store(true, Ordering::Release);
            trace!("bread: ({dev}, {blockno}) read from disk");
        }
        buf
    }

    /// Write the buffer's contents to disk.
    ///
    /// # Panics
    /// If the calling context does not hold the buffer's lock.
    pub fn write(&self, buf: &Buf<'_, D, S>) {
        if !buf.held_by_current() {
            error!("bwrite: ({}, {}) is not locked by the caller", buf.dev(), buf.blockno());
            panic!("bwrite: buffer lock not held");
        }
        self.device.write_block(buf.dev(), buf.blockno(), buf);
        trace!("bwrite: ({}, {})", buf.dev(), buf.blockno());
    }

    /// Give the buffer back. Same as dropping it, but checked.
    ///
    /// # Panics
    /// If the calling context does not hold the buffer's lock.
    pub fn release(&self, buf: Buf<'_, D, S>) {
        if !buf.held_by_current() {
            error!("brelse: ({}, {}) is not locked by the caller", buf.dev(), buf.blockno());
            panic!("brelse: buffer lock not held");
        }
        drop(buf);
    }

    /// Keep the buffer's block cached after it is released.
    pub fn pin(&self, buf: &Buf<'_, D, S>) {
        self.with_entry(buf.slot(), buf.blockno(), "bpin", |e| e.refcnt += 1);
    }

    /// Undo one [`pin`](Self::pin).
    ///
    /// # Panics
    /// If the reference count would drop below zero.
    pub fn unpin(&self, buf: &Buf<'_, D, S>) {
        self.with_entry(buf.slot(), buf.blockno(), "bunpin", |e| {
            let Some(rest) = e.refcnt.checked_sub(1) else {
                error!("bunpin: ({}, {}) is not referenced", e.dev, e.blockno);
                panic!("bunpin: reference count underflow");
            };
            e.refcnt = rest;
        });
    }

    /// Number of buffers handed out at least once.
    #[must_use]
    pub fn claimed(&self) -> usize {
        *self.claimed.lock()
    }

    /// Number of buffers recycled for a different block so far.
    #[must_use]
    pub fn evictions(&self) -> usize {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Whether the contents of `(dev, blockno)` are in the cache.
    #[must_use]
    pub fn is_cached(&self, dev: u32, blockno: u32) -> bool {
        self.buckets[self.bucket_of(blockno)]
            .lock()
            .iter()
            .find(|e| e.is(dev, blockno))
            .is_some_and(|e| self.slots[e.slot].valid.load(Ordering::Acquire))
    }

    /// References held on `(dev, blockno)`, if a buffer is keyed to it.
    #[must_use]
    pub fn ref_count(&self, dev: u32, blockno: u32) -> Option<u32> {
        self.buckets[self.bucket_of(blockno)]
            .lock()
            .iter()
            .find(|e| e.is(dev, blockno))
            .map(|e| e.refcnt)
    }

    /// Keys of every buffer in the cache, bucket by bucket.
    #[must_use]
    pub fn resident_blocks(&self) -> Vec<(u32, u32)> {
        self.buckets
            .iter()
            .flat_map(|bucket| {
                bucket
                    .lock()
                    .iter()
                    .map(|e| (e.dev, e.blockno))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// The device behind the cache.
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    pub(crate) fn slot_data(&self, slot: usize) -> &SleepLock<[u8; BSIZE]> {
        &self.slots[slot].data
    }

    pub(crate) const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Drop the reference a [`Buf`] held, stamping the buffer on the last one.
    pub(crate) fn put(&self, slot: usize, blockno: u32) {
        self.with_entry(slot, blockno, "brelse", |e| {
            let Some(rest) = e.refcnt.checked_sub(1) else {
                error!("brelse: ({}, {}) is not referenced", e.dev, e.blockno);
                panic!("brelse: reference count underflow");
            };
            e.refcnt = rest;
            if rest == 0 {
                e.last_release = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
            }
        });
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bucket_of(&self, blockno: u32) -> usize {
        blockno as usize % self.buckets.len()
    }

    fn with_entry(&self, slot: usize, blockno: u32, op: &str, f: impl FnOnce(&mut Entry)) {
        let mut bucket = self.buckets[self.bucket_of(blockno)].lock();
        let Some(entry) = bucket.iter_mut().find(|e| e.slot == slot) else {
            error!("{op}: slot {slot} is missing from the bucket of block {blockno}");
            panic!("{op}: buffer not in its bucket");
        };
        f(entry);
    }

    /// Take a reference on the buffer keyed `(dev, blockno)` in `bucket`.
    fn take_ref(bucket: &mut [Entry], dev: u32, blockno: u32) -> Option<usize> {
        let e = bucket.iter_mut().find(|e| e.is(dev, blockno))?;
        e.refcnt += 1;
        Some(e.slot)
    }

    fn get(&self, dev: u32, blockno: u32) -> Buf<'_, D, S> {
        let target = self.bucket_of(blockno);

        {
            let mut bucket = self.buckets[target].lock();
            if let Some(slot) = Self::take_ref(&mut bucket, dev, blockno) {
                drop(bucket);
                trace!("bget: ({dev}, {blockno}) hit in slot {slot}");
                return Buf::lock(self, slot, dev, blockno);
            }

            let fresh = {
                let mut claimed = self.claimed.lock();
                (*claimed < self.slots.len()).then(|| {
                    *claimed += 1;
                    *claimed - 1
                })
            };
            if let Some(slot) = fresh {
                self.slots[slot].valid.store(false, Ordering::Release);
                bucket.push(Entry {
                    slot,
                    dev,
                    blockno,
                    refcnt: 1,
                    last_release: 0,
                });
                drop(bucket);
                trace!("bget: ({dev}, {blockno}) claims fresh slot {slot}");
                return Buf::lock(self, slot, dev, blockno);
            }
        }

        self.evict(target, dev, blockno)
    }

    fn evict(&self, target: usize, dev: u32, blockno: u32) -> Buf<'_, D, S> {
        let serial = self.evict_lock.lock();
        let n = self.buckets.len();

        for idx in (0..n).map(|step| (target + step) % n) {
            let mut bucket = self.buckets[idx].lock();

            // Someone else may have cached the block while we waited.
            let hit = if idx == target {
                Self::take_ref(&mut bucket, dev, blockno)
            } else {
                None
            };
            if let Some(slot) = hit {
                drop(bucket);
                drop(serial);
                trace!("bget: ({dev}, {blockno}) cached meanwhile in slot {slot}");
                return Buf::lock(self, slot, dev, blockno);
            }

            let Some(pos) = bucket
                .iter()
                .enumerate()
                .filter(|(_, e)| e.refcnt == 0)
                .min_by_key(|(_, e)| e.last_release)
                .map(|(pos, _)| pos)
            else {
                continue;
            };

            let slot = bucket[pos].slot;
            let (old_dev, old_blockno) = (bucket[pos].dev, bucket[pos].blockno);
            self.slots[slot].valid.store(false, Ordering::Release);
            if idx == target {
                let e = &mut bucket[pos];
                e.dev = dev;
                e.blockno = blockno;
                e.refcnt = 1;
                drop(bucket);
            } else {
                let mut e = bucket.swap_remove(pos);
                drop(bucket);
                e.dev = dev;
                e.blockno = blockno;
                e.refcnt = 1;
                self.buckets[target].lock().push(e);
            }
            drop(serial);

            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("bget: slot {slot} evicts ({old_dev}, {old_blockno}) for ({dev}, {blockno})");
            return Buf::lock(self, slot, dev, blockno);
        }

        error!("bget: all {} buffers are in use", self.slots.len());
        panic!("bget: no buffers");
    }
}
