//! # Disk Block Cache
//!
//! A fixed pool of in-memory copies of disk blocks shared by every file
//! system operation. It keeps hot blocks off the disk and is the one place
//! where concurrent users of the same block synchronize.
//!
//! ## Structure
//!
//! ```text
//!   slots (fixed pool)            buckets (blockno % buckets)
//! ┌───────────────────┐        ┌──────────┐
//! │ 0  valid │ data   │◄───────│ bucket 0 │─ (dev, blockno, refcnt, stamp) ...
//! │ 1  valid │ data   │◄──┐    ├──────────┤
//! │ …                 │   └────│ bucket 1 │─ ...
//! └───────────────────┘        └──────────┘
//!      ▲ SleepLock per slot        ▲ SpinLock per bucket
//! ```
//!
//! * A lookup touches exactly one bucket lock on a hit.
//! * Until every slot has been used once, a miss claims the next unused slot
//!   under the pool-size lock.
//! * Afterwards a miss evicts: under one cache-wide eviction lock the buckets
//!   are scanned round-robin, starting at the block's own bucket, for the
//!   unreferenced buffer released longest ago.
//! * Block contents sit behind a [`SleepLock`](kernel_sync::SleepLock), so a
//!   holder may keep them across disk I/O while waiters sleep.
//!
//! ## Interface
//! - [`BufferCache::read`] returns a locked [`Buf`] with the block's contents.
//! - [`BufferCache::write`] writes a locked buffer back to disk.
//! - [`BufferCache::release`] (or dropping the [`Buf`]) gives it back.
//! - [`BufferCache::pin`] / [`BufferCache::unpin`] keep a block cached
//!   without holding its lock.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod buf;
mod cache;
mod config;
mod device;

pub use buf::Buf;
pub use cache::BufferCache;
pub use config::{BufferCacheConfig, ConfigError};
pub use device::BlockDevice;
pub use kernel_info::param::BSIZE;
