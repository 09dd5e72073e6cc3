#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kernel_bio::{BSIZE, BlockDevice, BufferCache, BufferCacheConfig};
use kernel_sync::StdScheduler;

/// In-memory disk. Unwritten blocks read back as their block number in
/// every byte.
#[derive(Default)]
pub struct MemDisk {
    blocks: Mutex<HashMap<(u32, u32), [u8; BSIZE]>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    pub latency: Option<Duration>,
}

impl MemDisk {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn block(&self, dev: u32, blockno: u32) -> [u8; BSIZE] {
        self.blocks
            .lock()
            .unwrap()
            .get(&(dev, blockno))
            .copied()
            .unwrap_or([pattern(blockno); BSIZE])
    }
}

pub fn pattern(blockno: u32) -> u8 {
    (blockno % 251) as u8
}

impl BlockDevice for MemDisk {
    fn read_block(&self, dev: u32, blockno: u32, data: &mut [u8; BSIZE]) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        *data = self.block(dev, blockno);
    }

    fn write_block(&self, dev: u32, blockno: u32, data: &[u8; BSIZE]) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.blocks.lock().unwrap().insert((dev, blockno), *data);
    }
}

pub fn cache(buffers: usize, buckets: usize) -> BufferCache<MemDisk, StdScheduler> {
    cache_on(buffers, buckets, MemDisk::default())
}

pub fn cache_on(
    buffers: usize,
    buckets: usize,
    disk: MemDisk,
) -> BufferCache<MemDisk, StdScheduler> {
    let config = BufferCacheConfig::new(buffers, buckets).unwrap();
    BufferCache::new(config, disk, StdScheduler)
}
