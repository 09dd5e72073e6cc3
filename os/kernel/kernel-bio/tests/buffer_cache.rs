mod common;

use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use common::{MemDisk, cache, cache_on, pattern};
use kernel_bio::BSIZE;
use kernel_info::param::ROOTDEV;

#[test]
fn miss_reads_from_disk_and_hit_does_not() {
    let cache = cache(4, 2);
    let buf = cache.read(ROOTDEV, 7);
    assert!(buf.iter().all(|&b| b == pattern(7)));
    assert_eq!((buf.dev(), buf.blockno()), (ROOTDEV, 7));
    cache.release(buf);
    assert_eq!(cache.device().reads(), 1);

    let again = cache.read(ROOTDEV, 7);
    assert_eq!(again[0], pattern(7));
    drop(again);
    assert_eq!(cache.device().reads(), 1);
    assert_eq!(cache.claimed(), 1);
}

#[test]
fn devices_do_not_share_blocks() {
    let cache = cache(4, 2);
    drop(cache.read(1, 3));
    drop(cache.read(2, 3));
    assert_eq!(cache.device().reads(), 2);
    assert!(cache.is_cached(1, 3));
    assert!(cache.is_cached(2, 3));
    assert!(!cache.is_cached(3, 3));
}

#[test]
fn write_goes_through_to_disk() {
    let cache = cache(4, 2);
    let mut buf = cache.read(1, 9);
    buf[..4].copy_from_slice(b"xv6!");
    cache.write(&buf);
    cache.release(buf);

    assert_eq!(cache.device().writes(), 1);
    assert_eq!(&cache.device().block(1, 9)[..4], b"xv6!");

    let buf = cache.read(1, 9);
    assert_eq!(&buf[..4], b"xv6!");
    assert_eq!(cache.device().reads(), 1);
}

#[test]
fn fully_claimed_pool_evicts_the_oldest_release() {
    let cache = cache(4, 2);
    for blockno in 1..=4 {
        drop(cache.read(0, blockno));
    }
    assert_eq!(cache.claimed(), 4);
    assert_eq!(cache.evictions(), 0);

    drop(cache.read(0, 5));

    assert_eq!(cache.evictions(), 1);
    assert_eq!(cache.claimed(), 4);
    assert!(!cache.is_cached(0, 1));
    for blockno in 2..=5 {
        assert!(cache.is_cached(0, blockno), "block {blockno}");
    }
    let keys = cache.resident_blocks();
    assert_eq!(keys.len(), 4);
    assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 4);
}

#[test]
fn eviction_scans_the_target_bucket_first() {
    let cache = cache(4, 2);
    let mut bufs: Vec<_> = (1..=4).map(|b| Some(cache.read(0, b))).collect();
    // Release order 2, 1, 3, 4: block 2 (bucket 0) is the oldest overall.
    for i in [1, 0, 2, 3] {
        drop(bufs[i].take());
    }

    // Block 5 hashes to bucket 1, which holds blocks 1 and 3.
    drop(cache.read(0, 5));
    assert!(!cache.is_cached(0, 1));
    assert!(cache.is_cached(0, 2));
}

#[test]
fn victim_moves_to_the_bucket_of_its_new_block() {
    let cache = cache(4, 2);
    let one = cache.read(0, 1);
    let three = cache.read(0, 3);
    drop(cache.read(0, 4));
    drop(cache.read(0, 2));

    // Bucket 1 is fully referenced, so the victim comes from bucket 0.
    let five = cache.read(0, 5);
    assert!(!cache.is_cached(0, 4));
    assert!(cache.is_cached(0, 2));
    assert_eq!(cache.ref_count(0, 5), Some(1));
    assert_eq!(cache.ref_count(0, 4), None);
    drop(five);

    // The moved buffer is found again through its new bucket.
    let reads = cache.device().reads();
    drop(cache.read(0, 5));
    assert_eq!(cache.device().reads(), reads);
    drop((one, three));
}

#[test]
fn referenced_buffers_are_never_evicted() {
    let cache = cache(2, 1);
    let held = cache.read(0, 1);
    drop(cache.read(0, 2));
    drop(cache.read(0, 3));
    drop(cache.read(0, 4));
    assert!(cache.is_cached(0, 1));
    assert_eq!(held[0], pattern(1));
    assert_eq!(cache.evictions(), 2);
}

#[test]
#[should_panic(expected = "bget: no buffers")]
fn exhausted_pool_is_fatal() {
    let cache = cache(2, 2);
    let _a = cache.read(0, 1);
    let _b = cache.read(0, 2);
    let _c = cache.read(0, 3);
}

#[test]
fn pinned_buffer_survives_release() {
    let cache = cache(2, 1);
    let buf = cache.read(0, 1);
    cache.pin(&buf);
    cache.release(buf);
    assert_eq!(cache.ref_count(0, 1), Some(1));

    drop(cache.read(0, 2));
    drop(cache.read(0, 3));
    assert!(cache.is_cached(0, 1));
    assert!(!cache.is_cached(0, 2));

    let buf = cache.read(0, 1);
    assert_eq!(cache.ref_count(0, 1), Some(2));
    cache.unpin(&buf);
    drop(buf);
    assert_eq!(cache.ref_count(0, 1), Some(0));

    drop(cache.read(0, 4));
    drop(cache.read(0, 5));
    assert!(!cache.is_cached(0, 1));
}

#[test]
fn write_from_another_context_is_a_lock_violation() {
    let cache = cache(2, 1);
    let buf = cache.read(0, 1);
    let result = thread::scope(|s| s.spawn(|| cache.write(&buf)).join());
    assert!(result.is_err());
    assert_eq!(cache.device().writes(), 0);
    drop(buf);
    assert_eq!(cache.ref_count(0, 1), Some(0));
}

#[test]
fn release_from_another_context_is_a_lock_violation() {
    let cache = cache(2, 1);
    let buf = cache.read(0, 1);
    let result = thread::scope(|s| s.spawn(|| cache.release(buf)).join());
    assert!(result.is_err());
    // Unwinding still dropped the buffer.
    assert_eq!(cache.ref_count(0, 1), Some(0));
    drop(cache.read(0, 1));
}

#[test]
fn concurrent_misses_read_the_disk_once() {
    const THREADS: usize = 8;
    let cache = cache_on(4, 2, MemDisk::with_latency(Duration::from_millis(20)));
    let start = Barrier::new(THREADS);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                start.wait();
                let buf = cache.read(0, 11);
                assert_eq!(buf[BSIZE - 1], pattern(11));
                cache.release(buf);
            });
        }
    });

    assert_eq!(cache.device().reads(), 1);
    assert_eq!(cache.claimed(), 1);
    assert_eq!(cache.ref_count(0, 11), Some(0));
}

#[test]
fn concurrent_misses_on_a_full_pool_evict_once() {
    const THREADS: usize = 8;
    let cache = cache_on(4, 2, MemDisk::with_latency(Duration::from_millis(20)));
    for blockno in 0..4 {
        let buf = cache.read(0, blockno);
        cache.release(buf);
    }
    assert_eq!(cache.claimed(), 4);
    let start = Barrier::new(THREADS);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                start.wait();
                let buf = cache.read(0, 11);
                assert_eq!(buf[0], pattern(11));
                cache.release(buf);
            });
        }
    });

    assert_eq!(cache.device().reads(), 4 + 1);
    assert_eq!(cache.evictions(), 1);
    assert_eq!(cache.ref_count(0, 11), Some(0));
}

#[test]
fn concurrent_eviction_keeps_keys_unique_and_data_correct() {
    // With two contexts an evicting one always finds the other's buffer
    // plus at least one unreferenced one.
    const THREADS: u32 = 2;
    let cache = cache(4, 3);

    thread::scope(|s| {
        for t in 0..THREADS {
            let cache = &cache;
            s.spawn(move || {
                for i in 0..1000u32 {
                    let blockno = (i * 7 + t * 3) % 13;
                    let buf = cache.read(0, blockno);
                    assert!(buf.iter().all(|&b| b == pattern(blockno)));
                    if i % 5 == 0 {
                        cache.write(&buf);
                    }
                    cache.release(buf);
                }
            });
        }
    });

    let keys = cache.resident_blocks();
    assert_eq!(keys.len(), 4);
    assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 4);
    for (dev, blockno) in keys {
        assert_eq!(cache.ref_count(dev, blockno), Some(0));
    }
}
