//! # Kernel Parameters

/// Max number of blocks any file system operation writes.
pub const MAXOPBLOCKS: usize = 10;

/// Number of buffers in the disk block cache.
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// Number of hash buckets the block cache spreads its buffers over.
pub const NBUCKET: usize = 13;

/// Size of a disk block, in bytes.
pub const BSIZE: usize = 1024;

/// Device number of the file system root disk.
pub const ROOTDEV: u32 = 1;

const _: () = {
    assert!(NBUF > 0);
    assert!(NBUCKET > 0);
    assert!(BSIZE.is_power_of_two());
};
