use kernel_info::param::BSIZE;

/// Synchronous block storage, such as the virtio disk driver.
///
/// Both calls block the calling context until the transfer has completed.
pub trait BlockDevice: Sync {
    /// Fill `data` with block `blockno` of device `dev`.
    fn read_block(&self, dev: u32, blockno: u32, data: &mut [u8; BSIZE]);

    /// Store `data` as block `blockno` of device `dev`.
    fn write_block(&self, dev: u32, blockno: u32, data: &[u8; BSIZE]);
}
