use kernel_info::param::{NBUCKET, NBUF};

/// Geometry of a [`BufferCache`](crate::BufferCache).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferCacheConfig {
    buffers: usize,
    buckets: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("the buffer cache needs at least one buffer")]
    NoBuffers,
    #[error("the buffer cache needs at least one bucket")]
    NoBuckets,
}

impl BufferCacheConfig {
    /// # Errors
    /// [`ConfigError::NoBuffers`] or [`ConfigError::NoBuckets`] if either
    /// count is zero.
    pub const fn new(buffers: usize, buckets: usize) -> Result<Self, ConfigError> {
        if buffers == 0 {
            return Err(ConfigError::NoBuffers);
        }
        if buckets == 0 {
            return Err(ConfigError::NoBuckets);
        }
        Ok(Self { buffers, buckets })
    }

    /// Number of buffers in the pool.
    #[must_use]
    pub const fn buffers(&self) -> usize {
        self.buffers
    }

    /// Number of hash buckets.
    #[must_use]
    pub const fn buckets(&self) -> usize {
        self.buckets
    }
}

impl Default for BufferCacheConfig {
    fn default() -> Self {
        Self {
            buffers: NBUF,
            buckets: NBUCKET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_kernel_geometry() {
        let c = BufferCacheConfig::default();
        assert_eq!((c.buffers(), c.buckets()), (30, 13));
    }

    #[test]
    fn empty_pools_are_rejected() {
        assert_eq!(BufferCacheConfig::new(0, 1), Err(ConfigError::NoBuffers));
        assert_eq!(BufferCacheConfig::new(1, 0), Err(ConfigError::NoBuckets));
        assert!(BufferCacheConfig::new(1, 1).is_ok());
    }
}
