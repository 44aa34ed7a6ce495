use crate::{
    chunk::MIN_CHUNK_SIZE,
    error::{ConfigError, Result},
    pool::MemoryPool,
    sync::SyncMemoryPool,
    utils::{WORD_SIZE, align_down},
};

pub const KB: usize = 1 << 10;
pub const MB: usize = 1 << 20;
pub const GB: usize = 1 << 30;

/// Construction parameters of a pool.
///
/// `region_size` is both the size of the first region and of every region
/// added later. When it equals `max_total` the pool never grows.
///
/// ```
/// use mempool::{KB, PoolConfig};
///
/// let mut pool = PoolConfig::new(3 * KB).region_size(KB).build().unwrap();
/// assert!(pool.auto_extend());
/// assert!(pool.allocate(100).is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Ceiling on the bytes reserved across all regions.
    pub max_total: usize,
    pub region_size: usize,
}

impl PoolConfig {
    pub const fn new(max_total: usize) -> Self {
        Self {
            max_total,
            region_size: max_total,
        }
    }

    pub const fn region_size(mut self, region_size: usize) -> Self {
        self.region_size = region_size;
        self
    }

    /// Checks the parameters and returns the capacity regions will actually
    /// get: `region_size` rounded down to a word multiple.
    pub fn validate(&self) -> std::result::Result<usize, ConfigError> {
        if self.region_size > self.max_total {
            return Err(ConfigError::InitialExceedsMax {
                initial_size: self.region_size,
                max_total: self.max_total,
            });
        }

        let capacity = align_down(self.region_size, WORD_SIZE);
        if capacity < MIN_CHUNK_SIZE {
            return Err(ConfigError::RegionTooSmall {
                size: self.region_size,
                min: MIN_CHUNK_SIZE,
            });
        }

        Ok(capacity)
    }

    /// Builds an unsynchronized pool.
    pub fn build(&self) -> Result<MemoryPool> {
        MemoryPool::with_config(self)
    }

    /// Builds a pool guarded by a single pool-wide lock.
    pub fn build_sync(&self) -> Result<SyncMemoryPool> {
        Ok(self.build()?.into_sync())
    }
}
