//! Error types returned by the pool.

use thiserror::Error;

/// Inconsistent construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The first region would already be larger than the whole pool may grow.
    #[error("initial size {initial_size} exceeds the pool ceiling of {max_total} bytes")]
    InitialExceedsMax { initial_size: usize, max_total: usize },

    /// A region this small could not hold a single chunk.
    #[error("region size {size} is below the minimum chunk size of {min} bytes")]
    RegionTooSmall { size: usize, min: usize },
}

/// Every failure the pool reports. None of them leave the pool unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    Config(#[from] ConfigError),

    /// The kernel refused a region, or growing would cross the ceiling.
    #[error("out of memory: {requested} bytes requested with {reserved} of {max_total} bytes reserved")]
    OutOfMemory {
        requested: usize,
        reserved: usize,
        max_total: usize,
    },

    /// The request can't fit in one region no matter how empty the pool is.
    #[error("request of {requested} bytes can never fit in a region of {region_capacity} bytes")]
    RequestTooLarge {
        requested: usize,
        region_capacity: usize,
    },

    #[error("allocation size must be greater than zero")]
    InvalidArgument,

    /// The released pointer doesn't name a live chunk of this pool.
    #[error("pointer {addr:#x} was not allocated by this pool")]
    InvalidPointer { addr: usize },
}

pub type Result<T> = std::result::Result<T, PoolError>;
