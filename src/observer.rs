//! Hooks the pool calls after allocations, releases and growth.
//!
//! Handy for tests and for debug dumps without sprinkling global state around
//! the allocator. Observers run synchronously, inside the pool lock when the
//! pool is a [`crate::SyncMemoryPool`], so they must not call back into the
//! pool.

use crate::region::RegionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationEvent {
    pub region: RegionId,
    /// Payload address returned to the caller.
    pub addr: usize,
    /// Bytes the caller asked for.
    pub requested: usize,
    /// Size of the chunk actually handed out, overhead included.
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseEvent {
    pub region: RegionId,
    pub addr: usize,
    pub chunk_size: usize,
    /// Size of the free chunk left after coalescing.
    pub merged_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendEvent {
    pub region: RegionId,
    pub capacity: usize,
    /// Bytes reserved by the pool once this region was added.
    pub total_reserved: usize,
}

pub trait PoolObserver: Send {
    fn on_allocate(&self, _event: &AllocationEvent) {}

    fn on_release(&self, _event: &ReleaseEvent) {}

    fn on_extend(&self, _event: &ExtendEvent) {}
}
