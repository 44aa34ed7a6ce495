use std::{cmp, ptr::NonNull};

use tracing::{debug, trace};

use crate::{
    chunk::{ChunkInfo, MIN_CHUNK_SIZE, chunk_size_for},
    config::PoolConfig,
    error::{PoolError, Result},
    observer::{AllocationEvent, ExtendEvent, PoolObserver, ReleaseEvent},
    region::{Region, RegionId, RegionStats},
    sync::SyncMemoryPool,
    utils::{WORD_SIZE, align_down},
};

/// A memory pool without any synchronization.
///
/// The pool owns a list of [`Region`]s, each a buffer reserved from the
/// kernel. New regions are only added when no existing region can satisfy a
/// request, and never past `max_total` bytes in total.
///
/// ```text
///  newest                                         oldest
/// +-----------------------+      +-----------------------+
/// | +-------+ +--------+  |      | +--------+ +-------+  |
/// | | Chunk | | Chunk  |  | ---> | | Chunk  | | Chunk |  |
/// | +-------+ +--------+  |      | +--------+ +-------+  |
/// +-----------------------+      +-----------------------+
/// ```
///
/// Mutating methods take `&mut self`, so the compiler already guarantees the
/// exclusive access the allocator needs. Use [`MemoryPool::into_sync`] to
/// share a pool between threads.
///
/// Pointers returned by [`MemoryPool::allocate`] stay valid until they are
/// released, the pool is cleared or the pool is dropped. Nothing checks that
/// callers stop using them after that.
pub struct MemoryPool {
    /// Oldest first. Scans go newest first.
    regions: Vec<Region>,
    region_capacity: usize,
    max_total: usize,
    total_reserved: usize,
    auto_extend: bool,
    next_region_id: u32,
    observer: Option<Box<dyn PoolObserver>>,
}

impl MemoryPool {
    /// Creates a pool with one region of `initial_size` bytes that may grow,
    /// one region of `initial_size` bytes at a time, up to `max_total`.
    pub fn new(max_total: usize, initial_size: usize) -> Result<Self> {
        PoolConfig::new(max_total).region_size(initial_size).build()
    }

    pub(crate) fn with_config(config: &PoolConfig) -> Result<Self> {
        let region_capacity = config.validate()?;

        let mut pool = Self {
            regions: Vec::new(),
            region_capacity,
            max_total: config.max_total,
            total_reserved: 0,
            auto_extend: region_capacity < config.max_total,
            next_region_id: 0,
            observer: None,
        };

        if pool.reserve_region(region_capacity).is_none() {
            return Err(PoolError::OutOfMemory {
                requested: region_capacity,
                reserved: 0,
                max_total: pool.max_total,
            });
        }

        debug!(
            max_total = pool.max_total,
            region_capacity,
            auto_extend = pool.auto_extend,
            "memory pool created"
        );

        Ok(pool)
    }

    /// Switches to the locked variant. Consuming `self` means nobody else can
    /// be using the pool while the switch happens.
    pub fn into_sync(self) -> SyncMemoryPool {
        SyncMemoryPool::from_pool(self)
    }

    pub const fn is_thread_safe(&self) -> bool {
        false
    }

    pub fn set_observer(&mut self, observer: impl PoolObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn PoolObserver>> {
        self.observer.take()
    }

    /// Allocates `size` bytes and returns a word aligned pointer to them.
    ///
    /// The search is first-fit over the regions, newest first. When nothing
    /// fits and the pool may still grow, a new region is added and the search
    /// runs once more.
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>> {
        let (index, chunk) = self.allocate_chunk(size)?;

        Ok(self.regions[index].payload_ptr(chunk))
    }

    /// Same as [`MemoryPool::allocate`], with every byte of the chunk's
    /// payload set to zero.
    pub fn allocate_zeroed(&mut self, size: usize) -> Result<NonNull<u8>> {
        let (index, chunk) = self.allocate_chunk(size)?;
        let region = &mut self.regions[index];

        region.zero_payload(chunk);

        Ok(region.payload_ptr(chunk))
    }

    fn allocate_chunk(&mut self, size: usize) -> Result<(usize, usize)> {
        if size == 0 {
            return Err(PoolError::InvalidArgument);
        }

        // A chunk never spans two regions.
        let needed = chunk_size_for(size)
            .filter(|&needed| needed <= self.region_capacity)
            .ok_or(PoolError::RequestTooLarge {
                requested: size,
                region_capacity: self.region_capacity,
            })?;

        let found = match self.find_fit(needed) {
            Some(found) => Some(found),
            None if self.extend().is_some() => self.find_fit(needed),
            None => None,
        };

        let Some((index, chunk)) = found else {
            debug!(
                requested = size,
                needed,
                reserved = self.total_reserved,
                max_total = self.max_total,
                "allocation failed"
            );
            return Err(PoolError::OutOfMemory {
                requested: size,
                reserved: self.total_reserved,
                max_total: self.max_total,
            });
        };

        let region = &self.regions[index];
        let event = AllocationEvent {
            region: region.id,
            addr: region.payload_ptr(chunk).as_ptr() as usize,
            requested: size,
            chunk_size: region.memory.chunk_size(chunk),
        };

        trace!(region = %event.region, offset = chunk, requested = size, chunk_size = event.chunk_size, "allocate");
        if let Some(observer) = &self.observer {
            observer.on_allocate(&event);
        }

        Ok((index, chunk))
    }

    fn find_fit(&mut self, needed: usize) -> Option<(usize, usize)> {
        self.regions
            .iter_mut()
            .enumerate()
            .rev()
            .find_map(|(index, region)| region.allocate(needed).map(|chunk| (index, chunk)))
    }

    /// Adds one region if the pool is allowed to grow. The new region is
    /// `region_capacity` bytes or whatever is left under the ceiling.
    fn extend(&mut self) -> Option<RegionId> {
        if !self.auto_extend || self.total_reserved >= self.max_total {
            return None;
        }

        let left = self.max_total - self.total_reserved;
        let capacity = align_down(cmp::min(self.region_capacity, left), WORD_SIZE);

        if capacity < MIN_CHUNK_SIZE {
            return None;
        }

        let id = self.reserve_region(capacity)?;
        let event = ExtendEvent {
            region: id,
            capacity,
            total_reserved: self.total_reserved,
        };

        debug!(region = %id, capacity, total_reserved = self.total_reserved, "pool extended");
        if let Some(observer) = &self.observer {
            observer.on_extend(&event);
        }

        Some(id)
    }

    fn reserve_region(&mut self, capacity: usize) -> Option<RegionId> {
        let id = RegionId(self.next_region_id);

        let Some(region) = Region::new(id, capacity) else {
            debug!(region = %id, capacity, "kernel refused region reservation");
            return None;
        };

        self.next_region_id += 1;
        self.total_reserved += capacity;
        self.regions.push(region);

        Some(id)
    }

    /// Gives a chunk back to the pool and merges it with free neighbours.
    ///
    /// A null pointer is accepted and ignored. Pointers outside every region,
    /// or that don't point at the start of a live allocation, are reported as
    /// [`PoolError::InvalidPointer`]. A pointer released twice is caught as
    /// long as its chunk hasn't been handed out again.
    pub fn release(&mut self, ptr: *mut u8) -> Result<()> {
        if ptr.is_null() {
            return Ok(());
        }

        let addr = ptr as usize;
        let region = self
            .regions
            .iter_mut()
            .find(|region| region.contains(addr))
            .ok_or(PoolError::InvalidPointer { addr })?;

        let chunk = region
            .chunk_of(addr)
            .ok_or(PoolError::InvalidPointer { addr })?;

        let released = region.release(chunk);
        let event = ReleaseEvent {
            region: region.id,
            addr,
            chunk_size: released.chunk_size,
            merged_size: released.merged.size,
        };

        trace!(
            region = %event.region,
            offset = chunk,
            chunk_size = event.chunk_size,
            merged_size = event.merged_size,
            "release"
        );
        if let Some(observer) = &self.observer {
            observer.on_release(&event);
        }

        Ok(())
    }

    /// Resets every region to a single free chunk. Every pointer handed out
    /// so far becomes invalid. Regions stay reserved.
    pub fn clear(&mut self) -> &mut Self {
        for region in &mut self.regions {
            region.reset();
        }

        debug!(regions = self.regions.len(), "memory pool cleared");

        self
    }

    /// Returns every region to the kernel. Same as dropping the pool.
    pub fn destroy(self) {
        drop(self);
    }

    /// Bytes held by allocated chunks, overhead included.
    pub fn used_bytes(&self) -> usize {
        self.regions.iter().map(|region| region.allocated_bytes).sum()
    }

    /// Bytes handed out to callers, without chunk overhead.
    pub fn payload_bytes(&self) -> usize {
        self.regions.iter().map(|region| region.payload_bytes).sum()
    }

    /// [`MemoryPool::used_bytes`] as a fraction of the reserved bytes.
    pub fn usage(&self) -> f64 {
        self.used_bytes() as f64 / self.total_reserved as f64
    }

    /// [`MemoryPool::payload_bytes`] as a fraction of the reserved bytes.
    pub fn payload_usage(&self) -> f64 {
        self.payload_bytes() as f64 / self.total_reserved as f64
    }

    /// Bytes reserved from the kernel across all regions.
    pub fn total_reserved(&self) -> usize {
        self.total_reserved
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }

    /// Largest chunk a single allocation can use.
    pub fn region_capacity(&self) -> usize {
        self.region_capacity
    }

    pub fn auto_extend(&self) -> bool {
        self.auto_extend
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Region ids, newest first.
    pub fn region_ids(&self) -> Vec<RegionId> {
        self.regions.iter().rev().map(|region| region.id).collect()
    }

    /// Usage of every region, newest first.
    pub fn region_stats(&self) -> Vec<RegionStats> {
        self.regions.iter().rev().map(Region::stats).collect()
    }

    /// `(free, allocated)` list lengths of a region, found by walking both
    /// lists. Meant for tests and debugging.
    pub fn list_counts(&self, id: RegionId) -> Option<(usize, usize)> {
        self.region(id).map(Region::list_counts)
    }

    /// All chunks of a region in address order.
    pub fn chunks(&self, id: RegionId) -> Option<Vec<ChunkInfo>> {
        self.region(id).map(Region::chunks)
    }

    /// Free chunks of a region in free list order.
    pub fn free_chunks(&self, id: RegionId) -> Option<Vec<ChunkInfo>> {
        self.region(id).map(Region::free_chunks)
    }

    fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        debug!(
            regions = self.regions.len(),
            total_reserved = self.total_reserved,
            "memory pool destroyed"
        );
    }
}
