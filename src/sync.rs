use std::ptr::NonNull;

use parking_lot::{Mutex, MutexGuard};

use crate::{
    chunk::ChunkInfo,
    config::PoolConfig,
    error::Result,
    observer::PoolObserver,
    pool::MemoryPool,
    region::{RegionId, RegionStats},
};

/// A [`MemoryPool`] behind one pool-wide lock.
///
/// Every operation, read-only accessors included, holds the lock for its
/// whole duration, so no caller ever sees a region halfway through a split
/// or a merge. There is a single lock per pool, not one per region.
///
/// To run several operations under one acquisition use
/// [`SyncMemoryPool::lock`].
pub struct SyncMemoryPool {
    inner: Mutex<MemoryPool>,
}

impl SyncMemoryPool {
    pub fn new(max_total: usize, initial_size: usize) -> Result<Self> {
        PoolConfig::new(max_total).region_size(initial_size).build_sync()
    }

    pub(crate) fn from_pool(pool: MemoryPool) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// Drops the lock and hands back the plain pool. Needs ownership, so no
    /// other thread can be in the middle of an operation.
    pub fn into_inner(self) -> MemoryPool {
        self.inner.into_inner()
    }

    pub const fn is_thread_safe(&self) -> bool {
        true
    }

    /// Locks the pool until the guard is dropped.
    pub fn lock(&self) -> MutexGuard<'_, MemoryPool> {
        self.inner.lock()
    }

    pub fn set_observer(&self, observer: impl PoolObserver + 'static) {
        self.inner.lock().set_observer(observer);
    }

    pub fn take_observer(&self) -> Option<Box<dyn PoolObserver>> {
        self.inner.lock().take_observer()
    }

    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        self.inner.lock().allocate(size)
    }

    pub fn allocate_zeroed(&self, size: usize) -> Result<NonNull<u8>> {
        self.inner.lock().allocate_zeroed(size)
    }

    pub fn release(&self, ptr: *mut u8) -> Result<()> {
        self.inner.lock().release(ptr)
    }

    pub fn clear(&self) -> &Self {
        self.inner.lock().clear();
        self
    }

    /// Returns every region to the kernel. The lock goes with it.
    pub fn destroy(self) {
        self.into_inner().destroy();
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used_bytes()
    }

    pub fn payload_bytes(&self) -> usize {
        self.inner.lock().payload_bytes()
    }

    pub fn usage(&self) -> f64 {
        self.inner.lock().usage()
    }

    pub fn payload_usage(&self) -> f64 {
        self.inner.lock().payload_usage()
    }

    pub fn total_reserved(&self) -> usize {
        self.inner.lock().total_reserved()
    }

    pub fn max_total(&self) -> usize {
        self.inner.lock().max_total()
    }

    pub fn region_count(&self) -> usize {
        self.inner.lock().region_count()
    }

    pub fn region_stats(&self) -> Vec<RegionStats> {
        self.inner.lock().region_stats()
    }

    pub fn list_counts(&self, id: RegionId) -> Option<(usize, usize)> {
        self.inner.lock().list_counts(id)
    }

    pub fn chunks(&self, id: RegionId) -> Option<Vec<ChunkInfo>> {
        self.inner.lock().chunks(id)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::{chunk::chunk_size_for, config::KB};

    #[test]
    fn toggling_keeps_state() {
        let mut pool = MemoryPool::new(4 * KB, 4 * KB).unwrap();
        let a = pool.allocate(100).unwrap();

        let pool = pool.into_sync();
        assert!(pool.is_thread_safe());
        assert_eq!(pool.used_bytes(), chunk_size_for(100).unwrap());

        let mut pool = pool.into_inner();
        assert!(!pool.is_thread_safe());
        pool.release(a.as_ptr()).unwrap();
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn concurrent_allocate_and_release() {
        let pool = Arc::new(SyncMemoryPool::new(256 * KB, 64 * KB).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..200 {
                        let size = 16 + (t * 31 + i * 7) % 200;
                        let ptr = pool.allocate(size).unwrap();
                        unsafe { ptr.as_ptr().write_bytes(t as u8, size) };
                        pool.release(ptr.as_ptr()).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.used_bytes(), 0);
        assert_eq!(pool.payload_bytes(), 0);
        for stats in pool.region_stats() {
            assert_eq!(pool.list_counts(stats.id), Some((1, 0)));
        }
    }

    #[test]
    fn lock_batches_operations() {
        let pool = SyncMemoryPool::new(KB, KB).unwrap();

        {
            let mut guard = pool.lock();
            let a = guard.allocate(10).unwrap();
            let b = guard.allocate(10).unwrap();
            guard.release(a.as_ptr()).unwrap();
            guard.release(b.as_ptr()).unwrap();
        }

        assert_eq!(pool.used_bytes(), 0);
    }
}
