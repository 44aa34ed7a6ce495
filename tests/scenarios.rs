//! End to end scenarios against the public API.

use mempool::{CHUNK_OVERHEAD, KB, MB, MemoryPool, PoolConfig, PoolError, chunk_size_for};

#[test]
fn adjacent_releases_merge_into_one_chunk() {
    let mut pool = MemoryPool::new(MB, MB).unwrap();

    let a = pool.allocate(100).unwrap();
    let b = pool.allocate(200).unwrap();
    pool.release(a.as_ptr()).unwrap();
    pool.release(b.as_ptr()).unwrap();

    let id = pool.region_ids()[0];
    let free = pool.free_chunks(id).unwrap();

    assert_eq!(free.len(), 1);
    assert!(free[0].size >= 300);
    assert_eq!(pool.region_stats()[0].allocated_bytes, 0);
}

#[test]
fn oversized_request_never_fits() {
    let mut pool = MemoryPool::new(2 * KB, KB).unwrap();

    for _ in 0..5 {
        assert!(matches!(
            pool.allocate(1500),
            Err(PoolError::RequestTooLarge { requested: 1500, .. })
        ));
    }
    assert_eq!(pool.total_reserved(), KB);
}

#[test]
fn exhausted_region_triggers_growth() {
    let mut pool = PoolConfig::new(3 * KB).region_size(KB).build().unwrap();
    assert!(pool.auto_extend());

    let size = 100;
    let per_region = KB / chunk_size_for(size).unwrap();
    for _ in 0..per_region {
        pool.allocate(size).unwrap();
    }
    assert_eq!(pool.region_count(), 1);

    // Whatever is left in the first region is smaller than a chunk.
    pool.allocate(size).unwrap();

    assert_eq!(pool.region_count(), 2);
    assert_eq!(pool.total_reserved(), 2 * KB);
}

#[test]
fn ceiling_is_never_crossed() {
    let mut pool = MemoryPool::new(3 * KB, KB).unwrap();

    let mut failures = 0;
    for _ in 0..64 {
        match pool.allocate(200) {
            Ok(_) => {}
            Err(PoolError::OutOfMemory { reserved, max_total, .. }) => {
                assert!(reserved <= max_total);
                failures += 1;
            }
            Err(err) => panic!("unexpected error {err}"),
        }
        assert!(pool.total_reserved() <= pool.max_total());
    }

    assert!(failures > 0);
    assert_eq!(pool.total_reserved(), 3 * KB);
}

#[test]
fn round_trip_restores_free_structure() {
    let mut pool = MemoryPool::new(4 * KB, 4 * KB).unwrap();
    let _keep = pool.allocate(64).unwrap();
    let id = pool.region_ids()[0];
    let before = pool.chunks(id).unwrap();

    let ptr = pool.allocate(300).unwrap();
    pool.release(ptr.as_ptr()).unwrap();

    assert_eq!(pool.chunks(id).unwrap(), before);
}

#[test]
fn pool_survives_errors() {
    let mut pool = MemoryPool::new(KB, KB).unwrap();

    assert!(pool.allocate(0).is_err());
    assert!(pool.allocate(4 * KB).is_err());
    assert!(pool.release(8 as *mut u8).is_err());

    let ptr = pool.allocate(KB - CHUNK_OVERHEAD).unwrap();
    assert!(pool.allocate(1).is_err());
    pool.release(ptr.as_ptr()).unwrap();
    assert!(pool.allocate(1).is_ok());
}

#[test]
fn clear_then_destroy() {
    let mut pool = MemoryPool::new(2 * KB, KB).unwrap();

    pool.allocate(KB - CHUNK_OVERHEAD).unwrap();
    pool.allocate(10).unwrap();
    assert!(pool.usage() > 0.5);

    pool.clear();
    assert_eq!(pool.usage(), 0.0);
    assert_eq!(pool.payload_usage(), 0.0);
    assert_eq!(pool.region_count(), 2);

    pool.destroy();
}

#[test]
fn sync_pool_builds_from_config() {
    let pool = PoolConfig::new(2 * KB).region_size(KB).build_sync().unwrap();

    let a = pool.allocate(KB - CHUNK_OVERHEAD).unwrap();
    let b = pool.allocate(16).unwrap();
    assert_eq!(pool.region_count(), 2);

    pool.release(a.as_ptr()).unwrap();
    pool.release(b.as_ptr()).unwrap();
    assert_eq!(pool.used_bytes(), 0);

    pool.clear();
    assert_eq!(pool.used_bytes(), 0);
    assert_eq!(pool.total_reserved(), 2 * KB);

    pool.destroy();
}
