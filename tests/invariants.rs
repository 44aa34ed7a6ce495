//! Property tests: random allocate/release sequences must keep every region
//! consistent.

use std::ptr::NonNull;

use mempool::{CHUNK_OVERHEAD, KB, MemoryPool, PoolError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    /// Index into the live allocations, modulo their count.
    Release(usize),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (1usize..600).prop_map(Op::Allocate),
        5 => any::<usize>().prop_map(Op::Release),
        1 => Just(Op::Clear),
    ]
}

fn check(pool: &MemoryPool) {
    assert!(pool.total_reserved() <= pool.max_total());

    let mut reserved = 0;
    let mut used = 0;
    let mut payload = 0;

    for stats in pool.region_stats() {
        let chunks = pool.chunks(stats.id).unwrap();

        // Tiling: chunks cover the region with no gap and no overlap.
        let mut offset = 0;
        for chunk in &chunks {
            assert_eq!(chunk.offset, offset);
            assert!(chunk.size >= CHUNK_OVERHEAD);
            offset = chunk.end();
        }
        assert_eq!(offset, stats.capacity);

        // Nothing free is left next to something free.
        for pair in chunks.windows(2) {
            assert!(!(pair[0].is_free && pair[1].is_free));
        }

        // Every chunk is on exactly the list matching its state.
        let free: Vec<_> = chunks.iter().filter(|c| c.is_free).copied().collect();
        let allocated: Vec<_> = chunks.iter().filter(|c| !c.is_free).copied().collect();
        let mut listed = pool.free_chunks(stats.id).unwrap();
        listed.sort_by_key(|c| c.offset);
        assert_eq!(listed, free);
        assert_eq!(pool.list_counts(stats.id), Some((free.len(), allocated.len())));

        // Counters match the allocated chunks.
        let sizes: usize = allocated.iter().map(|c| c.size).sum();
        assert_eq!(stats.allocated_bytes, sizes);
        assert_eq!(stats.payload_bytes, sizes - allocated.len() * CHUNK_OVERHEAD);

        reserved += stats.capacity;
        used += stats.allocated_bytes;
        payload += stats.payload_bytes;
    }

    assert_eq!(pool.total_reserved(), reserved);
    assert_eq!(pool.used_bytes(), used);
    assert_eq!(pool.payload_bytes(), payload);
    assert!((0.0..=1.0).contains(&pool.usage()));
}

proptest! {
    #[test]
    fn prop_regions_stay_consistent(ops in proptest::collection::vec(op(), 1..200)) {
        let mut pool = MemoryPool::new(4 * KB, KB).unwrap();
        let mut live: Vec<(NonNull<u8>, usize)> = Vec::new();

        for op in ops {
            match op {
                Op::Allocate(size) => match pool.allocate(size) {
                    Ok(ptr) => {
                        // Stamp the payload to catch overlapping chunks.
                        unsafe { ptr.as_ptr().write_bytes(size as u8, size) };
                        live.push((ptr, size));
                    }
                    Err(PoolError::OutOfMemory { .. }) => {}
                    Err(err) => panic!("unexpected error {err}"),
                },
                Op::Release(index) if !live.is_empty() => {
                    let (ptr, size) = live.swap_remove(index % live.len());
                    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
                    prop_assert!(bytes.iter().all(|&b| b == size as u8));
                    pool.release(ptr.as_ptr()).unwrap();
                }
                Op::Release(_) => {}
                Op::Clear => {
                    pool.clear();
                    live.clear();
                }
            }

            check(&pool);
        }

        for (ptr, _) in live.drain(..) {
            pool.release(ptr.as_ptr()).unwrap();
        }
        check(&pool);
        prop_assert_eq!(pool.used_bytes(), 0);
        for stats in pool.region_stats() {
            prop_assert_eq!(pool.list_counts(stats.id), Some((1, 0)));
        }
    }

    #[test]
    fn prop_adjacent_pair_merges_in_any_order(
        first in 1usize..400,
        second in 1usize..400,
        reversed in any::<bool>(),
    ) {
        let mut pool = MemoryPool::new(2 * KB, 2 * KB).unwrap();
        let a = pool.allocate(first).unwrap();
        let b = pool.allocate(second).unwrap();
        let _guard = pool.allocate(8).unwrap();

        let (x, y) = if reversed { (b, a) } else { (a, b) };
        pool.release(x.as_ptr()).unwrap();
        pool.release(y.as_ptr()).unwrap();

        let id = pool.region_ids()[0];
        let chunks = pool.chunks(id).unwrap();
        prop_assert!(chunks[0].is_free);
        prop_assert_eq!(chunks[0].offset, 0);
        prop_assert!(chunks[0].size >= first + second + 2 * CHUNK_OVERHEAD);
    }
}
