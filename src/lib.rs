//! # mempool - a region based memory pool
//!
//! A user space allocator for programs doing lots of small, short lived
//! allocations. The pool reserves big buffers ("regions") from the kernel up
//! front and hands out variable sized chunks of them, so the hot path never
//! goes to the system allocator and total memory use is bounded.
//!
//! ```text
//!                                  MemoryPool
//!   +-------------------------------------------------------------------+
//!   |  max_total, total_reserved, region_capacity, auto_extend          |
//!   +-------------------------------------------------------------------+
//!          |
//!          v
//!   +----------------------------------+      +------------------------+
//!   | Region #1 (newest)               | ---> | Region #0              |
//!   | +------+ +------+ +------------+ |      | +--------------------+ |
//!   | | used | | free | |    used    | |      | |        free        | |
//!   | +------+ +------+ +------------+ |      | +--------------------+ |
//!   +----------------------------------+      +------------------------+
//! ```
//!
//! * Every chunk carries a header (size, state, list links) and a trailing
//!   boundary tag pointing back at the header.
//! * Allocation is first-fit over each region's free list, splitting chunks
//!   when the remainder is big enough to stand on its own.
//! * Release merges the chunk with free neighbours on both sides, using the
//!   boundary tag to find the one before it.
//! * When no region can serve a request the pool adds a new region, as long
//!   as it stays under `max_total`.
//!
//! [`MemoryPool`] has no locking at all. [`SyncMemoryPool`] puts the whole
//! pool behind one mutex.
//!
//! ```
//! use mempool::{MB, MemoryPool};
//!
//! let mut pool = MemoryPool::new(MB, MB).unwrap();
//!
//! let a = pool.allocate(100).unwrap();
//! let b = pool.allocate(200).unwrap();
//!
//! pool.release(a.as_ptr()).unwrap();
//! pool.release(b.as_ptr()).unwrap();
//!
//! assert_eq!(pool.used_bytes(), 0);
//! ```

mod chunk;
mod coalesce;
mod config;
mod error;
mod freelist;
mod kernel;
mod list;
mod observer;
mod pool;
mod region;
mod sync;
mod utils;

pub use chunk::{CHUNK_OVERHEAD, ChunkInfo, FOOTER_SIZE, HEADER_SIZE, MIN_CHUNK_SIZE, chunk_size_for};
pub use config::{GB, KB, MB, PoolConfig};
pub use error::{ConfigError, PoolError, Result};
pub use observer::{AllocationEvent, ExtendEvent, PoolObserver, ReleaseEvent};
pub use pool::MemoryPool;
pub use region::{RegionId, RegionStats};
pub use sync::SyncMemoryPool;
