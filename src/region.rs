use std::{fmt, ptr::NonNull};

use crate::{
    chunk::{CHUNK_OVERHEAD, ChunkInfo, HEADER_SIZE, MIN_CHUNK_SIZE},
    kernel::RegionMemory,
    list::ChunkList,
    utils::WORD_SIZE,
};

/// Identifier of a region, unique within its pool. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub(crate) u32);

impl RegionId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// One buffer reserved from the kernel and carved into chunks.
///
/// The chunks of a region always tile it exactly: walking from offset 0 and
/// jumping by each chunk's size lands on `capacity` with no gaps. Every chunk
/// is in exactly one of the two lists.
///
/// ```text
/// +----------------------------------------------------------------+
/// | +-------+ +------------+ +--------+ +-------------------------+ |
/// | | alloc | |    free    | | alloc  | |          free           | |
/// | +-------+ +------------+ +--------+ +-------------------------+ |
/// +----------------------------------------------------------------+
///     ^            ^              ^                  ^
///     |            +--------------|------------------+---- free_list
///     +---------------------------+-------------------------- alloc_list
/// ```
pub(crate) struct Region {
    pub(crate) id: RegionId,
    pub(crate) memory: RegionMemory,
    /// Sum of the sizes of allocated chunks, overhead included.
    pub(crate) allocated_bytes: usize,
    /// Same as `allocated_bytes` without the per-chunk overhead.
    pub(crate) payload_bytes: usize,
    pub(crate) free_list: ChunkList,
    pub(crate) alloc_list: ChunkList,
}

/// What a release did to the region, reported to observers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Released {
    pub chunk_size: usize,
    pub merged: ChunkInfo,
}

/// Per-region usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    pub id: RegionId,
    pub capacity: usize,
    pub allocated_bytes: usize,
    pub payload_bytes: usize,
    pub free_chunks: usize,
    pub allocated_chunks: usize,
}

impl Region {
    /// Reserves `capacity` bytes and lays them out as a single free chunk.
    /// `capacity` must be a word multiple of at least [`MIN_CHUNK_SIZE`].
    pub(crate) fn new(id: RegionId, capacity: usize) -> Option<Self> {
        debug_assert!(capacity >= MIN_CHUNK_SIZE && capacity % WORD_SIZE == 0);

        let mut region = Self {
            id,
            memory: RegionMemory::reserve(capacity)?,
            allocated_bytes: 0,
            payload_bytes: 0,
            free_list: ChunkList::new(),
            alloc_list: ChunkList::new(),
        };
        region.reset();

        Some(region)
    }

    /// Throws away all chunk metadata and starts over with one free chunk
    /// covering the whole buffer. Doesn't look at the existing chunks.
    pub(crate) fn reset(&mut self) {
        let capacity = self.capacity();

        self.memory.init_chunk(0, capacity, true);
        self.free_list.clear();
        self.alloc_list.clear();
        self.free_list.push_front(&mut self.memory, 0);

        self.allocated_bytes = 0;
        self.payload_bytes = 0;
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Bytes not owned by allocated chunks. An upper bound on the largest
    /// chunk this region could still hand out.
    #[inline]
    pub(crate) fn available(&self) -> usize {
        self.capacity() - self.allocated_bytes
    }

    #[inline]
    pub(crate) fn contains(&self, addr: usize) -> bool {
        self.memory.contains(addr)
    }

    /// Finds a chunk of at least `needed` bytes, moves it to the allocated
    /// list and returns its offset.
    pub(crate) fn allocate(&mut self, needed: usize) -> Option<usize> {
        let chunk = self.find_fit(needed)?;
        let chunk = self.take(chunk, needed);

        self.alloc_list.push_front(&mut self.memory, chunk);

        let size = self.memory.chunk_size(chunk);
        self.allocated_bytes += size;
        self.payload_bytes += size - CHUNK_OVERHEAD;

        Some(chunk)
    }

    /// Address handed to the caller for the chunk at `chunk`.
    #[inline]
    pub(crate) fn payload_ptr(&self, chunk: usize) -> NonNull<u8> {
        self.memory.ptr_at(chunk + HEADER_SIZE)
    }

    /// Zero fills every payload byte of an allocated chunk.
    pub(crate) fn zero_payload(&mut self, chunk: usize) {
        let payload = self.memory.chunk_size(chunk) - CHUNK_OVERHEAD;
        self.memory.zero(chunk + HEADER_SIZE, payload);
    }

    /// Maps a payload address back to the offset of its chunk.
    ///
    /// Only accepts addresses whose header looks like a live allocated chunk:
    /// aligned, in range, not free, and with a footer pointing back at it.
    /// Reads stay inside the buffer whatever `addr` is.
    pub(crate) fn chunk_of(&self, addr: usize) -> Option<usize> {
        if !self.contains(addr) {
            return None;
        }

        let capacity = self.capacity();
        let chunk = (addr - self.memory.base_addr()).checked_sub(HEADER_SIZE)?;

        if chunk % WORD_SIZE != 0 || chunk > capacity - MIN_CHUNK_SIZE {
            return None;
        }

        let size = self.memory.chunk_size(chunk);
        if size < MIN_CHUNK_SIZE || size % WORD_SIZE != 0 || size > capacity - chunk {
            return None;
        }

        if self.memory.is_free(chunk) || self.memory.footer(chunk) != chunk {
            return None;
        }

        Some(chunk)
    }

    /// Returns an allocated chunk to the free list and merges it with its
    /// free neighbours.
    pub(crate) fn release(&mut self, chunk: usize) -> Released {
        let chunk_size = self.memory.chunk_size(chunk);

        self.alloc_list.remove(&mut self.memory, chunk);
        self.free_list.push_front(&mut self.memory, chunk);
        self.memory.set_free(chunk, true);

        self.allocated_bytes -= chunk_size;
        self.payload_bytes -= chunk_size - CHUNK_OVERHEAD;

        let merged = self.coalesce(chunk);

        Released {
            chunk_size,
            merged: self.info(merged),
        }
    }

    fn info(&self, chunk: usize) -> ChunkInfo {
        ChunkInfo {
            offset: chunk,
            size: self.memory.chunk_size(chunk),
            is_free: self.memory.is_free(chunk),
        }
    }

    /// Every chunk in address order.
    pub(crate) fn chunks(&self) -> Vec<ChunkInfo> {
        let capacity = self.capacity();
        let mut chunks = Vec::new();
        let mut offset = 0;

        while offset < capacity {
            let info = self.info(offset);
            if info.size == 0 {
                break;
            }
            offset = info.end();
            chunks.push(info);
        }

        chunks
    }

    /// The free list in list order, most recently freed first.
    pub(crate) fn free_chunks(&self) -> Vec<ChunkInfo> {
        self.free_list
            .iter(&self.memory)
            .map(|chunk| self.info(chunk))
            .collect()
    }

    /// Free and allocated list lengths, counted by walking both lists.
    pub(crate) fn list_counts(&self) -> (usize, usize) {
        (
            self.free_list.iter(&self.memory).count(),
            self.alloc_list.iter(&self.memory).count(),
        )
    }

    pub(crate) fn stats(&self) -> RegionStats {
        RegionStats {
            id: self.id,
            capacity: self.capacity(),
            allocated_bytes: self.allocated_bytes,
            payload_bytes: self.payload_bytes,
            free_chunks: self.free_list.len(),
            allocated_chunks: self.alloc_list.len(),
        }
    }
}
