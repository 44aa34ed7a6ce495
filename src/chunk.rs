use crate::{
    kernel::RegionMemory,
    utils::{WORD_SIZE, align_word},
};

/// Header size of a chunk: size, flags and the two list links, one word each.
pub const HEADER_SIZE: usize = 4 * WORD_SIZE;

/// Size of the boundary tag stored in the last word of every chunk.
pub const FOOTER_SIZE: usize = WORD_SIZE;

/// Bookkeeping bytes every chunk carries on top of its payload.
pub const CHUNK_OVERHEAD: usize = HEADER_SIZE + FOOTER_SIZE;

/// Smallest chunk we will ever create: the overhead plus a single payload word.
/// Regions smaller than this can't hold anything.
pub const MIN_CHUNK_SIZE: usize = CHUNK_OVERHEAD + WORD_SIZE;

/// Link value marking the end of a chunk list.
pub(crate) const NIL: usize = usize::MAX;

const SIZE: usize = 0;
const FLAGS: usize = WORD_SIZE;
const PREV: usize = 2 * WORD_SIZE;
const NEXT: usize = 3 * WORD_SIZE;

const FREE_BIT: usize = 1;

/// Layout of a chunk inside its region's buffer. Offsets of the links are
/// relative to the start of the region, never absolute addresses.
///
/// ```text
/// offset ------> +---------------------+ <------+
///                |        size         |        |
///                +---------------------+        |
///                |     flags (free)    |        | -> Header
///                +---------------------+        |
///                |     prev offset     |        |
///                +---------------------+        |
///                |     next offset     |        |
///                +---------------------+ <------+
///                |       Payload       |        |
///                |         ...         |        | -> Addressable content
///                |         ...         |        |
///                +---------------------+ <------+
///                |       offset        |        | -> Footer (boundary tag)
/// offset+size -> +---------------------+ <------+
/// ```
///
/// The footer always holds the offset of its own header. That is what lets
/// the coalescer find the chunk right before any given chunk without walking
/// a list.
impl RegionMemory {
    #[inline]
    pub(crate) fn chunk_size(&self, chunk: usize) -> usize {
        self.read_word(chunk + SIZE)
    }

    #[inline]
    pub(crate) fn set_chunk_size(&mut self, chunk: usize, size: usize) {
        self.write_word(chunk + SIZE, size);
    }

    #[inline]
    pub(crate) fn is_free(&self, chunk: usize) -> bool {
        self.read_word(chunk + FLAGS) & FREE_BIT != 0
    }

    #[inline]
    pub(crate) fn set_free(&mut self, chunk: usize, is_free: bool) {
        self.write_word(chunk + FLAGS, if is_free { FREE_BIT } else { 0 });
    }

    #[inline]
    pub(crate) fn prev(&self, chunk: usize) -> usize {
        self.read_word(chunk + PREV)
    }

    #[inline]
    pub(crate) fn set_prev(&mut self, chunk: usize, prev: usize) {
        self.write_word(chunk + PREV, prev);
    }

    #[inline]
    pub(crate) fn next(&self, chunk: usize) -> usize {
        self.read_word(chunk + NEXT)
    }

    #[inline]
    pub(crate) fn set_next(&mut self, chunk: usize, next: usize) {
        self.write_word(chunk + NEXT, next);
    }

    /// Rewrites the boundary tag of `chunk` using its current size.
    #[inline]
    pub(crate) fn write_footer(&mut self, chunk: usize) {
        let end = chunk + self.chunk_size(chunk);
        self.write_word(end - FOOTER_SIZE, chunk);
    }

    #[inline]
    pub(crate) fn footer(&self, chunk: usize) -> usize {
        let end = chunk + self.chunk_size(chunk);
        self.read_word(end - FOOTER_SIZE)
    }

    /// Header offset of the chunk that ends right where `chunk` starts, read
    /// from its boundary tag. `None` for the first chunk of the region.
    #[inline]
    pub(crate) fn chunk_before(&self, chunk: usize) -> Option<usize> {
        if chunk < MIN_CHUNK_SIZE {
            return None;
        }
        Some(self.read_word(chunk - FOOTER_SIZE))
    }

    /// Writes a complete chunk: header, links cleared, footer.
    pub(crate) fn init_chunk(&mut self, chunk: usize, size: usize, is_free: bool) {
        self.set_chunk_size(chunk, size);
        self.set_free(chunk, is_free);
        self.set_prev(chunk, NIL);
        self.set_next(chunk, NIL);
        self.write_footer(chunk);
    }
}

/// Total chunk size needed to hand out `payload` bytes: payload plus header
/// and footer, rounded up to the word size. `None` on overflow.
pub fn chunk_size_for(payload: usize) -> Option<usize> {
    align_word(payload.checked_add(CHUNK_OVERHEAD)?)
}

/// Public view of one chunk, as reported by the introspection helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Offset of the chunk header from the start of its region.
    pub offset: usize,
    /// Total size including header and footer.
    pub size: usize,
    pub is_free: bool,
}

impl ChunkInfo {
    /// Bytes usable by a caller if this chunk is (or were) allocated.
    pub fn payload(&self) -> usize {
        self.size - CHUNK_OVERHEAD
    }

    /// Offset one past the last byte of the chunk.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}
