use crate::{chunk::CHUNK_OVERHEAD, region::Region};

/// Fit finder and splitter.
///
/// The free list of a region is never sorted. Released chunks go to the front
/// so the scan sees the most recently freed chunks first:
///
/// ```text
///                         Free List
///
///          next free              next free
///     +-----------------+   +-------------------+
///     |                 |   |                   |
/// +---|----------+------|---|------+------------|---------+
/// | +-|----+ +-------+ +|---|-+ +-------+ +-----|-------+ |
/// | | Free | | Alloc | | Free | | Alloc | |    Free     | |
/// | +------+ +-------+ +------+ +-------+ +-------------+ |
/// +-------------------------------------------------------+
/// ```
impl Region {
    /// Returns the offset of the first chunk on the free list that can hold
    /// `needed` bytes.
    ///
    /// This is first-fit, not best-fit: the scan stops at the first chunk
    /// that is big enough, in list order.
    pub(crate) fn find_fit(&self, needed: usize) -> Option<usize> {
        // Not enough room left even if every free byte were one chunk.
        if self.available() < needed {
            return None;
        }

        self.free_list
            .iter(&self.memory)
            .find(|&chunk| self.memory.chunk_size(chunk) >= needed)
    }

    /// Takes the free chunk at `chunk` off the free list, splitting it first
    /// when the leftover could form a chunk of its own.
    ///
    /// ```text
    /// Before:  +------------------------ free ------------------------+
    ///
    /// After:   +--- needed (allocated) ---+---- remainder (free) -----+
    /// ```
    ///
    /// The remainder takes the position of the original chunk in the free
    /// list. When the leftover is too small the whole chunk is handed out and
    /// the slack becomes internal fragmentation.
    pub(crate) fn take(&mut self, chunk: usize, needed: usize) -> usize {
        let size = self.memory.chunk_size(chunk);
        debug_assert!(self.memory.is_free(chunk) && size >= needed);

        if size - needed > CHUNK_OVERHEAD {
            let remainder = chunk + needed;

            self.memory.init_chunk(remainder, size - needed, true);
            self.free_list.replace(&mut self.memory, chunk, remainder);

            self.memory.init_chunk(chunk, needed, false);
        } else {
            self.free_list.remove(&mut self.memory, chunk);
            self.memory.set_free(chunk, false);
        }

        chunk
    }
}
