use crate::region::Region;

impl Region {
    /// Merges the free chunk at `chunk` with every free chunk directly next
    /// to it in memory and returns the offset of the surviving chunk.
    ///
    /// Neighbours are found by address, never by walking a list. The chunk
    /// before is located through its boundary tag, which is the word right
    /// before `chunk`:
    ///
    /// ```text
    ///            boundary tag of prev
    ///                     |
    ///                     v
    /// +------+---------+--------+------+---------+------+---------+
    /// | prev | payload | footer | hdr  | payload | next | payload |
    /// +------+---------+--------+------+---------+------+---------+
    /// ^                         ^                ^
    /// prev                      chunk            chunk + size
    /// ```
    ///
    /// The leftmost free chunk survives and keeps its place in the free list.
    /// Every chunk it absorbs is unlinked from the free list.
    pub(crate) fn coalesce(&mut self, chunk: usize) -> usize {
        debug_assert!(self.memory.is_free(chunk));

        // Walk back to the leftmost free chunk of the run.
        let mut head = chunk;
        while let Some(prev) = self.memory.chunk_before(head) {
            if !self.memory.is_free(prev) {
                break;
            }
            debug_assert_eq!(prev + self.memory.chunk_size(prev), head);
            head = prev;
        }

        // Absorb everything free to the right of it, `chunk` included.
        let capacity = self.capacity();
        let mut size = self.memory.chunk_size(head);
        let mut next = head + size;

        while next < capacity && self.memory.is_free(next) {
            size += self.memory.chunk_size(next);
            self.free_list.remove(&mut self.memory, next);
            next = head + size;
        }

        self.memory.set_chunk_size(head, size);
        self.memory.write_footer(head);

        head
    }
}
