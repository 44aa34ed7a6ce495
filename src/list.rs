use crate::{chunk::NIL, kernel::RegionMemory};

/// Doubly linked list of chunks living inside one region.
///
/// The list itself only stores the offset of its first chunk. The `prev` and
/// `next` links are kept in the chunk headers, so pushing and removing never
/// allocates. Since links are offsets into the region buffer instead of raw
/// pointers, every hop goes through the bounds checked accessors of
/// [`RegionMemory`].
///
/// ```text
///   head
///    |
///    v
/// +-------+  next   +-------+  next   +-------+
/// | chunk | ------> | chunk | ------> | chunk | --> NIL
/// |       | <------ |       | <------ |       |
/// +-------+  prev   +-------+  prev   +-------+
/// ```
///
/// A region owns two of these: one for free chunks and one for allocated ones.
pub(crate) struct ChunkList {
    head: usize,
    len: usize,
}

pub(crate) struct Iter<'a> {
    memory: &'a RegionMemory,
    current: usize,
    remaining: usize,
}

impl ChunkList {
    pub const fn new() -> Self {
        Self { head: NIL, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Forgets every chunk. Used when a region is reset wholesale.
    pub fn clear(&mut self) {
        self.head = NIL;
        self.len = 0;
    }

    /// Links `chunk` in as the new head of the list.
    pub fn push_front(&mut self, memory: &mut RegionMemory, chunk: usize) {
        memory.set_prev(chunk, NIL);
        memory.set_next(chunk, self.head);

        if self.head != NIL {
            memory.set_prev(self.head, chunk);
        }

        self.head = chunk;
        self.len += 1;
    }

    /// Unlinks `chunk`. It must currently be a member of this list.
    pub fn remove(&mut self, memory: &mut RegionMemory, chunk: usize) {
        let prev = memory.prev(chunk);
        let next = memory.next(chunk);

        if prev == NIL {
            self.head = next;
        } else {
            memory.set_next(prev, next);
        }

        if next != NIL {
            memory.set_prev(next, prev);
        }

        memory.set_prev(chunk, NIL);
        memory.set_next(chunk, NIL);
        self.len -= 1;
    }

    /// Puts `new` exactly where `old` was in the list. `new` must not be a
    /// member of any list and its header must not overlap the header of `old`.
    pub fn replace(&mut self, memory: &mut RegionMemory, old: usize, new: usize) {
        let prev = memory.prev(old);
        let next = memory.next(old);

        memory.set_prev(new, prev);
        memory.set_next(new, next);

        if prev == NIL {
            self.head = new;
        } else {
            memory.set_next(prev, new);
        }

        if next != NIL {
            memory.set_prev(next, new);
        }
    }

    pub fn iter<'a>(&self, memory: &'a RegionMemory) -> Iter<'a> {
        Iter {
            memory,
            current: self.head,
            remaining: self.len,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        // `remaining` bounds the walk even if the links ever form a cycle.
        if self.current == NIL || self.remaining == 0 {
            return None;
        }

        let chunk = self.current;
        self.current = self.memory.next(chunk);
        self.remaining -= 1;

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
