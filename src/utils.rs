//! Size arithmetic shared by the chunk, region and pool modules.

use std::mem;

/// Machine word size. Every chunk size and every chunk offset is a multiple of this.
pub(crate) const WORD_SIZE: usize = mem::size_of::<usize>();

/// It aligns `to_be_aligned` up to the next multiple of `aligment`.
///
/// `aligment` must be a power of two. Returns `None` when rounding up would
/// overflow, which callers report as a request that can never fit.
pub(crate) fn align(to_be_aligned: usize, aligment: usize) -> Option<usize> {
    Some(to_be_aligned.checked_add(aligment - 1)? & !(aligment - 1))
}

/// Rounds `value` down to a multiple of `aligment` (a power of two).
///
/// Region capacities go through this so a chunk spanning the whole region
/// still has a word-aligned footer.
pub(crate) fn align_down(value: usize, aligment: usize) -> usize {
    value & !(aligment - 1)
}

/// Word alignment, the only alignment chunks ever need.
#[inline]
pub(crate) fn align_word(value: usize) -> Option<usize> {
    align(value, WORD_SIZE)
}
