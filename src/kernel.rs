//! Backing memory for regions.
//!
//! Every region buffer is requested straight from the operating system and
//! handed back when the region is dropped. This is also the only module that
//! turns byte offsets into addresses: the rest of the crate reads and writes
//! chunk metadata through [`RegionMemory::read_word`] and
//! [`RegionMemory::write_word`], which check every access against the bounds
//! of the buffer.

use std::ptr::NonNull;

use crate::utils::WORD_SIZE;

/// Zero sized handle the platform implementations hang off.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. The pool has nothing to do with the concrete APIs offered by
/// each kernel, it only needs a writable buffer of a given length.
trait PlatformMemory {
    /// Request a memory region of size `len`. It returns a pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: NonNull<u8>, len: usize);
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
            unsafe {
                munmap(addr.as_ptr().cast::<c_void>(), len as size_t);
            }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{os::raw::c_void, ptr::NonNull};

    use super::{Kernel, PlatformMemory};

    use windows::Win32::System::Memory;

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, _len: usize) {
            unsafe {
                let _ = Memory::VirtualFree(addr.as_ptr().cast::<c_void>(), 0, Memory::MEM_RELEASE);
            }
        }
    }
}

/// One buffer obtained from the operating system.
///
/// ```text
/// base                                               base + len
///  |                                                      |
///  v                                                      v
///  +--------------------------------------------------------+
///  |  word  |  word  |  word  |  ...           |  word      |
///  +--------------------------------------------------------+
///  ^        ^
///  |        |
/// offset 0  offset WORD_SIZE
/// ```
///
/// Offsets handed to the accessors must be word aligned and leave room for a
/// whole word before `len`. Anything else is a broken chunk invariant and
/// panics instead of touching memory outside the buffer.
pub(crate) struct RegionMemory {
    base: NonNull<u8>,
    len: usize,
}

// The buffer is owned exclusively by its region, nothing else keeps the address.
unsafe impl Send for RegionMemory {}

impl RegionMemory {
    /// Reserves `len` bytes. `None` if the kernel refuses.
    pub(crate) fn reserve(len: usize) -> Option<Self> {
        if len == 0 || len % WORD_SIZE != 0 {
            return None;
        }

        // mmap/VirtualAlloc hand out page aligned memory, so every word
        // aligned offset is also a word aligned address.
        let base = unsafe { Kernel::request_memory(len)? };

        Some(Self { base, len })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Address of the first byte of the buffer.
    #[inline]
    pub(crate) fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Whether `addr` falls in `[base, base + len)`.
    #[inline]
    pub(crate) fn contains(&self, addr: usize) -> bool {
        addr >= self.base_addr() && addr - self.base_addr() < self.len
    }

    #[inline]
    fn check(&self, offset: usize) {
        assert!(
            offset % WORD_SIZE == 0 && offset <= self.len - WORD_SIZE,
            "word access at offset {offset} outside region of {} bytes",
            self.len
        );
    }

    /// Reads the word stored at `offset`.
    #[inline]
    pub(crate) fn read_word(&self, offset: usize) -> usize {
        self.check(offset);
        unsafe { self.base.as_ptr().add(offset).cast::<usize>().read() }
    }

    /// Writes `value` as the word stored at `offset`.
    #[inline]
    pub(crate) fn write_word(&mut self, offset: usize, value: usize) {
        self.check(offset);
        unsafe { self.base.as_ptr().add(offset).cast::<usize>().write(value) }
    }

    /// Pointer to the byte at `offset`, as handed out to callers.
    #[inline]
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        assert!(offset < self.len, "offset {offset} outside region of {} bytes", self.len);
        unsafe { self.base.add(offset) }
    }

    /// Fills `len` bytes starting at `offset` with zeroes.
    pub(crate) fn zero(&mut self, offset: usize, len: usize) {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len),
            "zeroing {len} bytes at offset {offset} outside region of {} bytes",
            self.len
        );
        unsafe { self.base.as_ptr().add(offset).write_bytes(0, len) }
    }
}

impl Drop for RegionMemory {
    fn drop(&mut self) {
        unsafe { Kernel::return_memory(self.base, self.len) }
    }
}
