//! Zone segments: raw memory blocks a zone grows by.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use super::ALIGNMENT;
#[cfg(debug_assertions)]
use super::{ZAP_DELETED_BYTE, ZAP_UNINITIALIZED_BYTE};

/// Magic number for validating segment headers ("ZONE" in ASCII).
pub const MAGIC_ZONE_SEGMENT: u32 = 0x5a4f_4e45;

/// Bookkeeping stored at the start of every segment.
#[repr(C)]
struct SegmentHeader {
    magic: u32,
    _reserved: u32,
    size: usize,
}

/// Bytes at the start of each segment taken by bookkeeping, rounded up to
/// [`ALIGNMENT`] so the payload starts aligned.
pub const SEGMENT_OVERHEAD: usize =
    (std::mem::size_of::<SegmentHeader>() + ALIGNMENT - 1) & !(ALIGNMENT - 1);

/// A contiguous block backing part of a zone.
///
/// The block is exclusively owned; dropping the `Segment` releases it.
pub struct Segment {
    base: NonNull<u8>,
    size: usize,
}

impl Segment {
    /// Allocate a block of `size` bytes, header included.
    ///
    /// Running out of memory aborts through [`handle_alloc_error`].
    pub fn new(size: usize) -> Self {
        debug_assert!(size > SEGMENT_OVERHEAD);
        let Ok(layout) = Layout::from_size_align(size, ALIGNMENT) else {
            panic!("Zone segment of {size} bytes exceeds the addressable range");
        };

        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc(layout) };
        let Some(base) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };

        // SAFETY: we own all `size` bytes of the fresh block.
        unsafe {
            #[cfg(debug_assertions)]
            std::ptr::write_bytes(ptr, ZAP_UNINITIALIZED_BYTE, size);

            #[allow(clippy::cast_ptr_alignment)]
            ptr.cast::<SegmentHeader>().write(SegmentHeader {
                magic: MAGIC_ZONE_SEGMENT,
                _reserved: 0,
                size,
            });
        }

        let segment = Self { base, size };
        debug_assert_eq!(segment.start().as_ptr() as usize % ALIGNMENT, 0);
        segment
    }

    /// Total size in bytes, bookkeeping included.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// First usable byte, just past the header.
    #[inline]
    pub const fn start(&self) -> NonNull<u8> {
        // SAFETY: SEGMENT_OVERHEAD < size, so the result stays in the block.
        unsafe { self.base.add(SEGMENT_OVERHEAD) }
    }

    /// Usable bytes after the header.
    #[inline]
    pub const fn payload_size(&self) -> usize {
        self.size - SEGMENT_OVERHEAD
    }

    /// Returns `true` if the header is intact.
    pub fn is_valid(&self) -> bool {
        // SAFETY: the header was written in `new` and the block is still owned.
        #[allow(clippy::cast_ptr_alignment)]
        let header = unsafe { &*self.base.as_ptr().cast::<SegmentHeader>() };
        header.magic == MAGIC_ZONE_SEGMENT && header.size == self.size
    }

    /// Returns `true` if `ptr` lies in this segment's payload.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.start().as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr < self.base.as_ptr() as usize + self.size
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        debug_assert!(self.is_valid(), "zone segment header corrupted");
        // SAFETY: the block was allocated in `new` with exactly this layout.
        unsafe {
            #[cfg(debug_assertions)]
            std::ptr::write_bytes(self.base.as_ptr(), ZAP_DELETED_BYTE, self.size);

            let layout = Layout::from_size_align_unchecked(self.size, ALIGNMENT);
            dealloc(self.base.as_ptr(), layout);
        }
    }
}
