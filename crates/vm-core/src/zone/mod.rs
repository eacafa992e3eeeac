//! Bump-pointer zones.
//!
//! A [`Zone`] hands out memory by advancing a cursor through its current
//! chunk. The first chunk is a small buffer stored inline in the zone; once
//! it is used up the zone chains standard segments of
//! [`ZoneConfig::segment_size`] bytes. Requests too big for a standard
//! segment get a dedicated large segment each. Nothing is freed until the
//! whole zone is torn down.
//!
//! # Nesting
//!
//! Zones form a stack: [`Zone::nested`] creates a zone whose `previous`
//! link is the enclosing zone, and the borrow checker keeps the inner zone
//! from outliving it. [`Zone::visit_object_pointers`] walks that stack from
//! the innermost zone outwards, reporting each zone's handles once.
//!
//! # Threading
//!
//! A zone belongs to the thread that created it. `Zone` is neither `Send`
//! nor `Sync`; worker threads build their own zone stacks.

mod handles;
mod segment;

pub use handles::{ZoneHandle, ZoneHandles, HANDLE_BLOCK_SIZE};
pub use segment::{Segment, MAGIC_ZONE_SEGMENT, SEGMENT_OVERHEAD};

use std::cell::{Cell, RefCell, UnsafeCell};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};

use crate::config::ZoneConfig;
use crate::tracing::{internal, next_zone_id, ZoneId};
use crate::visitor::{ObjectPointerVisitor, ObjectPtr};

/// Alignment of every zone allocation.
pub const ALIGNMENT: usize = mem::size_of::<usize>();

/// Size of the buffer embedded in every zone.
pub const INITIAL_CHUNK_SIZE: usize = 128;

/// Written over released zone memory in debug builds.
pub const ZAP_DELETED_BYTE: u8 = 0x2b;

/// Written over freshly carved zone memory in debug builds.
pub const ZAP_UNINITIALIZED_BYTE: u8 = 0xab;

#[inline]
const fn round_up(size: usize) -> Option<usize> {
    match size.checked_add(ALIGNMENT - 1) {
        Some(padded) => Some(padded & !(ALIGNMENT - 1)),
        None => None,
    }
}

#[repr(C, align(16))]
struct InitialBuffer(UnsafeCell<[MaybeUninit<u8>; INITIAL_CHUNK_SIZE]>);

impl InitialBuffer {
    const fn new() -> Self {
        Self(UnsafeCell::new([MaybeUninit::uninit(); INITIAL_CHUNK_SIZE]))
    }

    #[inline]
    const fn as_ptr(&self) -> *mut u8 {
        self.0.get().cast::<u8>()
    }

    #[cfg(debug_assertions)]
    fn zap(&self, byte: u8) {
        // SAFETY: the buffer is INITIAL_CHUNK_SIZE bytes and owned by the zone.
        unsafe { ptr::write_bytes(self.as_ptr(), byte, INITIAL_CHUNK_SIZE) };
    }
}

/// A scoped bump-pointer arena, freed only in bulk.
///
/// `position` and `limit` are offsets into the current chunk: the inline
/// buffer while no segment is chained, otherwise the newest segment.
pub struct Zone<'p> {
    id: ZoneId,
    config: ZoneConfig,
    position: Cell<usize>,
    limit: Cell<usize>,
    /// Payload start of the newest standard segment.
    head: Cell<Option<NonNull<u8>>>,
    /// Standard segments, oldest first.
    segments: RefCell<Vec<Segment>>,
    /// One segment per oversized allocation.
    large_segments: RefCell<Vec<Segment>>,
    handles: ZoneHandles,
    previous: Option<&'p Zone<'p>>,
    initial_buffer: InitialBuffer,
    _marker: PhantomData<*mut ()>,
}

impl Zone<'static> {
    /// Create an outermost zone with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ZoneConfig::default())
    }

    /// Create an outermost zone.
    #[must_use]
    pub fn with_config(config: ZoneConfig) -> Self {
        Zone::build(config, None)
    }
}

impl Default for Zone<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> Zone<'p> {
    /// Create a zone nested inside `previous`, sharing its configuration.
    #[must_use]
    pub fn nested(previous: &'p Zone<'p>) -> Self {
        Self::build(previous.config, Some(previous))
    }

    /// Create a zone nested inside `previous` with its own configuration.
    #[must_use]
    pub fn nested_with_config(previous: &'p Zone<'p>, config: ZoneConfig) -> Self {
        Self::build(config, Some(previous))
    }

    fn build(config: ZoneConfig, previous: Option<&'p Zone<'p>>) -> Self {
        config.validate();
        let zone = Self {
            id: next_zone_id(),
            config,
            position: Cell::new(0),
            limit: Cell::new(INITIAL_CHUNK_SIZE),
            head: Cell::new(None),
            segments: RefCell::new(Vec::new()),
            large_segments: RefCell::new(Vec::new()),
            handles: ZoneHandles::new(),
            previous,
            initial_buffer: InitialBuffer::new(),
            _marker: PhantomData,
        };
        #[cfg(debug_assertions)]
        zone.initial_buffer.zap(ZAP_UNINITIALIZED_BYTE);
        zone
    }

    /// Identifier used to correlate this zone's trace events.
    #[inline]
    pub const fn id(&self) -> ZoneId {
        self.id
    }

    /// Configuration the zone was built with.
    #[inline]
    pub const fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// The zone that was active when this one was created.
    #[inline]
    pub const fn previous(&self) -> Option<&'p Zone<'p>> {
        self.previous
    }

    #[inline]
    fn chunk_base(&self) -> *mut u8 {
        match self.head.get() {
            Some(start) => start.as_ptr(),
            None => self.initial_buffer.as_ptr(),
        }
    }

    /// Allocate `size` bytes aligned to [`ALIGNMENT`].
    ///
    /// The memory is uninitialized (zapped with [`ZAP_UNINITIALIZED_BYTE`] in
    /// debug builds) and stays valid until the zone is destroyed.
    ///
    /// # Panics
    ///
    /// Panics if `size` cannot be rounded up to [`ALIGNMENT`] without
    /// overflowing.
    pub fn allocate(&self, size: usize) -> NonNull<u8> {
        let Some(size) = round_up(size) else {
            panic!("Zone::allocate: request of {size} bytes overflows");
        };

        let position = self.position.get();
        if self.limit.get() - position >= size {
            self.position.set(position + size);
            // SAFETY: position + size <= limit, which is within the current chunk.
            return unsafe { NonNull::new_unchecked(self.chunk_base().add(position)) };
        }
        self.expand(size)
    }

    #[cold]
    fn expand(&self, size: usize) -> NonNull<u8> {
        debug_assert_eq!(size % ALIGNMENT, 0);
        debug_assert!(self.limit.get() - self.position.get() < size);

        if size > self.config.max_segment_allocation() {
            return self.allocate_large_segment(size);
        }

        let segment = Segment::new(self.config.segment_size);
        let start = segment.start();
        let limit = segment.payload_size();
        self.segments.borrow_mut().push(segment);

        self.head.set(Some(start));
        self.position.set(size);
        self.limit.set(limit);
        debug_assert!(self.position.get() <= self.limit.get());

        if self.config.trace_zones {
            internal::log_zone_expand(
                self.id,
                size,
                self.size_in_bytes(),
                self.large_segment_bytes(),
            );
        }
        start
    }

    fn allocate_large_segment(&self, size: usize) -> NonNull<u8> {
        let Some(segment_size) = size.checked_add(SEGMENT_OVERHEAD) else {
            panic!("Zone::allocate: large request of {size} bytes overflows");
        };
        let segment = Segment::new(segment_size);
        let start = segment.start();
        self.large_segments.borrow_mut().push(segment);

        internal::log_large_segment(self.id, segment_size);
        if self.config.trace_zones {
            internal::log_zone_expand(
                self.id,
                size,
                self.size_in_bytes(),
                self.large_segment_bytes(),
            );
        }
        start
    }

    /// Move `value` into the zone.
    ///
    /// The value is never dropped; the zone releases its memory wholesale.
    ///
    /// # Panics
    ///
    /// Panics if `T` needs stricter alignment than [`ALIGNMENT`].
    #[allow(clippy::mut_from_ref)]
    pub fn alloc<T>(&self, value: T) -> &mut T {
        assert_zone_alignment::<T>();
        let ptr = self.allocate(mem::size_of::<T>()).cast::<T>();
        // SAFETY: the span is fresh, aligned and large enough for a `T`.
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Allocate `len` copies of `fill`.
    ///
    /// # Panics
    ///
    /// Panics if the byte size overflows or `T` needs stricter alignment
    /// than [`ALIGNMENT`].
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_array<T: Copy>(&self, len: usize, fill: T) -> &mut [T] {
        assert_zone_alignment::<T>();
        let Some(bytes) = len.checked_mul(mem::size_of::<T>()) else {
            panic!(
                "Zone::alloc_array: {len} elements of {} bytes overflow",
                mem::size_of::<T>()
            );
        };
        let ptr = self.allocate(bytes).cast::<T>().as_ptr();
        // SAFETY: the span holds `len` aligned `T`s and every one is written
        // before the slice is formed.
        unsafe {
            for i in 0..len {
                ptr.add(i).write(fill);
            }
            std::slice::from_raw_parts_mut(ptr, len)
        }
    }

    /// Copy `text` into the zone followed by a NUL terminator.
    ///
    /// The returned slice excludes the terminator.
    pub fn copy_string(&self, text: &str) -> &str {
        let len = text.len();
        let Some(with_nul) = len.checked_add(1) else {
            panic!("Zone::copy_string: string length overflows");
        };
        let dst = self.allocate(with_nul).as_ptr();
        // SAFETY: `dst` has room for len + 1 bytes and cannot overlap `text`.
        unsafe {
            ptr::copy_nonoverlapping(text.as_ptr(), dst, len);
            dst.add(len).write(0);
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(dst, len))
        }
    }

    /// Render `args` into the zone, NUL-terminated.
    ///
    /// The text is measured first and then written into an allocation of
    /// exactly `length + 1` bytes. Use through [`zone_format!`].
    ///
    /// # Panics
    ///
    /// Panics if a formatting implementation reports an error or renders a
    /// different length on the second pass.
    ///
    /// [`zone_format!`]: crate::zone_format
    pub fn format_to_string(&self, args: fmt::Arguments<'_>) -> &str {
        let mut counter = LengthCounter(0);
        if fmt::write(&mut counter, args).is_err() {
            panic!("Zone::format_to_string: formatting failed");
        }
        let len = counter.0;

        let dst = self.allocate(len + 1).as_ptr();
        let mut writer = RawWriter {
            dst,
            capacity: len,
            written: 0,
        };
        if fmt::write(&mut writer, args).is_err() || writer.written != len {
            panic!("Zone::format_to_string: output changed between passes");
        }
        // SAFETY: all `len` bytes were written from `str` fragments, and the
        // terminator slot is in bounds.
        unsafe {
            dst.add(len).write(0);
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(dst, len))
        }
    }

    /// Allocate a root slot holding `object`.
    pub fn new_handle(&self, object: ObjectPtr) -> ZoneHandle<'_> {
        ZoneHandle::new(self.handles.allocate(object))
    }

    /// This zone's handle table.
    #[inline]
    pub const fn handles(&self) -> &ZoneHandles {
        &self.handles
    }

    /// Report the handles of this zone and of every enclosing zone,
    /// innermost first.
    pub fn visit_object_pointers<V>(&self, visitor: &mut V)
    where
        V: ObjectPointerVisitor + ?Sized,
    {
        let mut zone: Option<&Zone<'_>> = Some(self);
        while let Some(current) = zone {
            current.handles.visit_object_pointers(visitor);
            zone = current.previous;
        }
    }

    /// Bytes committed to this zone's allocations.
    ///
    /// Counts whole segments except for the consumed part of the current
    /// chunk, plus every large segment.
    pub fn size_in_bytes(&self) -> usize {
        let large = self.large_segment_bytes();
        let segments = self.segments.borrow();
        match segments.split_last() {
            None => large + self.position.get(),
            Some((_head, older)) => {
                large
                    + INITIAL_CHUNK_SIZE
                    + older.iter().map(Segment::size).sum::<usize>()
                    + self.position.get()
            }
        }
    }

    /// Bytes held by large segments, bookkeeping included.
    pub fn large_segment_bytes(&self) -> usize {
        self.large_segments.borrow().iter().map(Segment::size).sum()
    }

    /// Number of standard segments chained so far.
    pub fn segment_count(&self) -> usize {
        self.segments.borrow().len()
    }

    /// Number of large segments.
    pub fn large_segment_count(&self) -> usize {
        self.large_segments.borrow().len()
    }

    /// Bytes left in the current chunk.
    pub fn capacity_remaining(&self) -> usize {
        self.limit.get() - self.position.get()
    }

    /// Release every segment and start over on the inline buffer.
    ///
    /// Also unlinks `previous` and drops every handle.
    pub fn destroy_all(&mut self) {
        let released = self.size_in_bytes();

        // Segment::drop zaps each block in debug builds.
        self.segments.get_mut().clear();
        self.large_segments.get_mut().clear();

        #[cfg(debug_assertions)]
        self.initial_buffer.zap(ZAP_DELETED_BYTE);

        self.head.set(None);
        self.position.set(0);
        self.limit.set(INITIAL_CHUNK_SIZE);
        self.previous = None;
        self.handles.reset();

        internal::log_zone_destroy(self.id, released);
    }
}

impl Drop for Zone<'_> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

impl fmt::Debug for Zone<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("size_in_bytes", &self.size_in_bytes())
            .field("segments", &self.segment_count())
            .field("large_segments", &self.large_segment_count())
            .field("handles", &self.handles.len())
            .field("nested", &self.previous.is_some())
            .finish()
    }
}

/// Allocate a formatted, NUL-terminated string in a zone.
///
/// ```
/// use vm_core::{zone_format, Zone};
///
/// let zone = Zone::new();
/// let s = zone_format!(zone, "Hello {}!", "World");
/// assert_eq!(s, "Hello World!");
/// ```
#[macro_export]
macro_rules! zone_format {
    ($zone:expr, $($arg:tt)*) => {
        $zone.format_to_string(::std::format_args!($($arg)*))
    };
}

fn assert_zone_alignment<T>() {
    assert!(
        mem::align_of::<T>() <= ALIGNMENT,
        "Zone: {} requires alignment {} but zone allocations are aligned to {}",
        std::any::type_name::<T>(),
        mem::align_of::<T>(),
        ALIGNMENT
    );
}

struct LengthCounter(usize);

impl fmt::Write for LengthCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct RawWriter {
    dst: *mut u8,
    capacity: usize,
    written: usize,
}

impl fmt::Write for RawWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if s.len() > self.capacity - self.written {
            return Err(fmt::Error);
        }
        // SAFETY: bounds checked above; `dst` covers `capacity` bytes.
        unsafe { ptr::copy_nonoverlapping(s.as_ptr(), self.dst.add(self.written), s.len()) };
        self.written += s.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ZoneConfig {
        ZoneConfig {
            segment_size: 1024,
            trace_zones: false,
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0), Some(0));
        assert_eq!(round_up(1), Some(ALIGNMENT));
        assert_eq!(round_up(ALIGNMENT), Some(ALIGNMENT));
        assert_eq!(round_up(usize::MAX), None);
    }

    #[test]
    fn test_first_allocations_use_inline_buffer() {
        let zone = Zone::new();
        let a = zone.allocate(16);
        let b = zone.allocate(16);
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
        assert_eq!(zone.segment_count(), 0);
        assert_eq!(zone.size_in_bytes(), 32);
    }

    #[test]
    fn test_expand_chains_new_head() {
        let zone = Zone::with_config(small_config());
        zone.allocate(INITIAL_CHUNK_SIZE);
        assert_eq!(zone.capacity_remaining(), 0);

        let p = zone.allocate(8);
        assert_eq!(zone.segment_count(), 1);
        assert!(zone.segments.borrow()[0].contains(p.as_ptr()));
        assert_eq!(zone.capacity_remaining(), 1024 - SEGMENT_OVERHEAD - 8);
    }

    #[test]
    fn test_large_request_keeps_head_untouched() {
        let zone = Zone::with_config(small_config());
        zone.allocate(8);
        let before = zone.capacity_remaining();

        zone.allocate(4096);
        assert_eq!(zone.large_segment_count(), 1);
        assert_eq!(zone.segment_count(), 0);
        assert_eq!(zone.capacity_remaining(), before);
    }

    #[test]
    fn test_destroy_all_resets_state() {
        let mut zone = Zone::with_config(small_config());
        for _ in 0..100 {
            zone.allocate(64);
        }
        zone.allocate(8192);
        zone.new_handle(ptr::null_mut());
        zone.destroy_all();

        assert_eq!(zone.size_in_bytes(), 0);
        assert_eq!(zone.segment_count(), 0);
        assert_eq!(zone.large_segment_count(), 0);
        assert_eq!(zone.capacity_remaining(), INITIAL_CHUNK_SIZE);
        assert!(zone.handles().is_empty());
    }

    #[test]
    fn test_format_uses_exact_length() {
        let zone = Zone::new();
        let before = zone.size_in_bytes();
        let s = zone_format!(zone, "{}-{}", 12, "ab");
        assert_eq!(s, "12-ab");
        // 5 bytes plus terminator, rounded up.
        assert_eq!(zone.size_in_bytes() - before, round_up(6).unwrap());
        let terminator = unsafe { *s.as_ptr().add(s.len()) };
        assert_eq!(terminator, 0);
    }
}
