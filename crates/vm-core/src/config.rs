//! Zone configuration.

use crate::zone::{ALIGNMENT, INITIAL_CHUNK_SIZE, SEGMENT_OVERHEAD};

/// Default size of a standard zone segment (64 KiB).
pub const DEFAULT_SEGMENT_SIZE: usize = 64 * 1024;

/// Per-zone tuning knobs.
///
/// The defaults match what runtime code expects; tests shrink
/// `segment_size` to exercise expansion without large buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Size in bytes of every standard segment, bookkeeping included.
    pub segment_size: usize,
    /// Emit a `zone_expand` event with the zone's sizes whenever it grows.
    pub trace_zones: bool,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            trace_zones: false,
        }
    }
}

impl ZoneConfig {
    /// Largest request a standard segment can serve.
    ///
    /// Anything bigger gets a dedicated large segment.
    #[must_use]
    pub const fn max_segment_allocation(&self) -> usize {
        (self.segment_size - SEGMENT_OVERHEAD) & !(ALIGNMENT - 1)
    }

    /// Smallest accepted `segment_size`.
    ///
    /// A standard segment must serve anything the inline chunk can, so no
    /// request above [`max_segment_allocation`](Self::max_segment_allocation)
    /// is ever bump-allocated.
    pub const MIN_SEGMENT_SIZE: usize = INITIAL_CHUNK_SIZE + SEGMENT_OVERHEAD;

    /// Panics if the configuration cannot back a zone.
    pub(crate) fn validate(&self) {
        assert!(
            self.segment_size >= Self::MIN_SEGMENT_SIZE,
            "ZoneConfig: segment_size {} is below the minimum {}",
            self.segment_size,
            Self::MIN_SEGMENT_SIZE
        );
        assert!(
            self.segment_size % ALIGNMENT == 0,
            "ZoneConfig: segment_size {} is not a multiple of {}",
            self.segment_size,
            ALIGNMENT
        );
        debug_assert!(self.max_segment_allocation() >= INITIAL_CHUNK_SIZE);
    }
}
