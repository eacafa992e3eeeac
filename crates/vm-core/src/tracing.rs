//! Runtime tracing support.
//!
//! When the `tracing` feature is enabled, this module provides structured
//! spans and events for zone growth and thread lifecycle. Without the feature
//! every hook compiles to nothing.

use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identifier for a zone.
///
/// Used to correlate all events emitted by one zone over its lifetime. It is
/// a monotonically increasing counter starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(pub u64);

static NEXT_ZONE_ID: AtomicU64 = AtomicU64::new(1);

/// Generate the next unique zone ID.
pub fn next_zone_id() -> ZoneId {
    ZoneId(NEXT_ZONE_ID.fetch_add(1, Ordering::Relaxed))
}

#[cfg(feature = "tracing")]
pub mod internal {
    use super::ZoneId;
    use tracing::{span, Level};

    /// Log a zone growing by one segment (or one large segment).
    pub fn log_zone_expand(zone: ZoneId, requested: usize, size_in_bytes: usize, large_bytes: usize) {
        tracing::debug!(
            zone_id = zone.0,
            requested,
            size_in_bytes,
            large_bytes,
            "zone_expand"
        );
    }

    /// Log the creation of a dedicated large segment.
    pub fn log_large_segment(zone: ZoneId, segment_size: usize) {
        tracing::trace!(zone_id = zone.0, segment_size, "zone_large_segment");
    }

    /// Log a bulk teardown.
    pub fn log_zone_destroy(zone: ZoneId, bytes_released: usize) {
        tracing::trace!(zone_id = zone.0, bytes_released, "zone_destroy");
    }

    /// Create a span covering the entry function of a started thread.
    pub fn trace_thread_run(thread_id: usize) -> span::EnteredSpan {
        span!(Level::DEBUG, "os_thread", thread_id).entered()
    }

    /// Log a thread leaving its entry function.
    pub fn log_thread_exit(thread_id: usize) {
        tracing::debug!(thread_id, "thread_exit");
    }

    /// Log an unrecoverable failure right before the process aborts.
    pub fn log_fatal(primitive: &str, error: &dyn std::fmt::Display) {
        tracing::error!(primitive, %error, "fatal");
    }
}

#[cfg(not(feature = "tracing"))]
#[allow(clippy::missing_const_for_fn)]
pub mod internal {
    use super::ZoneId;

    /// Stub when tracing is disabled.
    #[inline(always)]
    pub fn log_zone_expand(_zone: ZoneId, _requested: usize, _size: usize, _large: usize) {}

    /// Stub when tracing is disabled.
    #[inline(always)]
    pub fn log_large_segment(_zone: ZoneId, _segment_size: usize) {}

    /// Stub when tracing is disabled.
    #[inline(always)]
    pub fn log_zone_destroy(_zone: ZoneId, _bytes_released: usize) {}

    /// Stub guard standing in for an entered span.
    pub struct NoSpan;

    /// Stub when tracing is disabled.
    #[inline(always)]
    pub fn trace_thread_run(_thread_id: usize) -> NoSpan {
        NoSpan
    }

    /// Stub when tracing is disabled.
    #[inline(always)]
    pub fn log_thread_exit(_thread_id: usize) {}

    /// Stub when tracing is disabled.
    #[inline(always)]
    pub fn log_fatal(_primitive: &str, _error: &dyn std::fmt::Display) {}
}
