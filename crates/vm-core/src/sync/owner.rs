//! Debug-build lock owner tracking.
//!
//! Compiled in only with `debug_assertions`; release builds carry no owner
//! field at all.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::os_thread::{self, INVALID_THREAD_ID};

/// Integer identity of the thread holding a lock, or `INVALID_THREAD_ID`.
///
/// Only the holder writes a non-invalid value, so a thread reading its own
/// id back knows it holds the lock.
pub struct Owner(AtomicUsize);

impl Owner {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(INVALID_THREAD_ID))
    }

    fn current() -> usize {
        os_thread::thread_id_to_integer(os_thread::current_thread_id())
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        self.0.load(Ordering::Relaxed) == Self::current()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.load(Ordering::Relaxed) == INVALID_THREAD_ID
    }

    #[inline]
    pub fn acquire(&self) {
        self.0.store(Self::current(), Ordering::Relaxed);
    }

    /// Clear the owner, panicking if the caller is not the holder.
    #[inline]
    pub fn release(&self, primitive: &str) {
        assert!(
            self.is_current(),
            "{primitive}: lock not held by the current thread"
        );
        self.0.store(INVALID_THREAD_ID, Ordering::Relaxed);
    }

    /// Panic if the caller already holds the lock it is about to block on.
    #[inline]
    pub fn check_not_reentered(&self, primitive: &str) {
        assert!(
            !self.is_current(),
            "{primitive}: deadlock, lock already held by the current thread"
        );
    }
}
