//! Per-platform thread primitives.
//!
//! Everything here is a thin, allocation-free wrapper over the native API of
//! the target (`pthread` on Unix, FLS and `GetThreadTimes` on Windows). The
//! platform module is selected at build time; callers only ever see the
//! types below.

use std::io;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as os;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as os;

pub use os::ThreadDestructor;

/// Identity of an OS thread.
///
/// The value may be recycled by the platform once the thread has exited.
#[derive(Debug, Clone, Copy)]
pub struct ThreadId {
    raw: os::RawThreadId,
}

impl ThreadId {
    /// Returns the identity of the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self {
            raw: os::current_thread_id(),
        }
    }

    /// Converts the identity to a pointer-width integer.
    #[must_use]
    pub fn as_usize(self) -> usize {
        os::thread_id_to_usize(self.raw)
    }
}

impl PartialEq for ThreadId {
    fn eq(&self, other: &Self) -> bool {
        os::thread_id_equal(self.raw, other.raw)
    }
}

impl Eq for ThreadId {}

unsafe impl Send for ThreadId {}
unsafe impl Sync for ThreadId {}

/// A native thread-local storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadLocalKey {
    raw: os::RawKey,
}

impl ThreadLocalKey {
    /// Sentinel for a key that was never created.
    pub const UNSET: Self = Self { raw: os::UNSET_KEY };

    /// Allocates a new key.
    ///
    /// `destructor` is invoked by the platform when a thread holding a
    /// non-null value for this key exits.
    pub fn create(destructor: Option<ThreadDestructor>) -> io::Result<Self> {
        os::create_key(destructor).map(|raw| Self { raw })
    }

    /// Releases the key. Destructors are not run for values still stored.
    ///
    /// # Safety
    ///
    /// The key must be live and must not be used again afterwards.
    pub unsafe fn delete(self) -> io::Result<()> {
        unsafe { os::delete_key(self.raw) }
    }

    /// Stores `value` for the calling thread.
    pub fn set(self, value: usize) -> io::Result<()> {
        os::set_specific(self.raw, value)
    }

    /// Reads the calling thread's value, `0` if none was stored.
    #[must_use]
    pub fn get(self) -> usize {
        os::get_specific(self.raw)
    }

    /// Returns `true` unless this is [`ThreadLocalKey::UNSET`].
    #[must_use]
    pub fn is_set(self) -> bool {
        self.raw != os::UNSET_KEY
    }
}

/// CPU time consumed by the calling thread, in microseconds.
///
/// Returns `0` on targets where per-thread accounting is unavailable.
#[must_use]
pub fn thread_cpu_time_micros() -> i64 {
    os::thread_cpu_time_micros()
}
