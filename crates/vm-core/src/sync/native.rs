//! The one native lock / condition variable pair every primitive is built on.
//!
//! `parking_lot` picks the platform mechanism at build time (futex on Linux,
//! `WaitOnAddress` on Windows, a parking lot over pthread primitives
//! elsewhere); nothing above this module branches on the target.
//!
//! The lock is used without RAII guards: acquiring forgets the guard and
//! releasing force-unlocks. Callers uphold the pairing.

use std::mem;
use std::time::Duration;

pub struct NativeLock {
    inner: parking_lot::Mutex<()>,
}

impl NativeLock {
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::const_mutex(()),
        }
    }

    #[inline]
    pub fn lock(&self) {
        mem::forget(self.inner.lock());
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        self.inner.try_lock().map(mem::forget).is_some()
    }

    /// # Safety
    ///
    /// The lock must be held by the current context.
    #[inline]
    pub unsafe fn unlock(&self) {
        unsafe { self.inner.force_unlock() };
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

pub struct NativeCondvar {
    inner: parking_lot::Condvar,
}

impl NativeCondvar {
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::Condvar::new(),
        }
    }

    /// Release `lock`, block until notified or `timeout` elapses, reacquire.
    ///
    /// `None` waits without a deadline. Returns `true` on timeout.
    ///
    /// # Safety
    ///
    /// `lock` must be held by the current context, and every waiter on this
    /// condition variable must use the same lock.
    pub unsafe fn wait(&self, lock: &NativeLock, timeout: Option<Duration>) -> bool {
        // SAFETY: the caller holds the lock; the guard is forgotten again
        // below so ownership goes back to the caller.
        let mut guard = unsafe { lock.inner.make_guard_unchecked() };
        let timed_out = match timeout {
            None => {
                self.inner.wait(&mut guard);
                false
            }
            Some(timeout) => self.inner.wait_for(&mut guard, timeout).timed_out(),
        };
        mem::forget(guard);
        timed_out
    }

    #[inline]
    pub fn notify_one(&self) {
        self.inner.notify_one();
    }

    #[inline]
    pub fn notify_all(&self) {
        self.inner.notify_all();
    }
}
