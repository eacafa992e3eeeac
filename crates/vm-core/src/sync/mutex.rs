use std::marker::PhantomData;

use super::native::NativeLock;
#[cfg(debug_assertions)]
use super::owner::Owner;

/// A non-reentrant mutual-exclusion lock.
///
/// Unlike `std::sync::Mutex` it guards no data: runtime code pairs it with
/// state it protects by convention. Prefer [`Mutex::locker`], which releases
/// on scope exit; the raw [`lock`](Mutex::lock)/[`unlock`](Mutex::unlock)
/// pair exists for hand-over-hand patterns.
///
/// Debug builds track the holding thread. Locking a mutex the calling thread
/// already holds panics instead of deadlocking, and releasing from any other
/// thread panics.
pub struct Mutex {
    lock: NativeLock,
    #[cfg(debug_assertions)]
    owner: Owner,
}

impl Mutex {
    /// An unlocked mutex.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock: NativeLock::new(),
            #[cfg(debug_assertions)]
            owner: Owner::new(),
        }
    }

    /// Block until the lock is acquired.
    pub fn lock(&self) {
        #[cfg(debug_assertions)]
        self.owner.check_not_reentered("Mutex::lock");
        self.lock.lock();
        #[cfg(debug_assertions)]
        self.owner.acquire();
    }

    /// Acquire the lock if it is free. Never blocks.
    ///
    /// Returns `false` when the lock is held, including by the calling
    /// thread.
    #[must_use]
    pub fn try_lock(&self) -> bool {
        #[cfg(debug_assertions)]
        if self.owner.is_current() {
            return false;
        }
        if !self.lock.try_lock() {
            return false;
        }
        #[cfg(debug_assertions)]
        self.owner.acquire();
        true
    }

    /// Release the lock.
    ///
    /// # Safety
    ///
    /// The calling thread must hold the lock. Debug builds check this and
    /// panic; release builds do not.
    pub unsafe fn unlock(&self) {
        #[cfg(debug_assertions)]
        self.owner.release("Mutex::unlock");
        // SAFETY: forwarded from the caller.
        unsafe { self.lock.unlock() };
    }

    /// Acquire the lock for the lifetime of the returned guard.
    pub fn locker(&self) -> MutexLocker<'_> {
        MutexLocker::new(self)
    }

    /// Returns `true` if the calling thread holds the lock.
    #[cfg(debug_assertions)]
    #[must_use]
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner.is_current()
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug_assert!(
            std::thread::panicking() || self.owner.is_none(),
            "Mutex dropped while held"
        );
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &self.lock.is_locked())
            .finish()
    }
}

/// Holds a [`Mutex`] until dropped.
///
/// Not `Send`: the lock must be released by the thread that took it.
pub struct MutexLocker<'a> {
    mutex: &'a Mutex,
    _marker: PhantomData<*mut ()>,
}

impl<'a> MutexLocker<'a> {
    /// Lock `mutex`, blocking until it is free.
    pub fn new(mutex: &'a Mutex) -> Self {
        mutex.lock();
        Self {
            mutex,
            _marker: PhantomData,
        }
    }
}

impl Drop for MutexLocker<'_> {
    fn drop(&mut self) {
        // SAFETY: acquired in `new` on this thread.
        unsafe { self.mutex.unlock() };
    }
}
