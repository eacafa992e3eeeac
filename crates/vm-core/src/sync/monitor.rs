use std::marker::PhantomData;
use std::time::Duration;

use super::native::{NativeCondvar, NativeLock};
#[cfg(debug_assertions)]
use super::owner::Owner;

/// Timeout value meaning "wait until notified".
pub const NO_TIMEOUT: i64 = 0;

const MICROS_PER_MILLI: i64 = 1_000;
const MICROS_PER_SECOND: i64 = 1_000_000;
const NANOS_PER_MICRO: i64 = 1_000;

/// Outcome of [`Monitor::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// Woken by `notify`/`notify_all`, or spuriously.
    Notified,
    /// The timeout elapsed first.
    TimedOut,
}

/// Convert a microsecond timeout into a deadline-relative duration.
///
/// Seconds are clamped to `i32::MAX` so huge timeouts are not truncated;
/// negative values time out immediately.
fn timeout_from_micros(micros: i64) -> Option<Duration> {
    if micros == NO_TIMEOUT {
        return None;
    }
    let micros = micros.max(0);
    let secs = (micros / MICROS_PER_SECOND).min(i64::from(i32::MAX));
    let nanos = (micros % MICROS_PER_SECOND) * NANOS_PER_MICRO;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    Some(Duration::new(secs as u64, nanos as u32))
}

/// A lock combined with a condition variable.
///
/// Waiters must re-check their predicate after every return from `wait`:
/// wakeups can be spurious and notifications are not queued.
///
/// Debug builds track the holder the same way [`Mutex`](super::Mutex) does.
pub struct Monitor {
    lock: NativeLock,
    cond: NativeCondvar,
    #[cfg(debug_assertions)]
    owner: Owner,
}

impl Monitor {
    /// An unowned monitor with no waiters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock: NativeLock::new(),
            cond: NativeCondvar::new(),
            #[cfg(debug_assertions)]
            owner: Owner::new(),
        }
    }

    /// Acquire the monitor's lock.
    pub fn enter(&self) {
        #[cfg(debug_assertions)]
        self.owner.check_not_reentered("Monitor::enter");
        self.lock.lock();
        #[cfg(debug_assertions)]
        self.owner.acquire();
    }

    /// Release the monitor's lock.
    ///
    /// # Safety
    ///
    /// The calling thread must have entered the monitor.
    pub unsafe fn exit(&self) {
        #[cfg(debug_assertions)]
        self.owner.release("Monitor::exit");
        // SAFETY: forwarded from the caller.
        unsafe { self.lock.unlock() };
    }

    /// Wait for a notification or for `millis` milliseconds.
    ///
    /// # Safety
    ///
    /// The calling thread must have entered the monitor.
    pub unsafe fn wait(&self, millis: i64) -> WaitResult {
        unsafe { self.wait_micros(millis.saturating_mul(MICROS_PER_MILLI)) }
    }

    /// Wait for a notification or for `micros` microseconds.
    ///
    /// Releases the lock while blocked and holds it again on return.
    /// [`NO_TIMEOUT`] waits indefinitely.
    ///
    /// # Safety
    ///
    /// The calling thread must have entered the monitor.
    pub unsafe fn wait_micros(&self, micros: i64) -> WaitResult {
        #[cfg(debug_assertions)]
        self.owner.release("Monitor::wait");

        // SAFETY: the caller holds `self.lock`, the only lock used with `cond`.
        let timed_out = unsafe { self.cond.wait(&self.lock, timeout_from_micros(micros)) };

        #[cfg(debug_assertions)]
        self.owner.acquire();

        if timed_out {
            WaitResult::TimedOut
        } else {
            WaitResult::Notified
        }
    }

    /// Wake at most one waiter. Has no effect if nobody is waiting.
    pub fn notify(&self) {
        self.cond.notify_one();
    }

    /// Wake every thread currently waiting.
    pub fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Enter the monitor for the lifetime of the returned guard.
    pub fn locker(&self) -> MonitorLocker<'_> {
        MonitorLocker::new(self)
    }

    /// Returns `true` if the calling thread is inside the monitor.
    #[cfg(debug_assertions)]
    #[must_use]
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner.is_current()
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug_assert!(
            std::thread::panicking() || self.owner.is_none(),
            "Monitor dropped while entered"
        );
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("locked", &self.lock.is_locked())
            .finish()
    }
}

/// Holds a [`Monitor`] entered until dropped.
pub struct MonitorLocker<'a> {
    monitor: &'a Monitor,
    _marker: PhantomData<*mut ()>,
}

impl<'a> MonitorLocker<'a> {
    /// Enter `monitor`, blocking until it is free.
    pub fn new(monitor: &'a Monitor) -> Self {
        monitor.enter();
        Self {
            monitor,
            _marker: PhantomData,
        }
    }

    /// See [`Monitor::wait`].
    pub fn wait(&self, millis: i64) -> WaitResult {
        // SAFETY: the monitor was entered in `new`.
        unsafe { self.monitor.wait(millis) }
    }

    /// See [`Monitor::wait_micros`].
    pub fn wait_micros(&self, micros: i64) -> WaitResult {
        // SAFETY: the monitor was entered in `new`.
        unsafe { self.monitor.wait_micros(micros) }
    }

    /// See [`Monitor::notify`].
    pub fn notify(&self) {
        self.monitor.notify();
    }

    /// See [`Monitor::notify_all`].
    pub fn notify_all(&self) {
        self.monitor.notify_all();
    }
}

impl Drop for MonitorLocker<'_> {
    fn drop(&mut self) {
        // SAFETY: entered in `new` on this thread.
        unsafe { self.monitor.exit() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        assert_eq!(timeout_from_micros(NO_TIMEOUT), None);
        assert_eq!(
            timeout_from_micros(1_500_250),
            Some(Duration::new(1, 250_000))
        );
        assert_eq!(timeout_from_micros(-5), Some(Duration::ZERO));
        assert_eq!(
            timeout_from_micros(i64::MAX),
            Some(Duration::new(i32::MAX as u64, 775_807_000))
        );
    }

    #[test]
    fn test_wait_without_notify_times_out() {
        let monitor = Monitor::new();
        let ml = monitor.locker();
        assert_eq!(ml.wait_micros(1_000), WaitResult::TimedOut);
    }

    #[test]
    fn test_notify_without_waiters_is_not_queued() {
        let monitor = Monitor::new();
        monitor.notify();
        monitor.notify_all();
        let ml = monitor.locker();
        assert_eq!(ml.wait(1), WaitResult::TimedOut);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_owner_restored_after_wait() {
        let monitor = Monitor::new();
        let ml = monitor.locker();
        ml.wait_micros(100);
        assert!(monitor.is_owned_by_current_thread());
        drop(ml);
        assert!(!monitor.is_owned_by_current_thread());
    }
}
