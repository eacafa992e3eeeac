//! OS thread services: detached thread start, native thread-local storage,
//! thread identity and per-thread CPU time.
//!
//! Started threads are fire-and-forget. They go from starting to running to
//! exited with no pause, no forced termination and no join; work that needs
//! to report completion does so itself, typically through a
//! [`Monitor`](crate::Monitor). A thread id may be recycled once its thread
//! has exited and must not be kept past that point.

use std::io;
use std::mem;
use std::thread;

use crate::fatal::OrFatal;
use crate::tracing::internal;

pub use sys_thread::{ThreadDestructor, ThreadId, ThreadLocalKey};

/// Entry point of a thread started with [`start`].
pub type ThreadStartFunction = fn(usize);

/// Stack size of every started thread.
pub const MAX_STACK_SIZE: usize = 128 * mem::size_of::<usize>() * 1024;

/// Integer form of "no thread". Never returned by [`thread_id_to_integer`]
/// for a live thread.
pub const INVALID_THREAD_ID: usize = 0;

/// Sentinel for a thread-local key that was never created.
pub const UNSET_THREAD_LOCAL_KEY: ThreadLocalKey = ThreadLocalKey::UNSET;

/// Start a detached thread running `entry(argument)`.
///
/// Returns the platform error if the thread could not be created; nothing
/// is leaked in that case.
pub fn start(entry: ThreadStartFunction, argument: usize) -> io::Result<()> {
    spawn(move || entry(argument))
}

/// Start a detached thread running `body`.
///
/// `body` is the thread's start record: it is moved onto the new thread and
/// consumed there exactly once.
pub fn spawn<F>(body: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    let handle = thread::Builder::new()
        .stack_size(MAX_STACK_SIZE)
        .spawn(move || {
            let id = thread_id_to_integer(current_thread_id());
            let span = internal::trace_thread_run(id);
            body();
            drop(span);
            internal::log_thread_exit(id);
        })?;
    // Dropping the handle detaches the thread.
    drop(handle);
    Ok(())
}

/// Joining is not supported; always returns `false`.
#[must_use]
pub const fn join(_id: ThreadId) -> bool {
    false
}

/// Stack size every started thread gets.
#[must_use]
pub const fn get_max_stack_size() -> usize {
    MAX_STACK_SIZE
}

/// Identity of the calling thread.
#[inline]
#[must_use]
pub fn current_thread_id() -> ThreadId {
    ThreadId::current()
}

/// Returns `true` if `a` and `b` name the same thread.
#[inline]
#[must_use]
pub fn compare(a: ThreadId, b: ThreadId) -> bool {
    a == b
}

/// Integer form of `id`, never [`INVALID_THREAD_ID`] for a live thread.
#[inline]
#[must_use]
pub fn thread_id_to_integer(id: ThreadId) -> usize {
    id.as_usize()
}

/// Allocate a native thread-local key.
///
/// `destructor` runs at thread exit for every thread still holding a
/// non-null value. Key exhaustion terminates the process.
#[must_use]
pub fn create_thread_local(destructor: Option<ThreadDestructor>) -> ThreadLocalKey {
    let key = ThreadLocalKey::create(destructor).or_fatal("OSThread::create_thread_local");
    debug_assert!(key.is_set());
    key
}

/// Release a key created by [`create_thread_local`].
///
/// # Safety
///
/// `key` must be live and must not be used again.
pub unsafe fn delete_thread_local(key: ThreadLocalKey) {
    assert!(key.is_set(), "OSThread::delete_thread_local: unset key");
    unsafe { key.delete() }.or_fatal("OSThread::delete_thread_local");
}

/// Store `value` in the calling thread's slot for `key`.
pub fn set_thread_local(key: ThreadLocalKey, value: usize) {
    assert!(key.is_set(), "OSThread::set_thread_local: unset key");
    key.set(value).or_fatal("OSThread::set_thread_local");
}

/// Read the calling thread's slot for `key`; `0` if never set.
#[must_use]
pub fn get_thread_local(key: ThreadLocalKey) -> usize {
    assert!(key.is_set(), "OSThread::get_thread_local: unset key");
    key.get()
}

/// CPU time consumed by `thread_id`, in microseconds.
///
/// Only a thread's own usage can be queried, so `thread_id` must be the
/// caller. Returns `0` where the platform does not report it.
#[must_use]
pub fn get_cpu_usage(thread_id: ThreadId) -> i64 {
    debug_assert!(
        thread_id == current_thread_id(),
        "OSThread::get_cpu_usage: only the current thread can be queried"
    );
    sys_thread::thread_cpu_time_micros()
}
