use std::io::{self, Error};

/// Destructor invoked by pthreads for a non-null thread-local value at thread exit.
pub type ThreadDestructor = unsafe extern "C" fn(*mut libc::c_void);

pub type RawThreadId = libc::pthread_t;
pub type RawKey = libc::pthread_key_t;

pub const UNSET_KEY: RawKey = RawKey::MAX;

#[inline]
fn check(result: libc::c_int) -> io::Result<()> {
    if result == 0 {
        Ok(())
    } else {
        Err(Error::from_raw_os_error(result))
    }
}

#[inline]
pub fn current_thread_id() -> RawThreadId {
    unsafe { libc::pthread_self() }
}

#[inline]
pub fn thread_id_equal(a: RawThreadId, b: RawThreadId) -> bool {
    unsafe { libc::pthread_equal(a, b) != 0 }
}

/// `pthread_t` is an integer on Linux and a pointer on Apple platforms.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::unnecessary_cast)]
pub fn thread_id_to_usize(id: RawThreadId) -> usize {
    id as usize
}

pub fn create_key(destructor: Option<ThreadDestructor>) -> io::Result<RawKey> {
    let mut key: RawKey = UNSET_KEY;
    check(unsafe { libc::pthread_key_create(&raw mut key, destructor) })?;
    Ok(key)
}

/// # Safety
///
/// `key` must have been returned by [`create_key`] and not deleted yet.
pub unsafe fn delete_key(key: RawKey) -> io::Result<()> {
    check(unsafe { libc::pthread_key_delete(key) })
}

pub fn set_specific(key: RawKey, value: usize) -> io::Result<()> {
    check(unsafe { libc::pthread_setspecific(key, value as *const libc::c_void) })
}

pub fn get_specific(key: RawKey) -> usize {
    unsafe { libc::pthread_getspecific(key) as usize }
}

/// Accumulated CPU time of the calling thread in microseconds.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn thread_cpu_time_micros() -> i64 {
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &raw mut ts) };
    if result != 0 {
        return 0;
    }
    #[allow(clippy::unnecessary_cast)]
    let nanos = (ts.tv_sec as i64) * 1_000_000_000 + (ts.tv_nsec as i64);
    nanos / 1_000
}

/// Thread CPU accounting is disabled on the remaining Unix targets.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const fn thread_cpu_time_micros() -> i64 {
    0
}
