use std::ffi::c_void;
use std::io::{self, Error};

use windows_sys::Win32::Foundation::FILETIME;
use windows_sys::Win32::System::Threading::{
    FlsAlloc, FlsFree, FlsGetValue, FlsSetValue, GetCurrentThread, GetCurrentThreadId,
    GetThreadTimes, FLS_OUT_OF_INDEXES,
};

/// Fiber-local storage callbacks run at thread exit for non-null values,
/// which is what `TlsAlloc` lacks.
pub type ThreadDestructor = unsafe extern "system" fn(*const c_void);

pub type RawThreadId = u32;
pub type RawKey = u32;

pub const UNSET_KEY: RawKey = FLS_OUT_OF_INDEXES;

#[inline]
pub fn current_thread_id() -> RawThreadId {
    unsafe { GetCurrentThreadId() }
}

#[inline]
pub const fn thread_id_equal(a: RawThreadId, b: RawThreadId) -> bool {
    a == b
}

#[inline]
pub const fn thread_id_to_usize(id: RawThreadId) -> usize {
    id as usize
}

pub fn create_key(destructor: Option<ThreadDestructor>) -> io::Result<RawKey> {
    let key = unsafe { FlsAlloc(destructor) };
    if key == FLS_OUT_OF_INDEXES {
        return Err(Error::last_os_error());
    }
    Ok(key)
}

/// # Safety
///
/// `key` must have been returned by [`create_key`] and not deleted yet.
pub unsafe fn delete_key(key: RawKey) -> io::Result<()> {
    if unsafe { FlsFree(key) } == 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub fn set_specific(key: RawKey, value: usize) -> io::Result<()> {
    if unsafe { FlsSetValue(key, value as *const c_void) } == 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub fn get_specific(key: RawKey) -> usize {
    unsafe { FlsGetValue(key) as usize }
}

const fn filetime_to_100ns(ft: &FILETIME) -> i64 {
    ((ft.dwHighDateTime as i64) << 32) | ft.dwLowDateTime as i64
}

/// Accumulated user + kernel time of the calling thread in microseconds.
pub fn thread_cpu_time_micros() -> i64 {
    let empty = FILETIME {
        dwLowDateTime: 0,
        dwHighDateTime: 0,
    };
    let (mut creation, mut exit, mut kernel, mut user) = (empty, empty, empty, empty);
    let ok = unsafe {
        GetThreadTimes(
            GetCurrentThread(),
            &raw mut creation,
            &raw mut exit,
            &raw mut kernel,
            &raw mut user,
        )
    };
    if ok == 0 {
        return 0;
    }
    // FILETIME counts 100ns intervals.
    (filetime_to_100ns(&kernel) + filetime_to_100ns(&user)) / 10
}
