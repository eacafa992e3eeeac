//! Process-terminating diagnostics.
//!
//! A failing native primitive leaves the runtime in an unknown state, so
//! these paths never unwind: they report and abort.

use std::fmt::Display;
use std::io::{self, Write};

/// Report `error` as the failure of `primitive` and abort the process.
#[cold]
#[inline(never)]
pub fn fatal(primitive: &str, error: &dyn Display) -> ! {
    crate::tracing::internal::log_fatal(primitive, error);
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "fatal: {primitive} failed: {error}");
    let _ = stderr.flush();
    std::process::abort()
}

/// Unwrap a native call result, aborting with a diagnostic on failure.
pub trait OrFatal<T> {
    /// Returns the value or terminates the process naming `primitive`.
    fn or_fatal(self, primitive: &str) -> T;
}

impl<T> OrFatal<T> for io::Result<T> {
    #[inline]
    fn or_fatal(self, primitive: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => fatal(primitive, &err),
        }
    }
}
