//! Runtime substrate for a managed-language virtual machine.
//!
//! `vm-core` provides the pieces the rest of a VM stands on:
//!
//! - **Zones** ([`Zone`]): single-threaded bump-pointer arenas for transient,
//!   scope-bounded allocations. They grow by segments, give oversized requests
//!   their own segment, free everything at once, and report the GC roots
//!   allocated from them through [`ObjectPointerVisitor`].
//! - **Locks** ([`Mutex`], [`Monitor`]): non-reentrant mutual exclusion and
//!   wait/notify with timeouts, with owner tracking in debug builds.
//! - **Threads** ([`os_thread`]): detached thread start with a fixed stack
//!   size, native thread-local keys with exit destructors, thread identity
//!   and per-thread CPU time.
//!
//! # Quick Start
//!
//! ```
//! use vm_core::{zone_format, Zone};
//!
//! let outer = Zone::new();
//! let name = outer.copy_string("main");
//! {
//!     let inner = Zone::nested(&outer);
//!     let msg = zone_format!(inner, "hello from {name}");
//!     assert_eq!(msg, "hello from main");
//! } // `inner` releases its memory here
//! assert!(outer.size_in_bytes() >= name.len() + 1);
//! ```
//!
//! # Fatal errors
//!
//! Misuse (wrong-thread unlock, self-deadlock, over-aligned types, size
//! overflow) panics. Failure of a native primitive, such as running out of
//! thread-local keys, aborts the process after printing which primitive
//! failed and why.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fatal;
pub mod os_thread;
pub mod sync;
pub mod tracing;
pub mod visitor;
pub mod zone;

pub use config::ZoneConfig;
pub use os_thread::{ThreadId, ThreadLocalKey};
pub use sync::{Monitor, MonitorLocker, Mutex, MutexLocker, WaitResult, NO_TIMEOUT};
pub use crate::tracing::ZoneId;
pub use visitor::{ObjectPointerVisitor, ObjectPtr, RootSlot};
pub use zone::{Zone, ZoneHandle, ALIGNMENT};
