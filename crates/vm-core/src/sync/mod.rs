//! Locks and monitors for state shared between runtime threads.
//!
//! Both primitives sit on one native lock/condvar layer (`native`). Owner
//! tracking is a debug-only layer on top (`owner`): it turns self-deadlock
//! and wrong-thread release into panics naming the primitive, and compiles
//! away in release builds.

mod monitor;
mod mutex;
mod native;
#[cfg(debug_assertions)]
mod owner;

pub use monitor::{Monitor, MonitorLocker, WaitResult, NO_TIMEOUT};
pub use mutex::{Mutex, MutexLocker};
