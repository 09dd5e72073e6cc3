//! # Kernel synchronization primitives
//!
//! Two lock classes with distinct roles:
//!
//! * [`SpinLock`] guards short metadata critical sections (reference counts,
//!   free lists, cache buckets). It is never held across I/O.
//! * [`SleepLock`] guards data that may be held across a blocking operation
//!   such as a disk transfer. A waiter hands the CPU back to the scheduler
//!   instead of spinning, and the lock remembers which execution context
//!   holds it so callers can assert ownership.
//!
//! Suspending and resuming an execution context belongs to the process
//! scheduler, which is modelled by the [`Scheduler`] trait. The `std` feature
//! provides [`StdScheduler`], which maps contexts onto host threads.

#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![allow(unsafe_code)]

mod scheduler;
mod sleep_lock;
mod spin_lock;

pub use scheduler::{Channel, ContextId, Scheduler};
#[cfg(any(test, feature = "std"))]
pub use scheduler::StdScheduler;
pub use sleep_lock::{SleepLock, SleepLockGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
