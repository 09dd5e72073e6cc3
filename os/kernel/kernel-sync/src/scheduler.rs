//! The slice of the process scheduler that blocking locks depend on.

/// Identifies one kernel execution context (a process or kernel thread).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContextId(pub usize);

/// Wait channel: an opaque token that pairs `park` with `unpark_all`.
///
/// Locks use their own address, the same way the classic `sleep(chan)` /
/// `wakeup(chan)` pair does.
pub type Channel = usize;

/// Suspends and resumes execution contexts.
///
/// Implemented by the process scheduler. The memory-management crates never
/// construct one; they receive it from whoever builds the subsystem.
pub trait Scheduler: Sync {
    /// The execution context that is currently running on this CPU.
    fn current(&self) -> ContextId;

    /// Suspend the current context until [`unpark_all`](Self::unpark_all)
    /// is called for `channel`.
    ///
    /// `release` must be invoked exactly once, after the context is
    /// registered as waiting and before it gives up the CPU; it drops the
    /// spin lock that protects the condition the caller is waiting for.
    /// Returning early (a spurious wakeup) is allowed.
    fn park(&self, channel: Channel, release: &mut dyn FnMut());

    /// Make every context parked on `channel` runnable again.
    fn unpark_all(&self, channel: Channel);
}

#[cfg(any(test, feature = "std"))]
mod std_scheduler {
    use super::{Channel, ContextId, Scheduler};
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

    std::thread_local! {
        static ID: Cell<usize> = const { Cell::new(0) };
    }

    /// Host stand-in for the process scheduler: every OS thread is one
    /// execution context, and parking yields the thread.
    #[derive(Copy, Clone, Debug, Default)]
    pub struct StdScheduler;

    impl Scheduler for StdScheduler {
        fn current(&self) -> ContextId {
            ID.with(|id| {
                if id.get() == 0 {
                    id.set(NEXT_ID.fetch_add(1, Ordering::Relaxed));
                }
                ContextId(id.get())
            })
        }

        fn park(&self, _channel: Channel, release: &mut dyn FnMut()) {
            release();
            std::thread::yield_now();
        }

        fn unpark_all(&self, _channel: Channel) {}
    }
}

#[cfg(any(test, feature = "std"))]
pub use std_scheduler::StdScheduler;
