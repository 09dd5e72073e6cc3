use crate::{Channel, ContextId, Scheduler, SpinLock};
use core::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
};

/// Long-term lock for data that may be held across blocking operations.
///
/// Contenders are parked through the [`Scheduler`] instead of spinning. The
/// lock records the holding [`ContextId`], which lets code that must only run
/// under the lock verify that with [`holding`](Self::holding).
pub struct SleepLock<T> {
    state: SpinLock<SleepState>,
    inner: UnsafeCell<T>,
}

#[derive(Default)]
struct SleepState {
    locked: bool,
    holder: Option<ContextId>,
}

// Safety: the inner value is only reachable through a guard, and at most one
// guard exists at a time.
unsafe impl<T: Send> Sync for SleepLock<T> {}

impl<T> SleepLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            state: SpinLock::new(SleepState {
                locked: false,
                holder: None,
            }),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Acquire the lock, parking the current context while somebody else holds it.
    pub fn lock<'a>(&'a self, scheduler: &'a dyn Scheduler) -> SleepLockGuard<'a, T> {
        let mut state = self.state.lock();
        while state.locked {
            state = state.sleep(scheduler, self.channel());
        }
        state.locked = true;
        state.holder = Some(scheduler.current());
        SleepLockGuard {
            lock: self,
            scheduler,
        }
    }

    /// Whether the lock is held by the context `scheduler` reports as current.
    pub fn holding(&self, scheduler: &dyn Scheduler) -> bool {
        let state = self.state.lock();
        state.locked && state.holder == Some(scheduler.current())
    }

    /// Whether any context holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    fn channel(&self) -> Channel {
        core::ptr::from_ref(self).addr()
    }

    fn unlock(&self, scheduler: &dyn Scheduler) {
        let mut state = self.state.lock();
        state.locked = false;
        state.holder = None;
        scheduler.unpark_all(self.channel());
    }
}

pub struct SleepLockGuard<'a, T> {
    lock: &'a SleepLock<T>,
    scheduler: &'a dyn Scheduler,
}

impl<T> SleepLockGuard<'_, T> {
    /// Whether the guard is held by the current context.
    ///
    /// A guard moved to another execution context still owns the lock, but
    /// that context is not the recorded holder.
    pub fn held_by_current(&self) -> bool {
        self.lock.holding(self.scheduler)
    }
}

impl<T> Deref for SleepLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock(self.scheduler);
    }
}
