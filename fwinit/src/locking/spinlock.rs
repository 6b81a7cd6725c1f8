// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU64, Ordering};

/// A lock guard obtained from a [`SpinLock`]. The lock is released when
/// the guard goes out of scope.
#[derive(Debug)]
#[must_use = "if unused the SpinLock will immediately unlock"]
pub struct LockGuard<'a, T> {
    holder: &'a AtomicU64,
    data: &'a mut T,
}

impl<T> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        self.holder.fetch_add(1, Ordering::Release);
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

/// A ticket spinlock. Used to serialize multi-step hardware access
/// sequences such as the CF8/CFC address/data cycle.
///
/// # Examples
///
/// ```
/// use fwinit::locking::SpinLock;
///
/// let spin_lock = SpinLock::new(42);
///
/// {
///     let mut guard = spin_lock.lock();
///     *guard += 1;
/// };
///
/// if let Some(mut guard) = spin_lock.try_lock() {
///     *guard += 2;
/// };
/// assert_eq!(*spin_lock.lock(), 45);
/// ```
#[derive(Debug, Default)]
pub struct SpinLock<T> {
    /// Next ticket to hand out.
    current: AtomicU64,
    /// Ticket currently allowed to hold the lock.
    holder: AtomicU64,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by the ticket counters.
unsafe impl<T: Send> Send for SpinLock<T> {}
// SAFETY: access to `data` is serialized by the ticket counters.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            current: AtomicU64::new(0),
            holder: AtomicU64::new(0),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> LockGuard<'_, T> {
        let ticket = self.current.fetch_add(1, Ordering::Relaxed);
        loop {
            let h = self.holder.load(Ordering::Acquire);
            if h == ticket {
                break;
            }
            core::hint::spin_loop();
        }
        LockGuard {
            holder: &self.holder,
            // SAFETY: the ticket protocol grants exclusive access.
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// Execute function F while holding the lock.
    pub fn locked_do<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut l = self.lock();
        f(&mut (*l))
    }

    /// Tries to acquire the lock without blocking.
    pub fn try_lock(&self) -> Option<LockGuard<'_, T>> {
        let current = self.current.load(Ordering::Relaxed);
        let holder = self.holder.load(Ordering::Acquire);

        if current == holder
            && self
                .current
                .compare_exchange(current, current + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            return Some(LockGuard {
                holder: &self.holder,
                // SAFETY: the ticket protocol grants exclusive access.
                data: unsafe { &mut *self.data.get() },
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_lock() {
        let spin_lock = SpinLock::new(0);

        let mut guard = spin_lock.lock();
        *guard += 1;

        assert_eq!(*guard, 1);

        // Try to lock again; it should fail and return None.
        assert!(spin_lock.try_lock().is_none());
        drop(guard);

        assert_eq!(spin_lock.locked_do(|v| *v + 1), 2);
        assert!(spin_lock.try_lock().is_some());
    }
}
