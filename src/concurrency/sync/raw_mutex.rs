//! Futex-backed mutex with bounded waiting.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;

use super::{wait_on_u32, wait_on_u32_timeout, wake_one_u32};

/// A blocking mutex that protects no data of its own.
///
/// Callers pair it with the state it serializes. Uncontended lock and unlock
/// are a single atomic RMW each; contended waiters spin briefly and then park
/// on the state word.
///
/// # States
/// - 0: Unlocked
/// - 1: Locked, no waiters (likely)
/// - 2: Locked, waiters may be parked (contended)
pub struct RawMutex {
    state: AtomicU32,
}

impl RawMutex {
    const UNLOCKED: u32 = 0;
    const LOCKED: u32 = 1;
    const CONTENDED: u32 = 2;

    /// Creates an unlocked mutex.
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(Self::UNLOCKED),
        }
    }

    #[inline]
    fn try_lock_fast(&self) -> bool {
        self.state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Acquires the mutex, blocking the current thread until it is free.
    #[inline]
    pub fn lock(&self) -> RawMutexGuard<'_> {
        if !self.try_lock_fast() {
            self.lock_contended(None);
        }
        RawMutexGuard { mutex: self }
    }

    /// Acquires the mutex only if it is free right now.
    #[inline]
    pub fn try_lock(&self) -> Option<RawMutexGuard<'_>> {
        self.try_lock_fast().then(|| RawMutexGuard { mutex: self })
    }

    /// Acquires the mutex, waiting at most `timeout`.
    ///
    /// Returns `None` if the mutex is still held when the bound elapses.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<RawMutexGuard<'_>> {
        if self.try_lock_fast() {
            return Some(RawMutexGuard { mutex: self });
        }
        // A bound too large to represent is an unbounded wait.
        let deadline = Instant::now().checked_add(timeout);
        self.lock_contended(deadline)
            .then(|| RawMutexGuard { mutex: self })
    }

    #[cold]
    fn lock_contended(&self, deadline: Option<Instant>) -> bool {
        let expired = || deadline.is_some_and(|d| Instant::now() >= d);

        // Spin while the holder is likely to release soon.
        let backoff = Backoff::new();
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state == Self::UNLOCKED {
                if self.try_lock_fast() {
                    return true;
                }
                continue;
            }
            if state == Self::CONTENDED || backoff.is_completed() || expired() {
                break;
            }
            backoff.snooze();
        }

        // Park. Taking the lock through the swap leaves it marked contended,
        // which costs at most one spurious wake on release.
        loop {
            if self.state.swap(Self::CONTENDED, Ordering::Acquire) == Self::UNLOCKED {
                return true;
            }
            match deadline {
                None => wait_on_u32(&self.state, Self::CONTENDED),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    wait_on_u32_timeout(&self.state, Self::CONTENDED, deadline - now);
                }
            }
        }
    }

    /// Releases the mutex.
    ///
    /// # Safety
    /// The mutex must be locked, and the guard that locked it must have been
    /// given up through [`RawMutexGuard::leak`].
    pub unsafe fn force_unlock(&self) {
        if self.state.swap(Self::UNLOCKED, Ordering::Release) == Self::CONTENDED {
            wake_one_u32(&self.state);
        }
    }

    /// Returns `true` if some thread currently holds the mutex.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != Self::UNLOCKED
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// RAII handle for a locked [`RawMutex`]; unlocks on drop.
#[must_use = "the mutex unlocks as soon as the guard is dropped"]
pub struct RawMutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl RawMutexGuard<'_> {
    /// Keeps the mutex locked past the guard's lifetime.
    ///
    /// The owner becomes responsible for calling [`RawMutex::force_unlock`].
    #[inline]
    pub fn leak(self) {
        core::mem::forget(self);
    }
}

impl Drop for RawMutexGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard proves the mutex is locked and it was not leaked.
        unsafe { self.mutex.force_unlock() };
    }
}
