//! Reentrant lock: an owner id and a nesting depth over [`RawMutex`].

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::raw_mutex::RawMutex;
use super::thread_id::current_thread_id;

/// A reentrant lock keyed by the calling thread's id.
///
/// The owning thread may lock again without blocking; each `lock` bumps a
/// depth counter and the underlying [`RawMutex`] is only released when the
/// matching number of `unlock` calls brings the depth back to zero.
pub struct RawReentrantLock {
    mutex: RawMutex,
    /// 0 when unowned, otherwise the owner's [`current_thread_id`].
    owner: AtomicUsize,
    /// Only read or written by the owner.
    depth: UnsafeCell<usize>,
}

// SAFETY: `depth` is only accessed by the thread recorded in `owner`, which
// holds `mutex`; everything else is atomic.
unsafe impl Sync for RawReentrantLock {}

impl RawReentrantLock {
    /// Creates an unowned lock.
    pub const fn new() -> Self {
        Self {
            mutex: RawMutex::new(),
            owner: AtomicUsize::new(0),
            depth: UnsafeCell::new(0),
        }
    }

    // Relaxed is enough: only the current thread ever stores its own id, so
    // reading it back means we stored it and still hold the mutex.
    #[inline]
    fn owned_by(&self, me: usize) -> bool {
        self.owner.load(Ordering::Relaxed) == me
    }

    /// Acquires the lock, blocking unless this thread already holds it.
    pub fn lock(&self) {
        let me = current_thread_id().get();
        if self.owned_by(me) {
            // SAFETY: we are the owner.
            unsafe { self.increment_depth() };
        } else {
            self.mutex.lock().leak();
            // SAFETY: we just took the mutex.
            unsafe { self.take_ownership(me) };
        }
    }

    /// Acquires the lock if it is free or already held by this thread.
    pub fn try_lock(&self) -> bool {
        self.try_lock_with(|mutex| mutex.try_lock())
    }

    /// Acquires the lock, waiting at most `timeout` for another owner to
    /// release it. A reentrant acquisition never waits.
    pub fn try_lock_for(&self, timeout: Duration) -> bool {
        self.try_lock_with(|mutex| mutex.try_lock_for(timeout))
    }

    fn try_lock_with<'a>(
        &'a self,
        acquire: impl FnOnce(&'a RawMutex) -> Option<super::RawMutexGuard<'a>>,
    ) -> bool {
        let me = current_thread_id().get();
        if self.owned_by(me) {
            // SAFETY: we are the owner.
            unsafe { self.increment_depth() };
            return true;
        }
        match acquire(&self.mutex) {
            Some(guard) => {
                guard.leak();
                // SAFETY: we just took the mutex.
                unsafe { self.take_ownership(me) };
                true
            }
            None => false,
        }
    }

    /// # Safety
    /// The caller must have just acquired `mutex`.
    #[inline]
    unsafe fn take_ownership(&self, me: usize) {
        self.owner.store(me, Ordering::Relaxed);
        // SAFETY: mutex held, nobody else touches depth.
        unsafe { *self.depth.get() = 1 };
    }

    /// # Safety
    /// The caller must own the lock.
    #[inline]
    unsafe fn increment_depth(&self) {
        // SAFETY: owner-only access.
        let depth = unsafe { &mut *self.depth.get() };
        assert!(*depth < usize::MAX, "reentrant lock depth overflow");
        *depth += 1;
    }

    /// Releases one level of ownership.
    ///
    /// # Safety
    /// The current thread must hold the lock, and every `unlock` must match a
    /// prior successful `lock`/`try_lock`.
    pub unsafe fn unlock(&self) {
        debug_assert!(self.is_held_by_current_thread());
        // SAFETY: owner-only access per the contract.
        let depth = unsafe { &mut *self.depth.get() };
        *depth -= 1;
        if *depth == 0 {
            self.owner.store(0, Ordering::Relaxed);
            // SAFETY: the mutex was leaked into this lock when depth went 0 -> 1.
            unsafe { self.mutex.force_unlock() };
        }
    }

    /// Returns `true` if the calling thread owns the lock.
    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.owned_by(current_thread_id().get())
    }

    /// Nesting depth as seen by the calling thread: zero unless it is the owner.
    pub fn depth(&self) -> usize {
        if self.is_held_by_current_thread() {
            // SAFETY: we are the owner.
            unsafe { *self.depth.get() }
        } else {
            0
        }
    }

    /// Returns `true` if any thread holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}

impl Default for RawReentrantLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawReentrantLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawReentrantLock")
            .field("locked", &self.is_locked())
            .field("held_here", &self.is_held_by_current_thread())
            .finish()
    }
}
