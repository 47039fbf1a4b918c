//! `GuardedResource`: a payload behind a reentrant, poison-aware lock.
//!
//! Holding a [`ScopedGuard`] keeps every other thread out of the payload, so
//! a read, a check and a write done under one guard form a single unit.
//! The owning thread may acquire again while it already holds a guard; the
//! lock is handed to another thread only once every nested guard is gone.
//!
//! Nested guards on one thread share the payload, so mutable access is
//! borrow-checked at runtime: [`ScopedGuard::write`] panics if the payload is
//! already borrowed on this thread, [`ScopedGuard::try_write`] returns `None`.

mod payload;

use core::cell::{Ref, RefCell};
use core::fmt;
use core::marker::PhantomData;
use std::time::Duration;

use crate::concurrency::sync::RawReentrantLock;
use crate::error::SyncError;
use crate::trace::trace_event;
use payload::PoisonFlag;
pub use payload::PayloadMut;

/// Mutable state that only one thread at a time may touch.
///
/// # Examples
///
/// ```rust
/// use holdfast::GuardedResource;
///
/// let counter = GuardedResource::new(0u32);
/// {
///     let outer = counter.acquire().unwrap();
///     *outer.write() += 1;
///     // Same thread, no deadlock.
///     let inner = counter.acquire().unwrap();
///     *inner.write() += 1;
///     assert_eq!(inner.depth(), 2);
/// }
/// assert_eq!(counter.with(|n| *n).unwrap(), 2);
/// ```
pub struct GuardedResource<T: ?Sized> {
    lock: RawReentrantLock,
    poison: PoisonFlag,
    payload: RefCell<T>,
}

// SAFETY: the payload is only reached through a `ScopedGuard`, which exists
// only on the thread that owns `lock`. The `RefCell` is therefore never used
// from two threads at once, and only `T: Send` is needed to hand it over.
unsafe impl<T: ?Sized + Send> Sync for GuardedResource<T> {}

impl<T> GuardedResource<T> {
    /// Wraps `payload`.
    pub const fn new(payload: T) -> Self {
        Self {
            lock: RawReentrantLock::new(),
            poison: PoisonFlag::new(),
            payload: RefCell::new(payload),
        }
    }

    /// Consumes the resource and returns the payload.
    ///
    /// Does not check the poison flag; use [`is_poisoned`](Self::is_poisoned)
    /// first if the payload's consistency matters.
    pub fn into_inner(self) -> T {
        self.payload.into_inner()
    }
}

impl<T: ?Sized> GuardedResource<T> {
    /// Blocks until this thread holds the lock and returns a guard.
    ///
    /// Returns immediately when the calling thread already holds the lock.
    ///
    /// # Errors
    /// [`SyncError::ResourcePoisoned`] if a previous holder panicked while
    /// mutating the payload. The lock is not retained in that case; see
    /// [`recover`](Self::recover).
    pub fn acquire(&self) -> Result<ScopedGuard<'_, T>, SyncError> {
        self.lock.lock();
        self.checked(ScopedGuard::new(self))
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    ///
    /// # Errors
    /// [`SyncError::LockTimeout`] if another thread still holds the lock when
    /// the bound elapses (the payload is untouched), or
    /// [`SyncError::ResourcePoisoned`].
    pub fn try_acquire(&self, timeout: Duration) -> Result<ScopedGuard<'_, T>, SyncError> {
        if !self.lock.try_lock_for(timeout) {
            trace_event!(debug, ?timeout, "guarded resource acquisition timed out");
            return Err(SyncError::LockTimeout(timeout));
        }
        self.checked(ScopedGuard::new(self))
    }

    /// Acquires only if no other thread holds the lock right now.
    ///
    /// # Errors
    /// As [`try_acquire`](Self::try_acquire) with a zero bound.
    pub fn try_acquire_now(&self) -> Result<ScopedGuard<'_, T>, SyncError> {
        if !self.lock.try_lock() {
            return Err(SyncError::LockTimeout(Duration::ZERO));
        }
        self.checked(ScopedGuard::new(self))
    }

    fn checked<'a>(&self, guard: ScopedGuard<'a, T>) -> Result<ScopedGuard<'a, T>, SyncError> {
        if self.poison.get() {
            trace_event!(warn, "acquisition refused, resource is poisoned");
            // Dropping the guard gives the level we just took back.
            drop(guard);
            return Err(SyncError::ResourcePoisoned);
        }
        Ok(guard)
    }

    /// Acquires, runs `f` on the payload, and releases.
    ///
    /// # Errors
    /// See [`acquire`](Self::acquire).
    ///
    /// # Panics
    /// If this thread already holds a borrow of the payload through an outer
    /// guard.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, SyncError> {
        let guard = self.acquire()?;
        let result = f(&mut guard.write());
        Ok(result)
    }

    /// Acquires the lock even if the resource is poisoned.
    ///
    /// Meant for repairing the payload; the poison flag stays set until
    /// [`clear_poison`](Self::clear_poison).
    pub fn recover(&self) -> ScopedGuard<'_, T> {
        self.lock.lock();
        ScopedGuard::new(self)
    }

    /// Returns `true` if a holder panicked mid-mutation and the flag has not
    /// been cleared.
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poison.get()
    }

    /// Declares the payload consistent again.
    pub fn clear_poison(&self) {
        self.poison.clear();
    }

    /// Returns `true` if the calling thread holds at least one guard.
    #[inline]
    pub fn is_locked_by_current_thread(&self) -> bool {
        self.lock.is_held_by_current_thread()
    }

    /// Direct access through exclusive ownership; no locking needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.payload.get_mut()
    }
}

impl<T: Default> Default for GuardedResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for GuardedResource<T> {
    fn from(payload: T) -> Self {
        Self::new(payload)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for GuardedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("GuardedResource");
        if self.lock.try_lock() {
            match self.payload.try_borrow() {
                Ok(payload) => d.field("payload", &&*payload),
                Err(_) => d.field("payload", &format_args!("<borrowed>")),
            };
            // SAFETY: matched with the successful `try_lock` above.
            unsafe { self.lock.unlock() };
        } else {
            d.field("payload", &format_args!("<locked>"));
        }
        d.field("poisoned", &self.poison.get());
        d.finish_non_exhaustive()
    }
}

/// Proof that the current thread holds a [`GuardedResource`]'s lock.
///
/// Dropping it releases one nesting level. Guards cannot leave their thread.
#[must_use = "the lock level is released as soon as the guard is dropped"]
pub struct ScopedGuard<'a, T: ?Sized> {
    resource: &'a GuardedResource<T>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T: ?Sized> ScopedGuard<'a, T> {
    /// The caller must have just taken one level of `resource.lock`.
    fn new(resource: &'a GuardedResource<T>) -> Self {
        Self {
            resource,
            _not_send: PhantomData,
        }
    }

    /// Shared access to the payload.
    ///
    /// # Panics
    /// If the payload is mutably borrowed on this thread.
    pub fn read(&self) -> Ref<'_, T> {
        self.resource.payload.borrow()
    }

    /// Shared access, or `None` while a mutable borrow is live on this thread.
    pub fn try_read(&self) -> Option<Ref<'_, T>> {
        self.resource.payload.try_borrow().ok()
    }

    /// Mutable access to the payload.
    ///
    /// # Panics
    /// If the payload is already borrowed on this thread.
    pub fn write(&self) -> PayloadMut<'_, T> {
        PayloadMut::new(self.resource.payload.borrow_mut(), &self.resource.poison)
    }

    /// Mutable access, or `None` while any other borrow is live on this thread.
    pub fn try_write(&self) -> Option<PayloadMut<'_, T>> {
        self.resource
            .payload
            .try_borrow_mut()
            .ok()
            .map(|value| PayloadMut::new(value, &self.resource.poison))
    }

    /// How many guards this thread currently holds on the resource.
    pub fn depth(&self) -> usize {
        self.resource.lock.depth()
    }
}

impl<T: ?Sized> Drop for ScopedGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: every guard is created right after taking one lock level on
        // this thread, and guards are `!Send`.
        unsafe { self.resource.lock.unlock() };
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ScopedGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ScopedGuard");
        match self.try_read() {
            Some(payload) => d.field("payload", &&*payload),
            None => d.field("payload", &format_args!("<borrowed>")),
        };
        d.field("depth", &self.depth()).finish()
    }
}
