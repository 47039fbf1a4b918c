use core::cell::RefMut;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::trace::trace_event;

/// Set once a holder unwinds while mutating; cleared only on request.
#[derive(Debug, Default)]
pub(super) struct PoisonFlag(AtomicBool);

impl PoisonFlag {
    pub(super) const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub(super) fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub(super) fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub(super) fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Mutable access to a guarded payload.
///
/// Obtained from [`ScopedGuard::write`](super::ScopedGuard::write). If the
/// thread panics while this is alive, the resource is marked poisoned: the
/// payload may be half-updated and later acquirers are told so.
#[must_use = "dropping the handle ends the mutable borrow immediately"]
pub struct PayloadMut<'g, T: ?Sized> {
    value: RefMut<'g, T>,
    poison: &'g PoisonFlag,
    /// Already unwinding when the borrow began; a panic we did not cause.
    panicking: bool,
}

impl<'g, T: ?Sized> PayloadMut<'g, T> {
    pub(super) fn new(value: RefMut<'g, T>, poison: &'g PoisonFlag) -> Self {
        Self {
            value,
            poison,
            panicking: thread::panicking(),
        }
    }
}

impl<T: ?Sized> Deref for PayloadMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ?Sized> DerefMut for PayloadMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: ?Sized> Drop for PayloadMut<'_, T> {
    fn drop(&mut self) {
        if !self.panicking && thread::panicking() {
            trace_event!(error, "holder panicked mid-mutation, resource poisoned");
            self.poison.set();
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for PayloadMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for PayloadMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.value, f)
    }
}
