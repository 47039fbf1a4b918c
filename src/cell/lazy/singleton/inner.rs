use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

pub(super) const UNINITIALIZED: u8 = 0;
pub(super) const INITIALIZING: u8 = 1;
pub(super) const INITIALIZED: u8 = 2;

/// Puts the cell back to `Uninitialized` on every exit path of an
/// initializer (error return or unwind) unless disarmed after publishing.
pub(super) struct ResetOnExit<'a> {
    pub(super) state: &'a AtomicU8,
    pub(super) initializer: &'a AtomicUsize,
}

impl ResetOnExit<'_> {
    #[inline]
    pub(super) fn disarm(self) {
        core::mem::forget(self);
    }
}

impl Drop for ResetOnExit<'_> {
    fn drop(&mut self) {
        self.initializer.store(0, Ordering::Relaxed);
        self.state.store(UNINITIALIZED, Ordering::Release);
    }
}
