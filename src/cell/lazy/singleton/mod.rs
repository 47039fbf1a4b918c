//! `LazySingleton`: one value, built once, shared by every thread.
//!
//! The cell stores its value in-place (`MaybeUninit`) next to a state byte
//! and a gate. How the value gets there is decided by the [`Strategy`] the
//! cell was constructed with:
//!
//! - [`Strategy::Eager`]: written by the constructor, before the cell can be
//!   shared.
//! - [`Strategy::DoubleChecked`]: acquire-load the state; only on a miss take
//!   the gate, re-check, run the initializer and publish with a release store.
//! - [`Strategy::OnceGuard`]: take the gate on every call.
//!
//! ## Failure
//!
//! If the initializer returns an error or panics, the cell goes back to
//! `Uninitialized` and the gate is released. Callers that were blocked on the
//! gate re-check and, finding no value, run their own initializer; a value
//! from a failed attempt is never observable.

mod inner;

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use super::Strategy;
use crate::concurrency::sync::{current_thread_id, RawMutex};
use crate::error::{BoxError, SyncError};
use crate::trace::trace_event;
use inner::{ResetOnExit, INITIALIZED, INITIALIZING, UNINITIALIZED};

/// Observable lifecycle of a [`LazySingleton`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SingletonState {
    /// No value; the next `get_or_init` will build one.
    Uninitialized,
    /// An initializer is running on some thread.
    Initializing,
    /// The value is published and immutable.
    Initialized,
}

/// A thread-safe holder for exactly one lazily (or eagerly) built value.
///
/// # Examples
///
/// ```rust
/// use holdfast::LazySingleton;
///
/// static CONFIG: LazySingleton<String> = LazySingleton::double_checked();
///
/// let value = CONFIG.get_or_init(|| "loaded".to_owned());
/// assert_eq!(value, "loaded");
/// // Later initializers never run.
/// assert_eq!(CONFIG.get_or_init(|| unreachable!()), "loaded");
/// ```
pub struct LazySingleton<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    state: AtomicU8,
    strategy: Strategy,
    gate: RawMutex,
    /// Id of the thread running the initializer, zero otherwise.
    initializer: AtomicUsize,
    _owns: PhantomData<T>,
}

// SAFETY: the value is written once, under the gate, before the release store
// that publishes it; afterwards it is only shared. Sending the cell may send
// `T`, sharing it shares `&T` and lets any thread build the `T`.
unsafe impl<T: Send + Sync> Sync for LazySingleton<T> {}

impl<T> LazySingleton<T> {
    const fn with_state(strategy: Strategy, value: MaybeUninit<T>, state: u8) -> Self {
        Self {
            value: UnsafeCell::new(value),
            state: AtomicU8::new(state),
            strategy,
            gate: RawMutex::new(),
            initializer: AtomicUsize::new(0),
            _owns: PhantomData,
        }
    }

    /// Creates an initialized cell with the [`Strategy::Eager`] strategy.
    pub const fn eager(value: T) -> Self {
        Self::with_state(Strategy::Eager, MaybeUninit::new(value), INITIALIZED)
    }

    /// Runs `init` now and stores its result ([`Strategy::Eager`]).
    pub fn eager_with<F>(init: F) -> Self
    where
        F: FnOnce() -> T,
    {
        Self::eager(init())
    }

    /// Creates an empty cell using [`Strategy::DoubleChecked`].
    pub const fn double_checked() -> Self {
        Self::with_state(Strategy::DoubleChecked, MaybeUninit::uninit(), UNINITIALIZED)
    }

    /// Creates an empty cell using [`Strategy::OnceGuard`].
    pub const fn once_guard() -> Self {
        Self::with_state(Strategy::OnceGuard, MaybeUninit::uninit(), UNINITIALIZED)
    }

    /// The strategy this cell was built with.
    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Current lifecycle state.
    ///
    /// Only `Initialized` is stable; the other two may change as soon as
    /// this returns.
    pub fn state(&self) -> SingletonState {
        match self.state.load(Ordering::Acquire) {
            INITIALIZED => SingletonState::Initialized,
            INITIALIZING => SingletonState::Initializing,
            _ => SingletonState::Uninitialized,
        }
    }

    /// Returns `true` once a value has been published.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == INITIALIZED
    }

    /// Returns the value if it has been published, without blocking.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: the acquire load above synchronizes with the release
            // store that published the value.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// # Safety
    /// The state must have been observed as `INITIALIZED` with acquire ordering
    /// (or under the gate).
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.state.load(Ordering::Relaxed) == INITIALIZED);
        // SAFETY: initialized and never mutated through `&self` again.
        unsafe { (*self.value.get()).assume_init_ref() }
    }

    /// Returns the value, building it with `init` if this is the first demand.
    ///
    /// Racing callers are serialized by the strategy: exactly one `init` runs
    /// to completion and every caller receives a reference to its result.
    ///
    /// # Panics
    /// Propagates a panic from `init` (the cell stays uninitialized), and
    /// panics if `init` re-enters this cell on the same thread.
    pub fn get_or_init<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        match self.get_or_init_with(|| Ok::<T, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init).
    ///
    /// # Errors
    /// Returns [`SyncError::InitializationFailed`] carrying `init`'s error. The
    /// cell is left uninitialized and a later call may retry.
    pub fn get_or_try_init<F, E>(&self, init: F) -> Result<&T, SyncError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        self.get_or_init_with(init)
            .map_err(|err| SyncError::InitializationFailed(err.into()))
    }

    #[inline]
    fn get_or_init_with<F, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if self.strategy != Strategy::OnceGuard {
            if let Some(value) = self.get() {
                return Ok(value);
            }
        }
        self.get_or_init_gated(init)
    }

    #[cold]
    fn get_or_init_gated<F, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let me = current_thread_id().get();
        // Only this thread stores its own id, so seeing it here means `init`
        // called back into the cell. Taking the gate would deadlock.
        assert!(
            !(self.state.load(Ordering::Relaxed) == INITIALIZING
                && self.initializer.load(Ordering::Relaxed) == me),
            "reentrant initialization of LazySingleton"
        );

        let _gate = self.gate.lock();
        // Someone may have finished between the first check and the gate.
        if let Some(value) = self.get() {
            return Ok(value);
        }

        trace_event!(debug, strategy = %self.strategy, "running singleton initializer");
        self.initializer.store(me, Ordering::Relaxed);
        self.state.store(INITIALIZING, Ordering::Relaxed);
        let reset = ResetOnExit {
            state: &self.state,
            initializer: &self.initializer,
        };

        match init() {
            Ok(value) => {
                // SAFETY: we hold the gate and the state is INITIALIZING, so no
                // reference to the slot exists.
                unsafe { (*self.value.get()).write(value) };
                reset.disarm();
                self.initializer.store(0, Ordering::Relaxed);
                self.state.store(INITIALIZED, Ordering::Release);
                trace_event!(debug, strategy = %self.strategy, "singleton initialized");
                // SAFETY: just published.
                Ok(unsafe { self.get_unchecked() })
            }
            Err(err) => {
                trace_event!(warn, strategy = %self.strategy, "singleton initializer failed, cell reset");
                drop(reset);
                Err(err)
            }
        }
    }

    /// Mutable access to the value, if initialized.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if *self.state.get_mut() == INITIALIZED {
            // SAFETY: `&mut self` is exclusive and the value is initialized.
            Some(unsafe { self.value.get_mut().assume_init_mut() })
        } else {
            None
        }
    }

    /// Removes the value, leaving the cell uninitialized.
    ///
    /// Works for every strategy; an eager cell taken this way behaves like a
    /// double-checked one on its next `get_or_init`.
    pub fn take(&mut self) -> Option<T> {
        if *self.state.get_mut() == INITIALIZED {
            *self.state.get_mut() = UNINITIALIZED;
            // SAFETY: was initialized; the state now says it is not, so the
            // value is read out exactly once.
            Some(unsafe { self.value.get_mut().assume_init_read() })
        } else {
            None
        }
    }

    /// Consumes the cell, returning the value if it was initialized.
    pub fn into_inner(mut self) -> Option<T> {
        self.take()
    }
}

impl<T> Default for LazySingleton<T> {
    fn default() -> Self {
        Self::double_checked()
    }
}

impl<T> From<T> for LazySingleton<T> {
    fn from(value: T) -> Self {
        Self::eager(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for LazySingleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("LazySingleton");
        d.field("strategy", &self.strategy);
        match self.get() {
            Some(value) => d.field("value", value),
            None => d.field("value", &format_args!("<{:?}>", self.state())),
        };
        d.finish()
    }
}

impl<T> Drop for LazySingleton<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == INITIALIZED {
            // SAFETY: exclusive access in drop; the value is initialized.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}
