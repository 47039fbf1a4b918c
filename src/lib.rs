//! # `holdfast` - Lazy Singletons and Guarded Resources
//!
//! Two in-process concurrency primitives sharing one failure and ordering
//! philosophy:
//!
//! - [`LazySingleton<T>`]: exactly one value, built on first demand (or up
//!   front), seen identically by every thread. The initialization strategy
//!   ([`Strategy`]) is picked at construction.
//! - [`GuardedResource<T>`]: a mutable payload behind a reentrant lock, so a
//!   read-validate-write sequence runs as a unit.
//!
//! [`Ledger<B>`] puts the second one to work for the classic overdraft race.
//!
//! ## Guarantees
//!
//! ### Singletons
//! - **Exactly once**: racing callers never run more than one successful
//!   initializer; losers never run theirs.
//! - **Happens-before**: initialization is published with a release store (or
//!   a gate release) and observed with an acquire load (or a gate acquire).
//! - **Retryable failure**: an initializer that errors or panics leaves the
//!   cell `Uninitialized`; nobody sees a partial value.
//!
//! ### Guarded resources
//! - **Exclusion**: at most one thread holds a guard at any time.
//! - **Reentrancy**: the holding thread may acquire again; the lock is handed
//!   over only after the matching number of releases.
//! - **Poisoning**: a panic during mutation is reported to later acquirers as
//!   [`SyncError::ResourcePoisoned`] instead of being silently ignored.
//! - **Bounded waits**: [`GuardedResource::try_acquire`] gives up with
//!   [`SyncError::LockTimeout`] and mutates nothing.
//!
//! ## Architecture
//!
//! Stratified the same way throughout:
//! 1. [`concurrency::sync`]: futex wait/wake, [`RawMutex`], [`RawReentrantLock`].
//! 2. [`cell`]: the value-holding types built on those.
//! 3. [`ledger`]: a domain type built on the cells.
//!
//! Enable the `tracing` feature to get events for slow-path initialization,
//! failures, poisoning and timeouts.
//!
//! ## Example
//!
//! ```rust
//! use holdfast::{GuardedResource, LazySingleton};
//! use std::thread;
//!
//! let settings: LazySingleton<Vec<&str>> = LazySingleton::double_checked();
//! let hits = GuardedResource::new(0u32);
//!
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             let list = settings.get_or_init(|| vec!["a", "b"]);
//!             hits.with(|n| *n += list.len() as u32).unwrap();
//!         });
//!     }
//! });
//!
//! assert_eq!(hits.with(|n| *n).unwrap(), 8);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod trace;

pub mod cell;
pub mod concurrency;
pub mod error;
pub mod ledger;

pub use cell::{GuardedResource, LazySingleton, PayloadMut, ScopedGuard, SingletonState, Strategy};
pub use concurrency::sync::{RawMutex, RawReentrantLock};
pub use error::{BoxError, SyncError};
pub use ledger::{Balance, Ledger, LedgerError};

// Compile-time assertions for the thread-safety contract.
const _: () = {
    const fn assert_sync<T: Sync>() {}
    const fn assert_send<T: Send>() {}

    assert_sync::<LazySingleton<String>>();
    assert_send::<LazySingleton<String>>();
    assert_sync::<GuardedResource<Vec<u8>>>();
    assert_send::<GuardedResource<Vec<u8>>>();
    // `Cell` is `Send` but not `Sync`; the lock makes sharing it sound.
    assert_sync::<GuardedResource<core::cell::Cell<u32>>>();
    assert_sync::<Ledger<i64>>();
};

// Raw primitives stay a word or two.
const _: () = {
    use core::mem;

    assert!(mem::size_of::<RawMutex>() == mem::size_of::<u32>());
    assert!(mem::size_of::<RawReentrantLock>() <= mem::size_of::<usize>() * 3);
};
