//! Cell family - shared state behind a synchronization path.
//!
//! The module tree is intentionally stratified:
//! - `lazy::*` build a value once and then only share it.
//! - `guarded::*` hand out exclusive, reentrant access to a mutable value.
//!
//! Both sit on the raw primitives in [`crate::concurrency::sync`].

pub mod guarded;
pub mod lazy;

pub use guarded::{GuardedResource, PayloadMut, ScopedGuard};
pub use lazy::{LazySingleton, SingletonState, Strategy};
