//! Low-level concurrency support.
//!
//! Nothing here knows about payloads or values; these are the blocking and
//! identity primitives the cell types are built from.

pub mod sync;
