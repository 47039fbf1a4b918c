//! Process-unique thread identity used to key lock ownership.

use core::num::NonZeroUsize;
use core::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static THREAD_ID: NonZeroUsize = allocate();
}

fn allocate() -> NonZeroUsize {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    // Wrapping back to zero would hand out an id that means "no owner".
    assert!(id != usize::MAX, "thread id space exhausted");
    match NonZeroUsize::new(id) {
        Some(id) => id,
        None => unreachable!("thread ids start at one"),
    }
}

/// Returns a non-zero id for the calling thread.
///
/// Ids are never reused within a process, so a stale owner field can never
/// alias a live thread. Zero is free to mean "unowned".
#[inline]
pub fn current_thread_id() -> NonZeroUsize {
    THREAD_ID.with(|id| *id)
}
