//! Loom-based systematic concurrency tests for the publication protocols.
//!
//! These tests use the `loom` crate to explore all interleavings of the
//! double-checked publication and the reentrant ownership hand-over, checking
//! that no thread reads an unpublished value and that ownership never
//! overlaps.
//!
//! Run with: RUSTFLAGS="--cfg loom" cargo test --test singleton_loom --release
//!
//! Under normal `cargo test`, this file compiles to an empty module.

#![cfg(loom)]

use loom::cell::UnsafeCell;
use loom::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use loom::sync::{Arc, Mutex};
use loom::thread;

// ============================================================================
// Double-checked publication model
// ============================================================================
//
// Mirrors LazySingleton's DoubleChecked path:
//   - acquire-load the state; return the value if INITIALIZED
//   - otherwise take the gate, re-check, write the slot, release-store

const UNINITIALIZED: u8 = 0;
const INITIALIZED: u8 = 2;

struct LoomCell {
    state: AtomicU8,
    gate: Mutex<()>,
    slot: UnsafeCell<u64>,
    runs: AtomicUsize,
}

// SAFETY: the slot is written under the gate before the release store and
// only read after an acquire load observed it; loom checks exactly that.
unsafe impl Sync for LoomCell {}

impl LoomCell {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
            gate: Mutex::new(()),
            slot: UnsafeCell::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    fn get_or_init(&self, value: u64) -> u64 {
        if self.state.load(Ordering::Acquire) == INITIALIZED {
            return self.slot.with(|v| unsafe { *v });
        }
        let _gate = self.gate.lock().unwrap();
        if self.state.load(Ordering::Acquire) != INITIALIZED {
            self.runs.fetch_add(1, Ordering::Relaxed);
            self.slot.with_mut(|v| unsafe { *v = value });
            self.state.store(INITIALIZED, Ordering::Release);
        }
        self.slot.with(|v| unsafe { *v })
    }
}

#[test]
fn loom_double_checked_publishes_once() {
    loom::model(|| {
        let cell = Arc::new(LoomCell::new());

        let handles: Vec<_> = [11u64, 22]
            .into_iter()
            .map(|value| {
                let cell = cell.clone();
                thread::spawn(move || cell.get_or_init(value))
            })
            .collect();

        let main_seen = cell.get_or_init(33);
        let seen: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cell.runs.load(Ordering::Relaxed), 1);
        assert!(seen.iter().all(|&v| v == main_seen));
    });
}

// ============================================================================
// Reentrant ownership model
// ============================================================================
//
// Mirrors RawReentrantLock: owner id + depth on top of a plain mutex; the
// depth is only touched by the owner and the mutex is released at zero.

struct LoomReentrant {
    locked: Mutex<bool>,
    owner: AtomicUsize,
    depth: UnsafeCell<usize>,
    inside: AtomicUsize,
}

unsafe impl Sync for LoomReentrant {}

impl LoomReentrant {
    fn lock(&self, me: usize) {
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.with_mut(|d| unsafe { *d += 1 });
            return;
        }
        loop {
            let mut locked = self.locked.lock().unwrap();
            if !*locked {
                *locked = true;
                break;
            }
            drop(locked);
            thread::yield_now();
        }
        self.owner.store(me, Ordering::Relaxed);
        self.depth.with_mut(|d| unsafe { *d = 1 });
    }

    fn unlock(&self) {
        let remaining = self.depth.with_mut(|d| unsafe {
            *d -= 1;
            *d
        });
        if remaining == 0 {
            self.owner.store(0, Ordering::Relaxed);
            *self.locked.lock().unwrap() = false;
        }
    }
}

#[test]
fn loom_reentrant_owners_never_overlap() {
    loom::model(|| {
        let lock = Arc::new(LoomReentrant {
            locked: Mutex::new(false),
            owner: AtomicUsize::new(0),
            depth: UnsafeCell::new(0),
            inside: AtomicUsize::new(0),
        });

        let handles: Vec<_> = (1..=2usize)
            .map(|me| {
                let lock = lock.clone();
                thread::spawn(move || {
                    lock.lock(me);
                    lock.lock(me);
                    assert_eq!(lock.inside.fetch_add(1, Ordering::SeqCst), 0);
                    lock.inside.fetch_sub(1, Ordering::SeqCst);
                    lock.unlock();
                    lock.unlock();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(lock.owner.load(Ordering::Relaxed), 0);
    });
}
