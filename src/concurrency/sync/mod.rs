//! Blocking building blocks: address wait/wake, a raw futex mutex and a raw
//! reentrant lock keyed by thread identity.
//!
//! Everything that blocks in this crate goes through [`wait_on_u32`] or
//! [`wait_on_u32_timeout`], so the platform specifics live here only.

pub mod raw_mutex;
pub mod reentrant;
pub mod thread_id;

pub use raw_mutex::{RawMutex, RawMutexGuard};
pub use reentrant::RawReentrantLock;
pub use thread_id::current_thread_id;

use core::sync::atomic::AtomicU32;
#[cfg(not(any(windows, target_os = "linux")))]
use core::sync::atomic::Ordering;
use std::time::Duration;
#[cfg(not(any(windows, target_os = "linux")))]
use std::time::Instant;

#[cfg(windows)]
use windows_sys::Win32::System::Threading::{
    WaitOnAddress, WakeByAddressAll, WakeByAddressSingle,
};

#[cfg(target_os = "linux")]
use libc::{SYS_futex, FUTEX_PRIVATE_FLAG, FUTEX_WAIT, FUTEX_WAKE};

#[cfg(target_os = "linux")]
#[inline]
#[allow(clippy::cast_possible_wrap)]
fn futex_wait(addr: *const u32, expected: u32, timeout: Option<Duration>) {
    let ts = timeout.map(|d| libc::timespec {
        tv_sec: libc::time_t::try_from(d.as_secs()).unwrap_or(libc::time_t::MAX),
        // Always below 1e9, fits any c_long.
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(core::ptr::null(), |t| t as *const libc::timespec);
    // SAFETY: `addr` points into a live `AtomicU32` owned by the caller; the
    // kernel only reads it and compares against `expected`.
    unsafe {
        libc::syscall(
            SYS_futex,
            addr,
            FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
            expected,
            ts_ptr,
        );
    }
}

#[cfg(target_os = "linux")]
#[inline]
fn futex_wake(addr: *const u32, count: i32) {
    // SAFETY: waking never dereferences `addr` beyond using it as a key.
    unsafe {
        libc::syscall(SYS_futex, addr, FUTEX_WAKE | FUTEX_PRIVATE_FLAG, count);
    }
}

#[cfg(windows)]
#[inline]
fn wait_on_address(addr: &AtomicU32, expected: u32, millis: u32) {
    // SAFETY: both pointers are valid for `size_of::<u32>()` bytes for the
    // duration of the call.
    unsafe {
        let expected_ptr = &expected as *const u32 as *const _;
        let addr_ptr = addr as *const _ as *mut _;
        WaitOnAddress(addr_ptr, expected_ptr, core::mem::size_of::<u32>(), millis);
    }
}

/// Wakes all threads waiting on the given address.
#[inline]
pub fn wake_all_u32(addr: &AtomicU32) {
    #[cfg(windows)]
    unsafe {
        WakeByAddressAll(addr as *const _ as *mut _);
    }
    #[cfg(target_os = "linux")]
    {
        futex_wake(addr as *const _ as *const u32, i32::MAX);
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    let _ = addr;
}

/// Wakes one thread waiting on the given address.
#[inline]
pub fn wake_one_u32(addr: &AtomicU32) {
    #[cfg(windows)]
    unsafe {
        WakeByAddressSingle(addr as *const _ as *mut _);
    }
    #[cfg(target_os = "linux")]
    {
        futex_wake(addr as *const _ as *const u32, 1);
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    let _ = addr;
}

/// Waits on the given address until the value changes from `expected`.
///
/// May return spuriously; callers re-check their condition in a loop.
#[inline]
pub fn wait_on_u32(addr: &AtomicU32, expected: u32) {
    #[cfg(windows)]
    {
        wait_on_address(addr, expected, u32::MAX);
    }
    #[cfg(target_os = "linux")]
    {
        futex_wait(addr as *const _ as *const u32, expected, None);
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    while addr.load(Ordering::SeqCst) == expected {
        std::thread::yield_now();
    }
}

/// Waits on the given address until the value changes from `expected` or
/// `timeout` elapses, whichever comes first.
///
/// Like [`wait_on_u32`] this may return early; callers track their own deadline.
#[inline]
pub fn wait_on_u32_timeout(addr: &AtomicU32, expected: u32, timeout: Duration) {
    #[cfg(windows)]
    {
        // `u32::MAX` means INFINITE, stay one below it. Round up so a
        // sub-millisecond remainder does not turn into a busy loop.
        let millis = timeout
            .as_nanos()
            .div_ceil(1_000_000)
            .clamp(1, u128::from(u32::MAX - 1));
        wait_on_address(addr, expected, u32::try_from(millis).unwrap_or(u32::MAX - 1));
    }
    #[cfg(target_os = "linux")]
    {
        futex_wait(addr as *const _ as *const u32, expected, Some(timeout));
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        let deadline = Instant::now() + timeout;
        while addr.load(Ordering::SeqCst) == expected && Instant::now() < deadline {
            std::thread::yield_now();
        }
    }
}
