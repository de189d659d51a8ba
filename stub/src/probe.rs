//! Fault-tolerant access to debuggee memory. A fault during a probe must
//! never kill the stub — it must produce a short count and a raised latch
//! instead.
//!
//! The actual fault recovery is a cooperative handshake with the trap glue:
//! before touching debuggee memory, a probe arms itself by recording the
//! address execution should resume at if a page fault lands inside
//! [`probe_load_byte`]/[`probe_store_byte`] — a dedicated fault-return-
//! address slot, the portable equivalent of a `longjmp` out of a signal
//! handler. [`crate::trap`] consults [`is_armed`]/[`raise`] before ever
//! constructing a [`crate::engine`] stop event for a page fault.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Set by the trap glue when a fault lands inside an armed probe access.
static FAULT_LATCH: AtomicBool = AtomicBool::new(false);

/// Non-zero while a probe access may legitimately fault. The trap glue
/// checks this before deciding whether a page fault belongs to the probe
/// or to the debuggee.
static ARMED: AtomicBool = AtomicBool::new(false);

/// Where to resume if the armed access faults. Spec's single-slot
/// discipline: a probe is never re-entered while another is armed, so one
/// slot (not a stack) is sufficient and matches the original's single
/// `mem_fault_routine` pointer.
static FAULT_REDIRECT: AtomicUsize = AtomicUsize::new(0);

/// True if a probe is currently armed and a fault should be redirected
/// rather than treated as a debuggee fault. Called from trap context only.
pub fn is_armed() -> bool {
    ARMED.load(Ordering::SeqCst)
}

/// The address execution should resume at when a fault is redirected.
/// Only meaningful while [`is_armed`] is true.
pub fn redirect_target() -> usize {
    FAULT_REDIRECT.load(Ordering::SeqCst)
}

/// Called from trap context when a fault lands inside an armed probe:
/// raises the latch and disarms, so the probe's inspection of
/// [`take_fault`] after the access observes the failure exactly once.
pub fn raise() {
    FAULT_LATCH.store(true, Ordering::SeqCst);
    ARMED.store(false, Ordering::SeqCst);
}

// `pub(crate)` rather than private: the trap glue's tests need to arm a
// probe without running an actual faulting access, to check the redirect
// wiring in isolation from the volatile memory operations.
pub(crate) fn arm(redirect: usize) {
    FAULT_LATCH.store(false, Ordering::SeqCst);
    FAULT_REDIRECT.store(redirect, Ordering::SeqCst);
    ARMED.store(true, Ordering::SeqCst);
}

pub(crate) fn disarm() {
    ARMED.store(false, Ordering::SeqCst);
}

pub(crate) fn take_fault() -> bool {
    FAULT_LATCH.swap(false, Ordering::SeqCst)
}

/// Loads one byte from `addr`. A tiny leaf with no locals, so that if the
/// trap glue redirects execution out of it mid-instruction there is no
/// half-updated local state to worry about — only the one memory read.
#[inline(never)]
fn probe_load_byte(addr: usize) -> u8 {
    unsafe { core::ptr::read_volatile(addr as *const u8) }
}

/// Stores one byte to `addr`. Same no-locals discipline as
/// [`probe_load_byte`].
#[inline(never)]
fn probe_store_byte(addr: usize, value: u8) {
    unsafe { core::ptr::write_volatile(addr as *mut u8, value) };
}

/// Reads `n` bytes starting at `addr` into `out[..n]`. When `may_fault` is
/// true, a fault during any byte access aborts the read and returns the
/// count completed so far; a short count is always treated as a failed
/// access, never partial success. When `may_fault` is false, a fault is not
/// caught here: it propagates to the trap glue's ordinary stop path, since
/// this mode is only used for accesses the caller already knows are safe.
pub fn probe_read(addr: usize, n: usize, out: &mut [u8], may_fault: bool) -> usize {
    let n = n.min(out.len());
    if !may_fault {
        for i in 0..n {
            out[i] = probe_load_byte(addr + i);
        }
        return n;
    }

    let mut copied = 0;
    for i in 0..n {
        arm(probe_read as usize);
        out[i] = probe_load_byte(addr + i);
        disarm();
        if take_fault() {
            return copied;
        }
        copied += 1;
    }
    copied
}

/// Writes `n` bytes from `src[..n]` to `addr`, with the same fault
/// semantics as [`probe_read`].
pub fn probe_write(addr: usize, n: usize, src: &[u8], may_fault: bool) -> usize {
    let n = n.min(src.len());
    if !may_fault {
        for i in 0..n {
            probe_store_byte(addr + i, src[i]);
        }
        return n;
    }

    let mut written = 0;
    for i in 0..n {
        arm(probe_write as usize);
        probe_store_byte(addr + i, src[i]);
        disarm();
        if take_fault() {
            return written;
        }
        written += 1;
    }
    written
}
