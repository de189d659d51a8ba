#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate static_assertions;

pub mod config;
pub mod engine;
pub mod hex;
pub mod logging;
pub mod packet;
pub mod probe;
pub mod signal;
pub mod snapshot;
pub mod trap;
pub mod transport;

use core::sync::atomic::{AtomicBool, Ordering};
use lazy_static::lazy_static;
use spin::Mutex;
use trap::{InstallError, TrapContext, TrapGlue, VectorTable};
use transport::Transport;

/// Wraps a raw pointer to the platform's vector table so a single
/// `'static`-lifetime session can be stored behind a `Mutex` without the
/// borrow checker needing to know the concrete platform type. The platform
/// guarantees the pointee outlives the session by never dropping it before
/// calling [`close`].
struct RawVectorTable(*mut dyn VectorTable);

unsafe impl Send for RawVectorTable {}

impl VectorTable for RawVectorTable {
    fn install(&mut self, vector: u32) -> Result<(), InstallError> {
        unsafe { (*self.0).install(vector) }
    }

    fn uninstall(&mut self, vector: u32) {
        unsafe { (*self.0).uninstall(vector) }
    }
}

lazy_static! {
    static ref SESSION: Mutex<Option<TrapGlue<RawVectorTable>>> = Mutex::new(None);
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// COM1-COM4 base I/O ports, the conventional PC serial assignment.
const COM_PORTS: [u16; 4] = [0x3f8, 0x2f8, 0x3e8, 0x2e8];

/// Records which serial port the bare-metal transport should bind. Must be
/// called before [`install`] if the `bare-metal-serial` backend is in use;
/// has no effect on the loopback transport used in tests.
pub fn serial_init(port_index: u8) {
    let port = COM_PORTS[(port_index as usize).min(COM_PORTS.len() - 1)];
    config::set(config::Config { port });
}

/// Installs trap handlers through `table` and marks the session live. The
/// platform owns `table`'s actual IDT/vector-table plumbing; this crate
/// only calls [`VectorTable::install`]/[`VectorTable::uninstall`] on it.
pub fn install(table: &'static mut dyn VectorTable) -> Result<(), InstallError> {
    let mut glue = TrapGlue::new(RawVectorTable(table as *mut dyn VectorTable));
    glue.install()?;
    *SESSION.lock() = Some(glue);
    INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// Restores default handling for every vector this session installed.
/// Idempotent: calling `close` without a prior `install`, or calling it
/// twice, is a no-op.
pub fn close() {
    if let Some(mut glue) = SESSION.lock().take() {
        glue.uninstall();
    }
    INITIALIZED.store(false, Ordering::SeqCst);
}

/// Triggers an immediate stop if a session is installed; a no-op otherwise.
pub fn breakpoint() {
    if !INITIALIZED.load(Ordering::SeqCst) {
        return;
    }
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("int3");
    }
}

/// Called by the platform's actual exception entry stub once a handler
/// registered through [`install`] fires. Routes to the dispatcher if a
/// session is live.
pub fn on_exception<T: Transport>(transport: &mut T, ctx: &mut dyn TrapContext, vector: u32) {
    if let Some(glue) = SESSION.lock().as_mut() {
        glue.on_exception(transport, ctx, vector);
    }
}

/// Same as [`on_exception`], but opens the bare-metal serial transport at
/// the port `serial_init` recorded instead of taking one from the caller.
/// This is the entry point a platform using the `bare-metal-serial`
/// backend actually wires into its trap dispatch, so the port
/// `serial_init` configured is the one that gets opened.
#[cfg(feature = "bare-metal-serial")]
pub fn on_exception_serial(ctx: &mut dyn TrapContext, vector: u32) {
    let mut serial = unsafe { transport::SerialPort::new() };
    on_exception(&mut serial, ctx, vector);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use crate::transport::loopback::LoopbackTransport;
    use std::collections::HashSet;

    struct FakeContext(Snapshot);
    impl TrapContext for FakeContext {
        fn load(&self) -> Snapshot {
            self.0
        }
        fn commit(&mut self, snapshot: &Snapshot) {
            self.0 = *snapshot;
        }
        fn redirect(&mut self, _target: usize) {}
    }

    struct FakeVectorTable(HashSet<u32>);
    impl VectorTable for FakeVectorTable {
        fn install(&mut self, vector: u32) -> Result<(), InstallError> {
            self.0.insert(vector);
            Ok(())
        }
        fn uninstall(&mut self, vector: u32) {
            self.0.remove(&vector);
        }
    }

    #[test]
    fn breakpoint_is_a_no_op_before_install() {
        INITIALIZED.store(false, Ordering::SeqCst);
        breakpoint(); // must not panic even without a session
    }

    #[test]
    fn install_close_round_trip_flips_the_init_flag() {
        close(); // ensure a clean slate regardless of test order
        let table: &'static mut FakeVectorTable = Box::leak(Box::new(FakeVectorTable(HashSet::new())));
        install(table).unwrap();
        assert!(INITIALIZED.load(Ordering::SeqCst));
        close();
        assert!(!INITIALIZED.load(Ordering::SeqCst));
    }

    #[test]
    fn on_exception_without_a_session_does_not_panic() {
        close();
        let mut ctx = FakeContext(Snapshot::new());
        let mut t = LoopbackTransport::new();
        on_exception(&mut t, &mut ctx, 3);
        assert!(t.sent.is_empty());
    }
}
