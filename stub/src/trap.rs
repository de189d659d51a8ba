//! Component F: the seam between the trap-delivery substrate the
//! surrounding platform owns (IDT/vector-table plumbing, the actual
//! `iretd`) and the command dispatcher this crate owns. [`VectorTable`] and
//! [`TrapContext`] are the only interfaces this crate consumes from that
//! substrate; it never reaches into platform state beyond them.

use crate::engine::{Engine, ResumeAction};
use crate::probe;
use crate::snapshot::Snapshot;
use crate::transport::Transport;
use snafu::Snafu;

const PAGE_FAULT_VECTOR: u32 = 14;

/// The vectors a session needs a handler installed for: divide error,
/// debug, breakpoint, overflow, bound range, invalid opcode, device not
/// available, double fault, coprocessor segment overrun, invalid TSS,
/// segment not present, stack exception, general protection, page fault,
/// x87 FP error — every vector the signal table maps to something other
/// than the unmapped-vector default.
pub const HANDLED_VECTORS: [u32; 15] =
    [0, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 16];

/// Read/write access to the saved architectural context for one trap.
/// Typically a thin wrapper around a pointer into the interrupt frame the
/// platform pushed on entry.
pub trait TrapContext {
    fn load(&self) -> Snapshot;
    fn commit(&mut self, snapshot: &Snapshot);

    /// Redirects the faulting instruction pointer without disturbing any
    /// other saved state. Used only on the probe fault-recovery path.
    fn redirect(&mut self, target: usize);
}

/// What the platform provides so a [`TrapGlue`] can install and remove
/// itself. The actual IDT/vector-table mechanics live on the other side of
/// this trait.
pub trait VectorTable {
    fn install(&mut self, vector: u32) -> Result<(), InstallError>;
    fn uninstall(&mut self, vector: u32);
}

#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    #[snafu(display("vector {vector} is already claimed by another handler"))]
    VectorInUse { vector: u32 },
    #[snafu(display("platform rejected installing a handler for vector {vector}"))]
    PlatformRejected { vector: u32 },
}

/// Owns the command dispatcher and tracks exactly which vectors this
/// instance has live handlers for, so teardown only ever touches vectors it
/// actually installed.
pub struct TrapGlue<V: VectorTable> {
    table: V,
    engine: Engine,
    installed: [bool; HANDLED_VECTORS.len()],
}

impl<V: VectorTable> TrapGlue<V> {
    pub const fn new(table: V) -> Self {
        Self {
            table,
            engine: Engine::new(),
            installed: [false; HANDLED_VECTORS.len()],
        }
    }

    /// Installs handlers for every vector in [`HANDLED_VECTORS`], stopping
    /// and reporting on the first failure. Vectors already installed by a
    /// prior call are left alone.
    pub fn install(&mut self) -> Result<(), InstallError> {
        for (slot, &vector) in HANDLED_VECTORS.iter().enumerate() {
            if self.installed[slot] {
                continue;
            }
            self.table.install(vector)?;
            self.installed[slot] = true;
        }
        Ok(())
    }

    /// Restores default handling for every vector this instance actually
    /// installed. Safe to call repeatedly: a vector already uninstalled is
    /// skipped rather than handed to the platform a second time.
    pub fn uninstall(&mut self) {
        for (slot, &vector) in HANDLED_VECTORS.iter().enumerate() {
            if self.installed[slot] {
                self.table.uninstall(vector);
                self.installed[slot] = false;
            }
        }
    }

    /// Called by the platform when one of the installed vectors fires.
    /// Page faults get a special-cased fast path: if the fault landed
    /// inside an armed memory probe, redirect and return without ever
    /// building a stop event, so a probed bad address never looks like a
    /// debuggee trap to the host.
    pub fn on_exception<T: Transport>(
        &mut self,
        transport: &mut T,
        ctx: &mut dyn TrapContext,
        vector: u32,
    ) {
        if vector == PAGE_FAULT_VECTOR && probe::is_armed() {
            probe::raise();
            ctx.redirect(probe::redirect_target());
            return;
        }

        let mut snapshot = ctx.load();
        let _action: ResumeAction = self.engine.service_exception(transport, &mut snapshot, vector);
        ctx.commit(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback::LoopbackTransport;
    use std::collections::HashSet;

    struct FakeContext {
        snapshot: Snapshot,
        redirected_to: Option<usize>,
    }

    impl TrapContext for FakeContext {
        fn load(&self) -> Snapshot {
            self.snapshot
        }
        fn commit(&mut self, snapshot: &Snapshot) {
            self.snapshot = *snapshot;
        }
        fn redirect(&mut self, target: usize) {
            self.redirected_to = Some(target);
        }
    }

    #[derive(Default)]
    struct FakeVectorTable {
        installed: HashSet<u32>,
        reject: Option<u32>,
    }

    impl VectorTable for FakeVectorTable {
        fn install(&mut self, vector: u32) -> Result<(), InstallError> {
            if self.reject == Some(vector) {
                return Err(InstallError::PlatformRejected { vector });
            }
            self.installed.insert(vector);
            Ok(())
        }
        fn uninstall(&mut self, vector: u32) {
            self.installed.remove(&vector);
        }
    }

    #[test]
    fn install_then_uninstall_walks_exactly_the_installed_set() {
        let mut glue = TrapGlue::new(FakeVectorTable::default());
        glue.install().unwrap();
        assert_eq!(glue.table.installed.len(), HANDLED_VECTORS.len());
        glue.uninstall();
        assert!(glue.table.installed.is_empty());
        // Idempotent: a second uninstall touches nothing and doesn't panic.
        glue.uninstall();
        assert!(glue.table.installed.is_empty());
    }

    #[test]
    fn install_failure_leaves_partial_state_installed() {
        let mut glue = TrapGlue::new(FakeVectorTable {
            reject: Some(HANDLED_VECTORS[2]),
            ..Default::default()
        });
        let err = glue.install().unwrap_err();
        assert_eq!(
            err,
            InstallError::PlatformRejected {
                vector: HANDLED_VECTORS[2]
            }
        );
        assert_eq!(glue.table.installed.len(), 2);
        glue.uninstall();
        assert!(glue.table.installed.is_empty());
    }

    #[test]
    fn armed_page_fault_redirects_without_entering_the_engine() {
        let mut glue = TrapGlue::new(FakeVectorTable::default());
        let mut ctx = FakeContext {
            snapshot: Snapshot::new(),
            redirected_to: None,
        };
        probe::arm(0xdead_beef);

        // An empty transport would panic the moment the engine tried to
        // read or write a byte, so reaching the end of this call without
        // touching `t` is itself proof the engine was never entered.
        let mut t = LoopbackTransport::new();
        glue.on_exception(&mut t, &mut ctx, PAGE_FAULT_VECTOR);

        assert_eq!(ctx.redirected_to, Some(0xdead_beef));
        assert!(!probe::is_armed());
        assert!(t.sent.is_empty());
    }

    #[test]
    fn unarmed_page_fault_falls_through_to_the_engine() {
        probe::disarm();
        let mut glue = TrapGlue::new(FakeVectorTable::default());
        let mut ctx = FakeContext {
            snapshot: Snapshot::new(),
            redirected_to: None,
        };
        let mut t = LoopbackTransport::new();
        t.feed(b"+"); // ack the initial stop reply
        t.feed(b"$c#63"); // immediately resume so the call returns

        glue.on_exception(&mut t, &mut ctx, PAGE_FAULT_VECTOR);

        assert!(ctx.redirected_to.is_none());
        assert!(t.sent.starts_with(b"$S0b#"));
    }
}
