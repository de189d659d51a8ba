//! `c`/`s`: leave the command loop and resume the debuggee, optionally at a
//! new PC.

use crate::hex;
use crate::snapshot::Snapshot;

/// What [`super::Engine::service_exception`] tells the caller to do once a
/// run-control command has been seen. The PC and trap-flag changes have
/// already been applied to the snapshot by the time this is returned; the
/// variant only tells the caller whether single-step trapping is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    Continue(Option<u32>),
    Step(Option<u32>),
}

pub(super) fn resume(cmd: u8, args: &[u8], snapshot: &mut Snapshot) -> ResumeAction {
    let (addr, consumed) = hex::parse_hex_prefix(args);
    let addr = if consumed > 0 { Some(addr) } else { None };
    if let Some(addr) = addr {
        snapshot.set_pc(addr);
    }

    snapshot.clear_trap_flag();
    if cmd == b's' {
        snapshot.set_trap_flag();
        ResumeAction::Step(addr)
    } else {
        ResumeAction::Continue(addr)
    }
}
