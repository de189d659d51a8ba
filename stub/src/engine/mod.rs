//! Component E: the RSP command dispatcher. Owns the per-session packet
//! buffers and the "last stop signal" the `?` command reports, and is the
//! only component that talks to both the packet layer (D) and the register
//! snapshot (§3) at once.

mod mem;
mod query;
mod regs;
mod run_control;

use crate::packet::{PacketIo, BUFMAX};
use crate::signal::vector_to_signal;
use crate::snapshot::{RegIndex, Snapshot, REG_NAMES};
use crate::transport::Transport;
use snafu::Snafu;

pub use run_control::ResumeAction;

/// Host-visible command error taxonomy. Converted to an `Ennn` string only
/// at the point a reply is built; nothing upstream of
/// [`Engine::service_exception`] sees these as `Ennn` text.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[snafu(display("command syntax error"))]
    Syntax,
    #[snafu(display("write command syntax error"))]
    WriteSyntax,
    #[snafu(display("memory access fault during probe"))]
    MemoryFault,
    #[snafu(display("register index out of range"))]
    RegisterOutOfRange,
}

impl CommandError {
    fn code(self) -> &'static [u8] {
        match self {
            CommandError::Syntax | CommandError::RegisterOutOfRange => b"E01",
            CommandError::WriteSyntax => b"E02",
            CommandError::MemoryFault => b"E03",
        }
    }
}

/// Accumulates an outbound packet body: one bounded buffer reused across
/// commands instead of a separate allocation per reply.
pub(crate) struct ReplyBuilder {
    buf: [u8; BUFMAX],
    len: usize,
}

impl ReplyBuilder {
    fn new() -> Self {
        Self {
            buf: [0; BUFMAX],
            len: 0,
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
    }

    fn push_error(&mut self, err: CommandError) {
        self.push_bytes(err.code());
    }

    fn push_hex_byte(&mut self, byte: u8) {
        let mut hex = [0u8; 2];
        crate::hex::bytes_to_hex(core::slice::from_ref(&byte), 1, &mut hex);
        self.push_bytes(&hex);
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Drives one exception-to-resume cycle. One instance is reused across the
/// life of the debug session; its buffers are process-global by design.
pub struct Engine {
    packets: PacketIo,
    last_signal: u8,
}

impl Engine {
    pub const fn new() -> Self {
        Self {
            packets: PacketIo::new(),
            last_signal: 0,
        }
    }

    /// Entry point called by the trap glue once the snapshot has been
    /// populated from the saved architectural state. Sends the initial
    /// stop reply, then services commands until a run-control command (`c`
    /// or `s`) tells the debuggee to resume.
    pub fn service_exception<T: Transport>(
        &mut self,
        transport: &mut T,
        snapshot: &mut Snapshot,
        vector: u32,
    ) -> ResumeAction {
        self.last_signal = vector_to_signal(vector);
        self.trace_entry(vector, snapshot);
        self.send_stop_reply(transport);

        loop {
            let mut cmd_buf = [0u8; BUFMAX];
            let n = {
                let body = self.packets.receive_packet(transport);
                let n = body.len();
                cmd_buf[..n].copy_from_slice(body);
                n
            };
            if n == 0 {
                // An empty body (e.g. a bare "$#00") gets an empty reply.
                self.packets.send_packet(transport, &[]);
                continue;
            }

            let cmd = cmd_buf[0];
            let args = &cmd_buf[1..n];
            let mut reply = ReplyBuilder::new();

            match cmd {
                b'?' => self.push_stop_reply(&mut reply),
                b'g' => regs::read_all(snapshot, &mut reply),
                b'G' => regs::write_all(snapshot, args, &mut reply),
                b'P' => match regs::write_one(snapshot, args) {
                    Ok(()) => reply.push_bytes(b"OK"),
                    Err(e) => reply.push_error(e),
                },
                b'm' => mem::read(args, &mut reply),
                b'M' => mem::write(args, &mut reply),
                b'c' | b's' => {
                    let action = run_control::resume(cmd, args, snapshot);
                    log::debug!("resuming: {action:?}");
                    return action;
                }
                b'k' => {} // accepted silently; empty reply below
                b'H' => reply.push_bytes(b"OK"),
                b'd' => {
                    crate::logging::toggle_verbose();
                } // empty reply
                b'q' => query::handle(args, &mut reply),
                _ => {
                    log::trace!("unrecognized command {:#x}", cmd);
                }
            }

            self.packets.send_packet(transport, reply.as_slice());
        }
    }

    fn push_stop_reply(&self, reply: &mut ReplyBuilder) {
        reply.push_bytes(b"S");
        reply.push_hex_byte(self.last_signal);
    }

    fn send_stop_reply<T: Transport>(&mut self, transport: &mut T) {
        let mut reply = ReplyBuilder::new();
        self.push_stop_reply(&mut reply);
        self.packets.send_packet(transport, reply.as_slice());
    }

    fn trace_entry(&self, vector: u32, snapshot: &Snapshot) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        log::trace!(
            "vector={} pc={:#010x} ps={:#010x}",
            vector,
            snapshot.pc(),
            snapshot.get(RegIndex::Ps)
        );
        for (name, value) in REG_NAMES.iter().zip(snapshot.regs.iter()) {
            log::trace!("{name}: {value:#010x}");
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
