//! `m`/`M`: debuggee memory read/write, routed through the fault-tolerant
//! probe so a bad address produces `E03` instead of taking down the stub.

use super::{CommandError, ReplyBuilder};
use crate::hex;
use crate::probe;

/// Bounds how much a single `m`/`M` may move so the hex-encoded reply
/// always fits in one packet.
const MAX_CHUNK: usize = crate::packet::BUFMAX / 2 - 8;

fn parse_addr_len(args: &[u8]) -> Option<(u32, u32)> {
    let (addr, consumed) = hex::parse_hex_prefix(args);
    if consumed == 0 {
        return None;
    }
    let rest = &args[consumed..];
    if rest.first() != Some(&b',') {
        return None;
    }
    let (len, consumed2) = hex::parse_hex_prefix(&rest[1..]);
    if consumed2 == 0 {
        return None;
    }
    Some((addr, len))
}

pub(super) fn read(args: &[u8], reply: &mut ReplyBuilder) {
    let Some((addr, len)) = parse_addr_len(args) else {
        reply.push_error(CommandError::Syntax);
        return;
    };
    let len = len as usize;
    if len > MAX_CHUNK {
        reply.push_error(CommandError::Syntax);
        return;
    }
    if len == 0 {
        return;
    }

    let mut buf = [0u8; MAX_CHUNK];
    let n = probe::probe_read(addr as usize, len, &mut buf, true);
    if n < len {
        reply.push_error(CommandError::MemoryFault);
        return;
    }
    let mut hex_buf = [0u8; MAX_CHUNK * 2];
    let hn = hex::bytes_to_hex(&buf, n, &mut hex_buf);
    reply.push_bytes(&hex_buf[..hn]);
}

pub(super) fn write(args: &[u8], reply: &mut ReplyBuilder) {
    let Some((addr, len)) = parse_addr_len(args) else {
        reply.push_error(CommandError::Syntax);
        return;
    };
    let Some(colon) = args.iter().position(|&b| b == b':') else {
        reply.push_error(CommandError::WriteSyntax);
        return;
    };
    let len = len as usize;
    if len > MAX_CHUNK {
        reply.push_error(CommandError::Syntax);
        return;
    }
    let data_hex = &args[colon + 1..];

    let mut buf = [0u8; MAX_CHUNK];
    hex::hex_to_bytes(data_hex, len, &mut buf);

    let n = probe::probe_write(addr as usize, len, &buf, true);
    if n < len {
        reply.push_error(CommandError::MemoryFault);
        return;
    }
    reply.push_bytes(b"OK");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_round_trips_valid_memory() {
        let data = [0xde_u8, 0xad, 0xbe, 0xef];
        let addr = data.as_ptr() as usize;
        let args = format!("{addr:x},4");
        let mut reply = ReplyBuilder::new();
        read(args.as_bytes(), &mut reply);
        assert_eq!(reply.as_slice(), b"deadbeef");
    }

    #[test]
    fn read_with_bad_syntax_is_e01() {
        let mut reply = ReplyBuilder::new();
        read(b"not-hex", &mut reply);
        assert_eq!(reply.as_slice(), b"E01");
    }

    #[test]
    fn write_then_read_back() {
        let mut data = [0u8; 4];
        let addr = data.as_mut_ptr() as usize;
        let args = format!("{addr:x},4:78563412");
        let mut reply = ReplyBuilder::new();
        write(args.as_bytes(), &mut reply);
        assert_eq!(reply.as_slice(), b"OK");
        assert_eq!(data, [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn write_missing_colon_is_e02() {
        let mut reply = ReplyBuilder::new();
        write(b"1000,4", &mut reply);
        assert_eq!(reply.as_slice(), b"E02");
    }

    #[test]
    fn zero_length_read_is_an_empty_reply() {
        let mut reply = ReplyBuilder::new();
        read(b"1000,0", &mut reply);
        assert_eq!(reply.as_slice(), b"");
    }

    #[test]
    fn read_past_max_chunk_is_e01_not_a_truncated_reply() {
        let args = format!("1000,{:x}", MAX_CHUNK + 1);
        let mut reply = ReplyBuilder::new();
        read(args.as_bytes(), &mut reply);
        assert_eq!(reply.as_slice(), b"E01");
    }

    #[test]
    fn write_past_max_chunk_is_e01_not_a_silent_drop() {
        let args = format!("1000,{:x}:00", MAX_CHUNK + 1);
        let mut reply = ReplyBuilder::new();
        write(args.as_bytes(), &mut reply);
        assert_eq!(reply.as_slice(), b"E01");
    }
}
