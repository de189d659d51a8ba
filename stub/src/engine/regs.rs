//! `g`/`G`/`P`: bulk and single-register transfer.

use super::{CommandError, ReplyBuilder};
use crate::hex;
use crate::snapshot::Snapshot;

pub(super) fn read_all(snapshot: &Snapshot, reply: &mut ReplyBuilder) {
    let mut hex_buf = [0u8; crate::snapshot::NUM_REG_BYTES * 2];
    let n = snapshot.to_hex(&mut hex_buf);
    reply.push_bytes(&hex_buf[..n]);
}

pub(super) fn write_all(snapshot: &mut Snapshot, args: &[u8], reply: &mut ReplyBuilder) {
    snapshot.from_hex(args);
    reply.push_bytes(b"OK");
}

/// `P<n>=<r>`: set register `n` (hex) to the little-endian hex value `r`.
pub(super) fn write_one(snapshot: &mut Snapshot, args: &[u8]) -> Result<(), CommandError> {
    let (index, consumed) = hex::parse_hex_prefix(args);
    if consumed == 0 || args.get(consumed) != Some(&b'=') {
        return Err(CommandError::Syntax);
    }
    let index = index as usize;
    if index >= crate::snapshot::NUM_REGS {
        return Err(CommandError::RegisterOutOfRange);
    }
    snapshot.set_from_hex(index, &args[consumed + 1..]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RegIndex;

    #[test]
    fn read_all_emits_full_snapshot_hex() {
        let snapshot = Snapshot::new();
        let mut reply = ReplyBuilder::new();
        read_all(&snapshot, &mut reply);
        assert_eq!(reply.as_slice().len(), crate::snapshot::NUM_REG_BYTES * 2);
    }

    #[test]
    fn write_one_sets_the_target_register() {
        let mut snapshot = Snapshot::new();
        write_one(&mut snapshot, b"0=78563412").unwrap();
        assert_eq!(snapshot.get(RegIndex::Eax), 0x1234_5678);
    }

    #[test]
    fn write_one_rejects_out_of_range_index() {
        let mut snapshot = Snapshot::new();
        let err = write_one(&mut snapshot, b"99=78563412").unwrap_err();
        assert_eq!(err, CommandError::RegisterOutOfRange);
    }

    #[test]
    fn write_one_rejects_missing_equals() {
        let mut snapshot = Snapshot::new();
        let err = write_one(&mut snapshot, b"0:78563412").unwrap_err();
        assert_eq!(err, CommandError::Syntax);
    }
}
