//! The 16-word register snapshot. Index order and width are protocol
//! visible: `g`/`G`/`P` depend on this layout byte-for-byte.

use crate::hex;
use static_assertions::const_assert_eq;

/// Number of 32-bit registers in a snapshot.
pub const NUM_REGS: usize = 16;

/// Size in bytes of the `g`/`G` register payload (16 words x 4 bytes).
pub const NUM_REG_BYTES: usize = NUM_REGS * 4;

/// Index of each register within [`Snapshot`]. Order is load-bearing: it is
/// the exact order GDB expects on the wire.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegIndex {
    Eax = 0,
    Ecx = 1,
    Edx = 2,
    Ebx = 3,
    Esp = 4,
    Ebp = 5,
    Esi = 6,
    Edi = 7,
    Pc = 8,
    Ps = 9,
    Cs = 10,
    Ss = 11,
    Ds = 12,
    Es = 13,
    Fs = 14,
    Gs = 15,
}

pub const REG_NAMES: [&str; NUM_REGS] = [
    "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "pc", "ps", "cs", "ss", "ds", "es",
    "fs", "gs",
];

bitflags::bitflags! {
    /// The EFLAGS bits this stub names explicitly; everything else in the
    /// word is carried through untouched by the helpers below rather than
    /// represented here.
    pub struct EFlags: u32 {
        const CARRY = 1 << 0;
        const ZERO = 1 << 6;
        const TRAP = 1 << 8;
        const INTERRUPT = 1 << 9;
    }
}

/// The architectural register image captured on exception entry and
/// committed back on resume. Segment registers occupy a full 32-bit slot;
/// the upper 16 bits are undefined on read and ignored on write.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub regs: [u32; NUM_REGS],
}
const_assert_eq!(core::mem::size_of::<Snapshot>(), NUM_REG_BYTES);

impl Snapshot {
    pub const fn new() -> Self {
        Self {
            regs: [0; NUM_REGS],
        }
    }

    pub fn get(&self, index: RegIndex) -> u32 {
        self.regs[index as usize]
    }

    pub fn set(&mut self, index: RegIndex, value: u32) {
        self.regs[index as usize] = value;
    }

    pub fn pc(&self) -> u32 {
        self.get(RegIndex::Pc)
    }

    pub fn set_pc(&mut self, value: u32) {
        self.set(RegIndex::Pc, value);
    }

    pub fn trap_flag_set(&self) -> bool {
        self.get(RegIndex::Ps) & EFlags::TRAP.bits() != 0
    }

    pub fn clear_trap_flag(&mut self) {
        self.regs[RegIndex::Ps as usize] &= !EFlags::TRAP.bits();
    }

    pub fn set_trap_flag(&mut self) {
        self.regs[RegIndex::Ps as usize] |= EFlags::TRAP.bits();
    }

    /// Serializes the snapshot as the 128 lowercase hex characters the `g`
    /// reply body consists of: each word little-endian, in register order.
    pub fn to_hex(&self, out: &mut [u8]) -> usize {
        let mut bytes = [0u8; NUM_REG_BYTES];
        for (i, word) in self.regs.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        hex::bytes_to_hex(&bytes, NUM_REG_BYTES, out)
    }

    /// Parses the 128-hex-character `G` payload, or a prefix of it — a
    /// short write updates only the registers the payload actually covers
    /// and leaves the rest untouched, rather than treating a short write as
    /// an error.
    pub fn from_hex(&mut self, src: &[u8]) {
        let mut bytes = [0u8; NUM_REG_BYTES];
        let n = hex::hex_to_bytes(src, NUM_REG_BYTES, &mut bytes);
        let words = n / 4;
        for i in 0..words {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            self.regs[i] = u32::from_le_bytes(word);
        }
    }

    /// Writes a single register from its 8-hex-character little-endian
    /// encoding (the `P` command's `<hex4>` operand, 4 bytes = 8 chars).
    pub fn set_from_hex(&mut self, index: usize, src: &[u8]) -> bool {
        if index >= NUM_REGS {
            return false;
        }
        let mut bytes = [0u8; 4];
        hex::hex_to_bytes(src, 4, &mut bytes);
        self.regs[index] = u32::from_le_bytes(bytes);
        true
    }
}
