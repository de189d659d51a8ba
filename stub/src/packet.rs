//! RSP packet framing. `$`<body>`#`<cs-hi><cs-lo>, checksum is the unsigned
//! 8-bit sum of body bytes mod 256, two lowercase hex digits.

use crate::hex;
use crate::transport::Transport;

/// At least twice the register payload plus command overhead.
pub const BUFMAX: usize = 400;

const DOLLAR: u8 = b'$';
const HASH: u8 = b'#';
const ACK: u8 = b'+';
const NAK: u8 = b'-';

/// Owns the inbound/outbound packet buffers. One instance lives for the
/// life of a debug session, process-global and locked resident when
/// embedded in a trap handler — but the type itself carries no global
/// state, so it can be driven directly in tests.
pub struct PacketIo {
    in_buf: [u8; BUFMAX],
}

impl PacketIo {
    pub const fn new() -> Self {
        Self {
            in_buf: [0; BUFMAX],
        }
    }

    /// Blocks until a well-formed, checksum-valid packet arrives, ACKing it
    /// and NAKing (and silently re-requesting) anything that doesn't check
    /// out. Strips the deprecated `XX:` sequence-id prefix if present,
    /// echoing `XX` back as the protocol requires. Returns the packet body.
    pub fn receive_packet<T: Transport>(&mut self, transport: &mut T) -> &[u8] {
        loop {
            // Discard bytes until '$' is seen.
            while transport.get_byte() != DOLLAR {}

            let mut checksum: u8 = 0;
            let mut count = 0usize;
            let body_complete = 'accumulate: loop {
                loop {
                    if count >= self.in_buf.len() {
                        break 'accumulate true;
                    }
                    let ch = transport.get_byte();
                    if ch == DOLLAR {
                        // Restart the body (step 3): a fresh '$' mid-body
                        // discards everything accumulated so far.
                        checksum = 0;
                        count = 0;
                        continue;
                    }
                    if ch == HASH {
                        break 'accumulate true;
                    }
                    checksum = checksum.wrapping_add(ch);
                    self.in_buf[count] = ch;
                    count += 1;
                }
            };
            if !body_complete {
                continue;
            }

            let cs_hi = hex::nibble_of(transport.get_byte());
            let cs_lo = hex::nibble_of(transport.get_byte());
            let claimed = if cs_hi >= 0 && cs_lo >= 0 {
                ((cs_hi as u8) << 4) | (cs_lo as u8)
            } else {
                // An unparseable checksum can never match; treat as mismatch.
                !checksum
            };

            if claimed != checksum {
                transport.put_byte(NAK);
                continue;
            }
            transport.put_byte(ACK);

            if count >= 3 && self.in_buf[2] == b':' {
                transport.put_byte(self.in_buf[0]);
                transport.put_byte(self.in_buf[1]);
                return &self.in_buf[3..count];
            }
            return &self.in_buf[..count];
        }
    }

    /// Frames and sends `body`, retransmitting (with no retry cap) until
    /// the host ACKs it.
    pub fn send_packet<T: Transport>(&mut self, transport: &mut T, body: &[u8]) {
        let checksum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        let mut cs_hex = [0u8; 2];
        hex::bytes_to_hex(core::slice::from_ref(&checksum), 1, &mut cs_hex);

        loop {
            transport.put_byte(DOLLAR);
            for &b in body {
                transport.put_byte(b);
            }
            transport.put_byte(HASH);
            transport.put_byte(cs_hex[0]);
            transport.put_byte(cs_hex[1]);

            if transport.get_byte() == ACK {
                return;
            }
        }
    }
}
