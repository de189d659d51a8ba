//! Vector -> POSIX-like signal mapping. Fixed table; unmapped vectors
//! default to `SIGEMT`-ish 7.

/// Maps a CPU exception vector to the signal number reported in `S`/`?`
/// replies. The `302` case has no discoverable justification beyond sharing
/// vector 3's signal; it is kept for bit-compatibility with hosts that may
/// depend on it.
pub fn vector_to_signal(vector: u32) -> u8 {
    match vector {
        0 => 8,           // divide-by-zero -> SIGFPE
        1 => 5,           // debug/single-step -> SIGTRAP
        3 | 302 => 5,     // breakpoint -> SIGTRAP
        4 => 16,          // overflow (into) -> SIGSTKFLT-ish
        5 => 16,          // bound -> same bucket as overflow
        6 => 4,           // invalid opcode -> SIGILL
        7 => 8,           // coprocessor not available -> SIGFPE
        8 => 7,           // double fault -> SIGEMT
        9..=14 => 11,     // segment/page faults, incl. GP and #PF -> SIGSEGV
        16 => 7,          // coprocessor error -> SIGEMT
        _ => 7,
    }
}
