//! Sequence number arithmetic.
//!
//! A stream position is a 64 bit count (`u64`) in which SYN occupies
//! index 0 and FIN occupies the slot after the last payload byte. On the
//! wire only the low 32 bits travel, offset by the initial sequence
//! number. All conversions between the two domains live here; no other
//! module performs modular arithmetic on sequence numbers.

const SEQNO_SPACE: u64 = 1 << 32;

/// Maps an absolute 64 bit sequence number onto the 32 bit wire domain.
#[must_use]
pub fn wrap(abs: u64, isn: u32) -> u32 {
    isn.wrapping_add(abs as u32)
}

/// Inverts [`wrap`]: of all absolute values that map onto `wrapped`,
/// returns the one closest to `checkpoint` (ties resolve downwards, but
/// never below zero).
#[must_use]
pub fn unwrap(wrapped: u32, isn: u32, checkpoint: u64) -> u64 {
    let offset = u64::from(wrapped.wrapping_sub(isn));
    let candidate = (checkpoint - checkpoint % SEQNO_SPACE) + offset;

    if checkpoint > candidate && checkpoint - candidate > SEQNO_SPACE / 2 {
        candidate + SEQNO_SPACE
    } else if candidate >= checkpoint + SEQNO_SPACE / 2 && candidate >= SEQNO_SPACE {
        candidate - SEQNO_SPACE
    } else {
        candidate
    }
}
