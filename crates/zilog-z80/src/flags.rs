//! Flag register bits and the lookup helpers built on them.

/// Sign (bit 7 of the result).
pub const SF: u8 = 0b1000_0000;

/// Zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented copy of result bit 5.
pub const YF: u8 = 0b0010_0000;

/// Half-carry out of bit 3 (bit 11 for 16-bit ops).
pub const HF: u8 = 0b0001_0000;

/// Undocumented copy of result bit 3.
pub const XF: u8 = 0b0000_1000;

/// Parity (logic ops) or overflow (arithmetic ops).
pub const PF: u8 = 0b0000_0100;

/// Set after a subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry.
pub const CF: u8 = 0b0000_0001;

/// True if `value` has an even number of set bits.
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones().is_multiple_of(2)
}

/// S, Z and the two undocumented bits for `value`.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let mut f = value & (SF | YF | XF);
    if value == 0 {
        f |= ZF;
    }
    f
}

/// [`sz53`] plus parity.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    if parity(value) { sz53(value) | PF } else { sz53(value) }
}
