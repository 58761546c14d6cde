//! Pure ALU helpers. Each returns the result together with the new F.

#![allow(clippy::verbose_bit_mask)]

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

impl AluResult {
    const fn new(value: u8, flags: u8) -> Self {
        Self { value, flags }
    }
}

#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u16::from(carry);
    let wide = u16::from(a) + u16::from(b) + c;
    let value = wide as u8;
    let mut flags = sz53(value);
    if (a & 0x0F) as u16 + (b & 0x0F) as u16 + c > 0x0F {
        flags |= HF;
    }
    if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    AluResult::new(value, flags)
}

#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u16::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c as u8);
    let mut flags = sz53(value) | NF;
    if u16::from(a & 0x0F) < u16::from(b & 0x0F) + c {
        flags |= HF;
    }
    if (a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if u16::from(a) < u16::from(b) + c {
        flags |= CF;
    }
    AluResult::new(value, flags)
}

/// `CP`: flags of `a - b`, but X/Y come from the operand.
#[must_use]
pub fn cp8(a: u8, b: u8) -> u8 {
    (sub8(a, b, false).flags & !(YF | XF)) | (b & (YF | XF))
}

#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult::new(value, sz53p(value) | HF)
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult::new(value, sz53p(value))
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult::new(value, sz53p(value))
}

/// `INC r`. Carry is preserved from `old_flags`.
#[must_use]
pub fn inc8(v: u8, old_flags: u8) -> AluResult {
    let value = v.wrapping_add(1);
    let mut flags = sz53(value) | (old_flags & CF);
    if v & 0x0F == 0x0F {
        flags |= HF;
    }
    if v == 0x7F {
        flags |= PF;
    }
    AluResult::new(value, flags)
}

/// `DEC r`. Carry is preserved from `old_flags`.
#[must_use]
pub fn dec8(v: u8, old_flags: u8) -> AluResult {
    let value = v.wrapping_sub(1);
    let mut flags = sz53(value) | NF | (old_flags & CF);
    if v & 0x0F == 0 {
        flags |= HF;
    }
    if v == 0x80 {
        flags |= PF;
    }
    AluResult::new(value, flags)
}

/// Dispatch for the eight accumulator ops selected by opcode bits 5:3.
#[must_use]
pub fn accumulate(op: u8, a: u8, b: u8, flags: u8) -> AluResult {
    let carry = flags & CF != 0;
    match op & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => and8(a, b),
        5 => xor8(a, b),
        6 => or8(a, b),
        _ => AluResult::new(a, cp8(a, b)),
    }
}

/// CB-prefix shift/rotate selected by bits 5:3.
#[must_use]
pub fn shift(op: u8, v: u8, flags: u8) -> AluResult {
    let cin = flags & CF;
    let (value, cout) = match op & 7 {
        0 => (v.rotate_left(1), v >> 7),
        1 => (v.rotate_right(1), v & 1),
        2 => ((v << 1) | cin, v >> 7),
        3 => ((v >> 1) | (cin << 7), v & 1),
        4 => (v << 1, v >> 7),
        5 => ((v >> 1) | (v & 0x80), v & 1),
        // SLL: undocumented, shifts a one into bit 0.
        6 => ((v << 1) | 1, v >> 7),
        _ => (v >> 1, v & 1),
    };
    AluResult::new(value, sz53p(value) | cout)
}

/// RLCA/RRCA/RLA/RRA: like the CB forms but S, Z and P/V survive.
#[must_use]
pub fn rotate_a(op: u8, a: u8, flags: u8) -> AluResult {
    let r = shift(op, a, flags);
    AluResult::new(r.value, (flags & (SF | ZF | PF)) | (r.value & (YF | XF)) | (r.flags & CF))
}

/// `BIT n,r`. `xy` supplies the source of the undocumented X/Y bits.
#[must_use]
pub fn bit(n: u8, v: u8, xy: u8, flags: u8) -> u8 {
    let masked = v & (1 << n);
    let mut f = (flags & CF) | HF | (xy & (YF | XF));
    if masked == 0 {
        f |= ZF | PF;
    }
    if masked & 0x80 != 0 {
        f |= SF;
    }
    f
}

/// `ADD HL,rr`: only H, C and X/Y change.
#[must_use]
pub fn add16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;
    let mut f = (flags & (SF | ZF | PF)) | ((value >> 8) as u8 & (YF | XF));
    if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF {
        f |= HF;
    }
    if wide > 0xFFFF {
        f |= CF;
    }
    (value, f)
}

#[must_use]
pub fn adc16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let c = u32::from(flags & CF);
    let wide = u32::from(a) + u32::from(b) + c;
    let value = wide as u16;
    let hi = (value >> 8) as u8;
    let mut f = hi & (SF | YF | XF);
    if value == 0 {
        f |= ZF;
    }
    if u32::from(a & 0x0FFF) + u32::from(b & 0x0FFF) + c > 0x0FFF {
        f |= HF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0 {
        f |= PF;
    }
    if wide > 0xFFFF {
        f |= CF;
    }
    (value, f)
}

#[must_use]
pub fn sbc16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let c = u32::from(flags & CF);
    let value = (u32::from(a).wrapping_sub(u32::from(b)).wrapping_sub(c)) as u16;
    let hi = (value >> 8) as u8;
    let mut f = (hi & (SF | YF | XF)) | NF;
    if value == 0 {
        f |= ZF;
    }
    if u32::from(a & 0x0FFF) < u32::from(b & 0x0FFF) + c {
        f |= HF;
    }
    if (a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0 {
        f |= PF;
    }
    if u32::from(a) < u32::from(b) + c {
        f |= CF;
    }
    (value, f)
}

#[must_use]
pub fn daa(a: u8, flags: u8) -> AluResult {
    let mut adjust = 0u8;
    let mut carry = flags & CF;
    if flags & HF != 0 || a & 0x0F > 9 {
        adjust |= 0x06;
    }
    if carry != 0 || a > 0x99 {
        adjust |= 0x60;
        carry = CF;
    }
    let subtract = flags & NF != 0;
    let value = if subtract { a.wrapping_sub(adjust) } else { a.wrapping_add(adjust) };
    let half = if subtract {
        flags & HF != 0 && a & 0x0F < 6
    } else {
        a & 0x0F > 9
    };
    let mut f = sz53p(value) | carry | (flags & NF);
    if half {
        f |= HF;
    }
    AluResult::new(value, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_overflow_and_half_carry() {
        let r = add8(0x7F, 0x01, false);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags, SF | HF | PF);
    }

    #[test]
    fn sub_borrow() {
        let r = sub8(0x00, 0x01, false);
        assert_eq!(r.value, 0xFF);
        assert_eq!(r.flags & (CF | NF | HF), CF | NF | HF);
    }

    #[test]
    fn cp_takes_xy_from_operand() {
        let f = cp8(0x00, 0x28);
        assert_eq!(f & (YF | XF), YF | XF);
    }

    #[test]
    fn inc_dec_preserve_carry() {
        assert_eq!(inc8(0x7F, CF).flags & (PF | CF), PF | CF);
        assert_eq!(dec8(0x01, CF).flags & (ZF | CF | NF), ZF | CF | NF);
    }

    #[test]
    fn daa_after_add() {
        // 0x15 + 0x27 = 0x3C, adjusted to 0x42.
        let sum = add8(0x15, 0x27, false);
        assert_eq!(daa(sum.value, sum.flags).value, 0x42);
    }

    #[test]
    fn daa_after_sub() {
        // 0x42 - 0x15 = 0x2D, adjusted to 0x27.
        let diff = sub8(0x42, 0x15, false);
        assert_eq!(daa(diff.value, diff.flags).value, 0x27);
    }

    #[test]
    fn sbc16_to_zero() {
        let (v, f) = sbc16(0x1000, 0x0FFF, CF);
        assert_eq!(v, 0);
        assert_ne!(f & ZF, 0);
    }

    #[test]
    fn sll_sets_bit_zero() {
        assert_eq!(shift(6, 0x80, 0).value, 0x01);
        assert_eq!(shift(6, 0x80, 0).flags & CF, CF);
    }
}
