//! ED-prefixed opcodes. Undefined slots behave as an 8 T-state NOP.

use emu_core::Bus;

use super::{Index, Z80};
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, parity, sz53, sz53p};

/// Interrupt mode selected by ED opcode bits 5:3.
const IM_TABLE: [u8; 8] = [0, 0, 1, 2, 0, 0, 1, 2];

impl Z80 {
    pub(crate) fn execute_ed<B: Bus>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        let p = y >> 1;
        let q = y & 1;

        match (x, z) {
            (1, 0) => {
                let port = self.regs.bc();
                let v = bus.iorq_rd(port);
                self.regs.wz = port.wrapping_add(1);
                if y != 6 {
                    self.set_reg8(y, Index::Hl, v);
                }
                self.regs.f = sz53p(v) | (self.regs.f & CF);
                12
            }
            (1, 1) => {
                let port = self.regs.bc();
                let v = if y == 6 { 0 } else { self.reg8(y, Index::Hl) };
                bus.iorq_wr(port, v);
                self.regs.wz = port.wrapping_add(1);
                12
            }
            (1, 2) => {
                let hl = self.regs.hl();
                let rr = self.reg16(p, Index::Hl);
                let (v, f) = if q == 0 {
                    alu::sbc16(hl, rr, self.regs.f)
                } else {
                    alu::adc16(hl, rr, self.regs.f)
                };
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(v);
                self.regs.f = f;
                15
            }
            (1, 3) => {
                let nn = self.imm16(bus);
                if q == 0 {
                    self.write16(bus, nn, self.reg16(p, Index::Hl));
                } else {
                    let v = self.read16(bus, nn);
                    self.set_reg16(p, Index::Hl, v);
                }
                self.regs.wz = nn.wrapping_add(1);
                20
            }
            (1, 4) => {
                let r = alu::sub8(0, self.regs.a, false);
                self.regs.a = r.value;
                self.regs.f = r.flags;
                8
            }
            (1, 5) => {
                // RETN and RETI both restore IFF1 from IFF2.
                self.regs.iff1 = self.regs.iff2;
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
                14
            }
            (1, 6) => {
                self.regs.im = IM_TABLE[usize::from(y)];
                8
            }
            (1, 7) => self.execute_ed_misc(bus, y),
            (2, 0..=3) if y >= 4 => self.execute_block(bus, y, z),
            _ => 8,
        }
    }

    /// LD I,A / LD R,A / LD A,I / LD A,R / RRD / RLD.
    fn execute_ed_misc<B: Bus>(&mut self, bus: &mut B, y: u8) -> u32 {
        match y {
            0 => {
                self.regs.i = self.regs.a;
                9
            }
            1 => {
                self.regs.r = self.regs.a;
                9
            }
            2 | 3 => {
                let v = if y == 2 { self.regs.i } else { self.regs.r };
                self.regs.a = v;
                let iff = if self.regs.iff2 { PF } else { 0 };
                self.regs.f = sz53(v) | iff | (self.regs.f & CF);
                9
            }
            4 | 5 => {
                let hl = self.regs.hl();
                let m = bus.mreq_rd(hl);
                let a = self.regs.a;
                let (new_a, new_m) = if y == 4 {
                    ((a & 0xF0) | (m & 0x0F), (a << 4) | (m >> 4))
                } else {
                    ((a & 0xF0) | (m >> 4), (m << 4) | (a & 0x0F))
                };
                bus.mreq_wr(hl, new_m);
                self.regs.a = new_a;
                self.regs.f = sz53p(new_a) | (self.regs.f & CF);
                self.regs.wz = hl.wrapping_add(1);
                18
            }
            _ => 8,
        }
    }

    /// LDI/CPI/INI/OUTI and their decrementing and repeating forms.
    fn execute_block<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8) -> u32 {
        let decrement = y & 1 != 0;
        let repeat = y >= 6;
        let delta: u16 = if decrement { 0xFFFF } else { 1 };
        let hl = self.regs.hl();

        let again = match z {
            0 => {
                let v = bus.mreq_rd(hl);
                let de = self.regs.de();
                bus.mreq_wr(de, v);
                self.regs.set_hl(hl.wrapping_add(delta));
                self.regs.set_de(de.wrapping_add(delta));
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                let n = v.wrapping_add(self.regs.a);
                let mut f = (self.regs.f & (SF | ZF | CF)) | (n & XF);
                if n & 0x02 != 0 {
                    f |= YF;
                }
                if bc != 0 {
                    f |= PF;
                }
                self.regs.f = f;
                bc != 0
            }
            1 => {
                let v = bus.mreq_rd(hl);
                let r = alu::sub8(self.regs.a, v, false);
                self.regs.set_hl(hl.wrapping_add(delta));
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                self.regs.wz = self.regs.wz.wrapping_add(delta);
                let half = r.flags & HF;
                let n = r.value.wrapping_sub(u8::from(half != 0));
                let mut f = (self.regs.f & CF) | NF | half | (sz53(r.value) & (SF | ZF)) | (n & XF);
                if n & 0x02 != 0 {
                    f |= YF;
                }
                if bc != 0 {
                    f |= PF;
                }
                self.regs.f = f;
                bc != 0 && r.value != 0
            }
            2 => {
                let port = self.regs.bc();
                let v = bus.iorq_rd(port);
                bus.mreq_wr(hl, v);
                self.regs.wz = port.wrapping_add(delta);
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.regs.set_hl(hl.wrapping_add(delta));
                let k = u16::from(v) + u16::from(self.regs.c.wrapping_add(delta as u8));
                self.block_io_flags(v, k);
                self.regs.b != 0
            }
            _ => {
                let v = bus.mreq_rd(hl);
                self.regs.b = self.regs.b.wrapping_sub(1);
                let port = self.regs.bc();
                bus.iorq_wr(port, v);
                self.regs.wz = port.wrapping_add(delta);
                self.regs.set_hl(hl.wrapping_add(delta));
                let k = u16::from(v) + u16::from(self.regs.l);
                self.block_io_flags(v, k);
                self.regs.b != 0
            }
        };

        if repeat && again {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            if z < 2 {
                self.regs.wz = self.regs.pc.wrapping_add(1);
            }
            21
        } else {
            16
        }
    }

    fn block_io_flags(&mut self, v: u8, k: u16) {
        let b = self.regs.b;
        let mut f = sz53(b);
        if v & 0x80 != 0 {
            f |= NF;
        }
        if k > 0xFF {
            f |= HF | CF;
        }
        if parity((k as u8 & 7) ^ b) {
            f |= PF;
        }
        self.regs.f = f;
    }
}
