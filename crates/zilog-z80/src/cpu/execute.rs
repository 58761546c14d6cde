//! Unprefixed opcodes, decoded by the x/y/z/p/q bit fields.

use emu_core::Bus;

use super::{Index, Z80};
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

impl Z80 {
    /// Execute `opcode` with HL optionally replaced by IX/IY.
    /// Returns the T-states spent, prefix fetches included.
    pub(crate) fn execute<B: Bus>(&mut self, bus: &mut B, opcode: u8, idx: Index) -> u32 {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        let p = y >> 1;
        let q = y & 1;
        // Extra cost of an (IX+d) operand over (HL).
        let disp = if idx == Index::Hl { 0 } else { 8 };

        match x {
            0 => match z {
                0 => match y {
                    0 => 4,
                    1 => {
                        self.regs.swap_af();
                        4
                    }
                    2 => {
                        let d = self.imm8(bus) as i8;
                        self.regs.b = self.regs.b.wrapping_sub(1);
                        if self.regs.b == 0 {
                            8
                        } else {
                            self.jump_relative(d);
                            13
                        }
                    }
                    3 => {
                        let d = self.imm8(bus) as i8;
                        self.jump_relative(d);
                        12
                    }
                    _ => {
                        let d = self.imm8(bus) as i8;
                        if self.condition(y - 4) {
                            self.jump_relative(d);
                            12
                        } else {
                            7
                        }
                    }
                },
                1 if q == 0 => {
                    let nn = self.imm16(bus);
                    self.set_reg16(p, idx, nn);
                    10
                }
                1 => {
                    let hl = self.index_reg(idx);
                    let (v, f) = alu::add16(hl, self.reg16(p, idx), self.regs.f);
                    self.regs.wz = hl.wrapping_add(1);
                    self.set_index_reg(idx, v);
                    self.regs.f = f;
                    11
                }
                2 => self.load_indirect(bus, p, q, idx),
                3 => {
                    let v = self.reg16(p, idx);
                    let v = if q == 0 { v.wrapping_add(1) } else { v.wrapping_sub(1) };
                    self.set_reg16(p, idx, v);
                    6
                }
                4 | 5 => {
                    let step = if z == 4 { alu::inc8 } else { alu::dec8 };
                    if y == 6 {
                        let addr = self.operand_addr(bus, idx);
                        let r = step(bus.mreq_rd(addr), self.regs.f);
                        bus.mreq_wr(addr, r.value);
                        self.regs.f = r.flags;
                        11 + disp
                    } else {
                        let r = step(self.reg8(y, idx), self.regs.f);
                        self.set_reg8(y, idx, r.value);
                        self.regs.f = r.flags;
                        4
                    }
                }
                6 => {
                    if y == 6 {
                        let addr = self.operand_addr(bus, idx);
                        let n = self.imm8(bus);
                        bus.mreq_wr(addr, n);
                        if idx == Index::Hl { 10 } else { 15 }
                    } else {
                        let n = self.imm8(bus);
                        self.set_reg8(y, idx, n);
                        7
                    }
                }
                _ => {
                    self.accumulator_misc(y);
                    4
                }
            },
            1 => {
                if y == 6 && z == 6 {
                    self.regs.halted = true;
                    4
                } else if z == 6 {
                    let addr = self.operand_addr(bus, idx);
                    let v = bus.mreq_rd(addr);
                    self.set_reg8(y, Index::Hl, v);
                    7 + disp
                } else if y == 6 {
                    let addr = self.operand_addr(bus, idx);
                    bus.mreq_wr(addr, self.reg8(z, Index::Hl));
                    7 + disp
                } else {
                    let v = self.reg8(z, idx);
                    self.set_reg8(y, idx, v);
                    4
                }
            }
            2 => {
                let (operand, cycles) = if z == 6 {
                    let addr = self.operand_addr(bus, idx);
                    (bus.mreq_rd(addr), 7 + disp)
                } else {
                    (self.reg8(z, idx), 4)
                };
                self.accumulate(y, operand);
                cycles
            }
            _ => self.execute_x3(bus, opcode, idx),
        }
    }

    fn execute_x3<B: Bus>(&mut self, bus: &mut B, opcode: u8, idx: Index) -> u32 {
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        let p = y >> 1;
        let q = y & 1;

        match z {
            0 => {
                if self.condition(y) {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    11
                } else {
                    5
                }
            }
            1 if q == 0 => {
                let v = self.pop(bus);
                if p == 3 {
                    self.regs.set_af(v);
                } else {
                    self.set_reg16(p, idx, v);
                }
                10
            }
            1 => match p {
                0 => {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    10
                }
                1 => {
                    self.regs.swap_main();
                    4
                }
                2 => {
                    self.regs.pc = self.index_reg(idx);
                    4
                }
                _ => {
                    self.regs.sp = self.index_reg(idx);
                    6
                }
            },
            2 => {
                let nn = self.imm16(bus);
                self.regs.wz = nn;
                if self.condition(y) {
                    self.regs.pc = nn;
                }
                10
            }
            3 => match y {
                0 => {
                    let nn = self.imm16(bus);
                    self.regs.pc = nn;
                    self.regs.wz = nn;
                    10
                }
                1 => {
                    if idx == Index::Hl {
                        let op = self.fetch_opcode(bus);
                        self.execute_cb(bus, op)
                    } else {
                        self.execute_indexed_cb(bus, idx)
                    }
                }
                2 => {
                    let n = self.imm8(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    bus.iorq_wr(port, self.regs.a);
                    self.regs.wz = u16::from(self.regs.a) << 8 | u16::from(n.wrapping_add(1));
                    11
                }
                3 => {
                    let n = self.imm8(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    self.regs.a = bus.iorq_rd(port);
                    self.regs.wz = port.wrapping_add(1);
                    11
                }
                4 => {
                    let sp = self.regs.sp;
                    let v = self.read16(bus, sp);
                    self.write16(bus, sp, self.index_reg(idx));
                    self.set_index_reg(idx, v);
                    self.regs.wz = v;
                    19
                }
                5 => {
                    let de = self.regs.de();
                    self.regs.set_de(self.regs.hl());
                    self.regs.set_hl(de);
                    4
                }
                6 => {
                    self.regs.iff1 = false;
                    self.regs.iff2 = false;
                    4
                }
                _ => {
                    self.regs.iff1 = true;
                    self.regs.iff2 = true;
                    self.ei_delay = true;
                    4
                }
            },
            4 => {
                let nn = self.imm16(bus);
                self.regs.wz = nn;
                if self.condition(y) {
                    self.push(bus, self.regs.pc);
                    self.regs.pc = nn;
                    17
                } else {
                    10
                }
            }
            5 if q == 0 => {
                let v = if p == 3 { self.regs.af() } else { self.reg16(p, idx) };
                self.push(bus, v);
                11
            }
            5 => match p {
                0 => {
                    let nn = self.imm16(bus);
                    self.push(bus, self.regs.pc);
                    self.regs.pc = nn;
                    self.regs.wz = nn;
                    17
                }
                1 => self.index_prefix(bus, Index::Ix),
                2 => {
                    let op = self.fetch_opcode(bus);
                    self.execute_ed(bus, op)
                }
                _ => self.index_prefix(bus, Index::Iy),
            },
            6 => {
                let n = self.imm8(bus);
                self.accumulate(y, n);
                7
            }
            _ => {
                self.push(bus, self.regs.pc);
                self.regs.pc = u16::from(y) * 8;
                self.regs.wz = self.regs.pc;
                11
            }
        }
    }

    /// DD/FD prefix. A prefix followed by another DD/FD costs 4 T-states
    /// on its own; PC is left on the next prefix, which starts a new step.
    fn index_prefix<B: Bus>(&mut self, bus: &mut B, idx: Index) -> u32 {
        if matches!(bus.mreq_rd(self.regs.pc), 0xDD | 0xFD) {
            return 4;
        }
        let op = self.fetch_opcode(bus);
        4 + self.execute(bus, op, idx)
    }

    /// The x=0, z=2 group: loads through BC, DE or an absolute address.
    fn load_indirect<B: Bus>(&mut self, bus: &mut B, p: u8, q: u8, idx: Index) -> u32 {
        match (p, q) {
            (0 | 1, 0) => {
                let addr = if p == 0 { self.regs.bc() } else { self.regs.de() };
                bus.mreq_wr(addr, self.regs.a);
                self.regs.wz = u16::from(self.regs.a) << 8 | (addr.wrapping_add(1) & 0xFF);
                7
            }
            (0 | 1, _) => {
                let addr = if p == 0 { self.regs.bc() } else { self.regs.de() };
                self.regs.a = bus.mreq_rd(addr);
                self.regs.wz = addr.wrapping_add(1);
                7
            }
            (2, 0) => {
                let nn = self.imm16(bus);
                self.write16(bus, nn, self.index_reg(idx));
                self.regs.wz = nn.wrapping_add(1);
                16
            }
            (2, _) => {
                let nn = self.imm16(bus);
                let v = self.read16(bus, nn);
                self.set_index_reg(idx, v);
                self.regs.wz = nn.wrapping_add(1);
                16
            }
            (_, 0) => {
                let nn = self.imm16(bus);
                bus.mreq_wr(nn, self.regs.a);
                self.regs.wz = u16::from(self.regs.a) << 8 | (nn.wrapping_add(1) & 0xFF);
                13
            }
            _ => {
                let nn = self.imm16(bus);
                self.regs.a = bus.mreq_rd(nn);
                self.regs.wz = nn.wrapping_add(1);
                13
            }
        }
    }

    /// RLCA, RRCA, RLA, RRA, DAA, CPL, SCF, CCF.
    fn accumulator_misc(&mut self, y: u8) {
        let a = self.regs.a;
        let f = self.regs.f;
        match y {
            0..=3 => {
                let r = alu::rotate_a(y, a, f);
                self.regs.a = r.value;
                self.regs.f = r.flags;
            }
            4 => {
                let r = alu::daa(a, f);
                self.regs.a = r.value;
                self.regs.f = r.flags;
            }
            5 => {
                self.regs.a = !a;
                self.regs.f = (f & (SF | ZF | PF | CF)) | HF | NF | (!a & (YF | XF));
            }
            6 => {
                self.regs.f = (f & (SF | ZF | PF)) | (a & (YF | XF)) | CF;
            }
            _ => {
                let half = if f & CF != 0 { HF } else { 0 };
                self.regs.f = ((f & (SF | ZF | PF | CF)) | half | (a & (YF | XF))) ^ CF;
            }
        }
    }

    fn accumulate(&mut self, op: u8, operand: u8) {
        let r = alu::accumulate(op, self.regs.a, operand, self.regs.f);
        self.regs.a = r.value;
        self.regs.f = r.flags;
    }

    fn jump_relative(&mut self, d: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d));
        self.regs.wz = self.regs.pc;
    }
}
