//! CB-prefixed bit operations, plain and indexed.

use emu_core::Bus;

use super::{Index, Z80};
use crate::alu;

impl Z80 {
    /// Transform `v` by a CB opcode. `None` for BIT, which only sets flags.
    fn bit_op(&mut self, opcode: u8, v: u8, xy: u8) -> Option<u8> {
        let y = (opcode >> 3) & 7;
        match opcode >> 6 {
            0 => {
                let r = alu::shift(y, v, self.regs.f);
                self.regs.f = r.flags;
                Some(r.value)
            }
            1 => {
                self.regs.f = alu::bit(y, v, xy, self.regs.f);
                None
            }
            2 => Some(v & !(1 << y)),
            _ => Some(v | (1 << y)),
        }
    }

    pub(crate) fn execute_cb<B: Bus>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        let z = opcode & 7;
        if z == 6 {
            let addr = self.regs.hl();
            let v = bus.mreq_rd(addr);
            let xy = (self.regs.wz >> 8) as u8;
            match self.bit_op(opcode, v, xy) {
                Some(result) => {
                    bus.mreq_wr(addr, result);
                    15
                }
                None => 12,
            }
        } else {
            let v = self.reg8(z, Index::Hl);
            if let Some(result) = self.bit_op(opcode, v, v) {
                self.set_reg8(z, Index::Hl, result);
            }
            8
        }
    }

    /// DD CB d op / FD CB d op. The caller adds the 4 T-states of the
    /// index prefix. Non-BIT results are also copied into register `z`
    /// unless it names the memory operand.
    pub(crate) fn execute_indexed_cb<B: Bus>(&mut self, bus: &mut B, idx: Index) -> u32 {
        let addr = self.operand_addr(bus, idx);
        let opcode = self.imm8(bus);
        let v = bus.mreq_rd(addr);
        match self.bit_op(opcode, v, (addr >> 8) as u8) {
            Some(result) => {
                bus.mreq_wr(addr, result);
                let z = opcode & 7;
                if z != 6 {
                    self.set_reg8(z, Index::Hl, result);
                }
                19
            }
            None => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use emu_core::{Cpu, SimpleBus};

    use crate::Z80;
    use crate::flags::{CF, ZF};

    #[test]
    fn rlc_register() {
        let mut bus = SimpleBus::new();
        bus.load(0, &[0xCB, 0x00]); // RLC B
        let mut cpu = Z80::new();
        cpu.regs.pc = 0;
        cpu.regs.b = 0x81;
        assert_eq!(cpu.step(&mut bus), 8);
        assert_eq!(cpu.regs.b, 0x03);
        assert_ne!(cpu.regs.f & CF, 0);
    }

    #[test]
    fn bit_on_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0, &[0xCB, 0x7E]); // BIT 7,(HL)
        bus.load(0x4000, &[0x00]);
        let mut cpu = Z80::new();
        cpu.regs.pc = 0;
        cpu.regs.set_hl(0x4000);
        assert_eq!(cpu.step(&mut bus), 12);
        assert_ne!(cpu.regs.f & ZF, 0);
    }

    #[test]
    fn indexed_set_copies_to_register() {
        let mut bus = SimpleBus::new();
        bus.load(0, &[0xDD, 0xCB, 0x01, 0xC0]); // SET 0,(IX+1),B
        let mut cpu = Z80::new();
        cpu.regs.pc = 0;
        cpu.regs.ix = 0x4000;
        assert_eq!(cpu.step(&mut bus), 23);
        assert_eq!(bus.peek(0x4001), 0x01);
        assert_eq!(cpu.regs.b, 0x01);
    }

    #[test]
    fn indexed_bit_costs_twenty() {
        let mut bus = SimpleBus::new();
        bus.load(0, &[0xFD, 0xCB, 0xFF, 0x46]); // BIT 0,(IY-1)
        let mut cpu = Z80::new();
        cpu.regs.pc = 0;
        cpu.regs.iy = 0x4001;
        bus.load(0x4000, &[0x01]);
        assert_eq!(cpu.step(&mut bus), 20);
        assert_eq!(cpu.regs.f & ZF, 0);
    }
}
