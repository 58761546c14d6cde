//! Z80 core: interrupt acceptance, the fetch loop and operand plumbing.
//! Opcode tables live in the `execute*` submodules.

mod execute;
mod execute_cb;
mod execute_ed;

use emu_core::{Bus, Cpu, Observable, Ticks, Value};

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::registers::Registers;

/// Which register stands in for HL after a DD/FD prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// Zilog Z80 CPU.
#[derive(Debug, Clone)]
pub struct Z80 {
    pub regs: Registers,
    /// INT line latched by `pulse_int()`, held until the CPU accepts it.
    int_line: bool,
    nmi_pending: bool,
    /// Set by EI; blocks INT acceptance for one instruction.
    ei_delay: bool,
    total_ticks: Ticks,
    /// T-states granted by `clock()` and not yet spent. Goes negative when
    /// an instruction overruns its quantum.
    budget: i32,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            int_line: false,
            nmi_pending: false,
            ei_delay: false,
            total_ticks: Ticks::ZERO,
            budget: 0,
        };
        cpu.reset();
        cpu
    }

    #[must_use]
    pub const fn total_ticks(&self) -> Ticks {
        self.total_ticks
    }

    /// True while an accepted-pending maskable interrupt is latched.
    #[must_use]
    pub const fn int_pending(&self) -> bool {
        self.int_line
    }

    /// Drop a latched INT that has not been accepted yet.
    pub fn clear_int(&mut self) {
        self.int_line = false;
    }

    /// Grant `quantum` T-states and run whole instructions until they are
    /// spent. Any overrun is carried into the next call.
    pub fn clock<B: Bus>(&mut self, bus: &mut B, quantum: u32) {
        self.budget += quantum as i32;
        while self.budget > 0 {
            self.budget -= self.step(bus) as i32;
        }
    }

    #[must_use]
    pub fn sp(&self) -> u16 {
        self.regs.sp
    }

    #[must_use]
    pub fn de(&self) -> u16 {
        self.regs.de()
    }

    #[cfg(feature = "test-utils")]
    pub fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
    }

    #[cfg(feature = "test-utils")]
    pub fn set_sp(&mut self, value: u16) {
        self.regs.sp = value;
    }

    /// Pop the return address into PC, as a harness-level `RET`.
    #[cfg(feature = "test-utils")]
    pub fn force_ret<B: Bus>(&mut self, bus: &mut B) {
        self.regs.pc = self.pop(bus);
    }

    #[cfg(feature = "test-utils")]
    #[must_use]
    pub fn a(&self) -> u8 {
        self.regs.a
    }

    #[cfg(feature = "test-utils")]
    #[must_use]
    pub fn f(&self) -> u8 {
        self.regs.f
    }

    #[cfg(feature = "test-utils")]
    #[must_use]
    pub fn bc(&self) -> u16 {
        self.regs.bc()
    }

    #[cfg(feature = "test-utils")]
    #[must_use]
    pub fn hl(&self) -> u16 {
        self.regs.hl()
    }

    fn run_one<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.nmi_pending {
            self.nmi_pending = false;
            return self.accept_nmi(bus);
        }
        if self.int_line && self.regs.iff1 && !self.ei_delay {
            self.int_line = false;
            return self.accept_int(bus);
        }
        self.ei_delay = false;
        if self.regs.halted {
            self.regs.inc_r();
            return 4;
        }
        let opcode = self.fetch_opcode(bus);
        self.execute(bus, opcode, Index::Hl)
    }

    fn accept_nmi<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.regs.inc_r();
        self.push(bus, self.regs.pc);
        self.regs.pc = 0x0066;
        self.regs.wz = 0x0066;
        11
    }

    fn accept_int<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.regs.inc_r();
        let data = bus.iorq_m1();
        self.push(bus, self.regs.pc);
        if self.regs.im == 2 {
            let vector = u16::from(self.regs.i) << 8 | u16::from(data & 0xFE);
            self.regs.pc = self.read16(bus, vector);
            self.regs.wz = self.regs.pc;
            19
        } else {
            // IM 0 only ever sees RST 38h on the CPC data bus.
            self.regs.pc = 0x0038;
            self.regs.wz = 0x0038;
            13
        }
    }

    pub(crate) fn fetch_opcode<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let opcode = bus.mreq_m1(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.regs.inc_r();
        opcode
    }

    pub(crate) fn imm8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.mreq_rd(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    pub(crate) fn imm16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.imm8(bus);
        let hi = self.imm8(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn read16<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.mreq_rd(addr);
        let hi = bus.mreq_rd(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write16<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        bus.mreq_wr(addr, lo);
        bus.mreq_wr(addr.wrapping_add(1), hi);
    }

    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.mreq_wr(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.mreq_wr(self.regs.sp, lo);
    }

    pub(crate) fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let value = self.read16(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    /// Resolve the `(HL)` operand. Under an index prefix this reads the
    /// displacement byte and yields `IX+d`/`IY+d`.
    pub(crate) fn operand_addr<B: Bus>(&mut self, bus: &mut B, idx: Index) -> u16 {
        match idx {
            Index::Hl => self.regs.hl(),
            Index::Ix | Index::Iy => {
                let d = self.imm8(bus) as i8;
                let addr = self.index_reg(idx).wrapping_add_signed(i16::from(d));
                self.regs.wz = addr;
                addr
            }
        }
    }

    pub(crate) fn index_reg(&self, idx: Index) -> u16 {
        match idx {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    pub(crate) fn set_index_reg(&mut self, idx: Index, value: u16) {
        match idx {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// Register operand `r` (never 6). H and L follow the index prefix.
    pub(crate) fn reg8(&self, r: u8, idx: Index) -> u8 {
        match r {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => (self.index_reg(idx) >> 8) as u8,
            5 => self.index_reg(idx) as u8,
            _ => self.regs.a,
        }
    }

    pub(crate) fn set_reg8(&mut self, r: u8, idx: Index, value: u8) {
        match r {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => {
                let v = self.index_reg(idx);
                self.set_index_reg(idx, (v & 0x00FF) | u16::from(value) << 8);
            }
            5 => {
                let v = self.index_reg(idx);
                self.set_index_reg(idx, (v & 0xFF00) | u16::from(value));
            }
            _ => self.regs.a = value,
        }
    }

    /// BC, DE, HL/IX/IY, SP.
    pub(crate) fn reg16(&self, p: u8, idx: Index) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(idx),
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_reg16(&mut self, p: u8, idx: Index, value: u16) {
        match p {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(idx, value),
            _ => self.regs.sp = value,
        }
    }

    pub(crate) fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let cycles = self.run_one(bus);
        self.total_ticks += cycles;
        cycles
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc)
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn pulse_int(&mut self) {
        self.int_line = true;
    }

    fn pulse_nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset(&mut self) {
        self.regs = Registers {
            a: 0xFF,
            f: 0xFF,
            sp: 0xFFFF,
            ..Registers::default()
        };
        self.int_line = false;
        self.nmi_pending = false;
        self.ei_delay = false;
        self.budget = 0;
    }
}

const Z80_QUERY_PATHS: &[&str] = &[
    "a", "f", "b", "c", "d", "e", "h", "l",
    "af", "bc", "de", "hl",
    "a'", "f'", "b'", "c'", "d'", "e'", "h'", "l'",
    "af'", "bc'", "de'", "hl'",
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    "sp", "pc", "i", "r", "wz",
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    "iff1", "iff2", "im", "int_pending",
    "halted", "ticks",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |mask: u8| Some(Value::Bool(r.f & mask != 0));
        match path {
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "b" => Some(r.b.into()),
            "c" => Some(r.c.into()),
            "d" => Some(r.d.into()),
            "e" => Some(r.e.into()),
            "h" => Some(r.h.into()),
            "l" => Some(r.l.into()),
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),
            "a'" => Some(r.a_alt.into()),
            "f'" => Some(r.f_alt.into()),
            "b'" => Some(r.b_alt.into()),
            "c'" => Some(r.c_alt.into()),
            "d'" => Some(r.d_alt.into()),
            "e'" => Some(r.e_alt.into()),
            "h'" => Some(r.h_alt.into()),
            "l'" => Some(r.l_alt.into()),
            "af'" => Some(r.af_alt().into()),
            "bc'" => Some(r.bc_alt().into()),
            "de'" => Some(r.de_alt().into()),
            "hl'" => Some(r.hl_alt().into()),
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "ixh" => Some(((r.ix >> 8) as u8).into()),
            "ixl" => Some((r.ix as u8).into()),
            "iyh" => Some(((r.iy >> 8) as u8).into()),
            "iyl" => Some((r.iy as u8).into()),
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),
            "wz" => Some(r.wz.into()),
            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.y" => flag(YF),
            "flags.h" => flag(HF),
            "flags.x" => flag(XF),
            "flags.p" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "im" => Some(r.im.into()),
            "int_pending" => Some(self.int_line.into()),
            "halted" => Some(r.halted.into()),
            "ticks" => Some(self.total_ticks.get().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
