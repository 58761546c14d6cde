//! CPC bus: memory paging and I/O decoding.
//!
//! Every peripheral is selected by one address line held low, so a single
//! access may reach several chips at once:
//!
//! | Line   | Device     | Function select                 |
//! |--------|------------|---------------------------------|
//! | A15    | gate array | data bits 7:6                   |
//! | A14    | CRTC       | A9:A8 (select, write, -, read)  |
//! | A13    | ROM select | write only                      |
//! | A12    | printer    | write only                      |
//! | A11    | PPI        | A9:A8 (A, B, C, control)        |
//! | A10+A7 | FDC        | A8 and A0 (motor, -, MSR, data) |
//!
//! Reads of nothing return 0xFF. Accesses a device cannot service are
//! logged and ignored.

use amstrad_gate_array::{GateArray, WriteEffect};
use emu_core::Bus;
use gi_ay_3_8910::{Ay3_8910, StereoMode};
use intel_8255::{Ppi8255, PpiPorts};
use log::warn;
use motorola_6845::Crtc6845;

use crate::fdc::Fdc;
use crate::keyboard::Keyboard;
use crate::memory::Memory;
use crate::pager::Pager;

/// PSG clock on the CPC.
pub const PSG_CLOCK: u32 = 1_000_000;
pub const SAMPLE_RATE: u32 = 44_100;

/// Levels on the PPI port B input pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub hsync: bool,
    pub vsync: bool,
    /// 50 Hz strap.
    pub refresh: u8,
    /// Distributor name strap, 3 bits.
    pub company: u8,
    /// /EXP, high when no expansion is fitted.
    pub expansion: u8,
    /// Printer busy.
    pub parallel: u8,
    /// Cassette read data.
    pub cassette: u8,
}

impl Default for Signals {
    fn default() -> Self {
        Self { hsync: false, vsync: false, refresh: 1, company: 7, expansion: 1, parallel: 1, cassette: 0 }
    }
}

/// PSG bus control from PPI port C bits 7:6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsgFunction {
    #[default]
    Inactive,
    Read,
    Write,
    Select,
}

impl From<u8> for PsgFunction {
    fn from(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Inactive,
            1 => Self::Read,
            2 => Self::Write,
            _ => Self::Select,
        }
    }
}

/// Everything hanging off the PPI: the PSG, the keyboard behind it, the
/// cassette and the board straps.
pub struct Board {
    pub psg: Ay3_8910,
    pub keyboard: Keyboard,
    pub signals: Signals,
    /// Last value driven on port A.
    pub psg_data: u8,
    pub psg_function: PsgFunction,
    pub tape_motor: bool,
    pub tape_write: bool,
}

impl Board {
    #[must_use]
    pub fn new(signals: Signals) -> Self {
        let mut psg = Ay3_8910::new(PSG_CLOCK, SAMPLE_RATE);
        psg.set_stereo(StereoMode::Abc);
        Self {
            psg,
            keyboard: Keyboard::new(),
            signals,
            psg_data: 0xFF,
            psg_function: PsgFunction::Inactive,
            tape_motor: false,
            tape_write: false,
        }
    }

    pub fn reset(&mut self) {
        self.psg.reset();
        self.keyboard.line = 0;
        self.psg_data = 0xFF;
        self.psg_function = PsgFunction::Inactive;
        self.tape_motor = false;
        self.tape_write = false;
    }

    fn drive_psg(&mut self) {
        match self.psg_function {
            PsgFunction::Write => self.psg.write(&mut self.keyboard, self.psg_data),
            PsgFunction::Select => self.psg.select(self.psg_data),
            PsgFunction::Inactive | PsgFunction::Read => {}
        }
    }
}

impl PpiPorts for Board {
    fn read_a(&mut self) -> u8 {
        match self.psg_function {
            PsgFunction::Read => self.psg.read(&mut self.keyboard),
            _ => 0xFF,
        }
    }

    fn read_b(&mut self) -> u8 {
        let s = &self.signals;
        (s.cassette & 1) << 7
            | (s.parallel & 1) << 6
            | (s.expansion & 1) << 5
            | (s.refresh & 1) << 4
            | (s.company & 7) << 1
            | u8::from(s.vsync)
    }

    fn write_a(&mut self, data: u8) {
        self.psg_data = data;
        self.drive_psg();
    }

    fn write_c(&mut self, data: u8) {
        self.keyboard.line = data & 0x0F;
        self.tape_motor = data & 0x10 != 0;
        self.tape_write = data & 0x20 != 0;
        self.psg_function = PsgFunction::from(data >> 6);
        self.drive_psg();
    }
}

pub struct CpcBus {
    pub memory: Memory,
    pub pager: Pager,
    pub gate_array: GateArray,
    pub crtc: Crtc6845,
    pub ppi: Ppi8255,
    pub board: Board,
    pub fdc: Fdc,
    /// Disc interface fitted. Without it the FDC ports are not decoded.
    pub disc: bool,
    /// Last byte written to the printer port.
    pub printer: u8,
}

impl CpcBus {
    #[must_use]
    pub fn new(memory: Memory, signals: Signals) -> Self {
        let mut bus = Self {
            memory,
            pager: Pager::new(),
            gate_array: GateArray::new(),
            crtc: Crtc6845::new(),
            ppi: Ppi8255::new(),
            board: Board::new(signals),
            fdc: Fdc::new(),
            disc: true,
            printer: 0,
        };
        bus.remap();
        bus
    }

    /// Reset every chip on the bus. RAM contents and disks are kept.
    pub fn reset(&mut self) {
        self.gate_array.reset();
        self.crtc.reset();
        self.ppi.reset();
        self.board.reset();
        self.fdc.reset();
        self.printer = 0;
        self.pager.reset(&self.memory, self.gate_array.rmr);
    }

    /// Rebuild the memory map from the current RAM/ROM configuration.
    pub fn remap(&mut self) {
        self.pager.select(&self.memory, self.gate_array.rmr);
    }

    /// CPU view of memory, without side effects.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.pager.read(&self.memory, addr)
    }

    fn gate_array_write(&mut self, data: u8) {
        match self.gate_array.write(data) {
            WriteEffect::None => {}
            WriteEffect::MemoryMap => self.remap(),
            WriteEffect::RamConfig(conf) => {
                self.pager.ram_conf = conf & 0x3F;
                self.remap();
            }
        }
    }
}

impl Bus for CpcBus {
    fn mreq_m1(&mut self, addr: u16) -> u8 {
        self.pager.read(&self.memory, addr)
    }

    fn mreq_rd(&mut self, addr: u16) -> u8 {
        self.pager.read(&self.memory, addr)
    }

    fn mreq_wr(&mut self, addr: u16, data: u8) {
        self.pager.write(&mut self.memory, addr, data);
    }

    /// The gate array clears counter bit 5 on acknowledge. The data bus
    /// reads 0x00, so IM 2 vectors through `I << 8`.
    fn iorq_m1(&mut self) -> u8 {
        self.gate_array.acknowledge();
        0x00
    }

    fn iorq_rd(&mut self, port: u16) -> u8 {
        let mut data = 0xFF;
        if port & 0x8000 == 0 {
            warn!("iorq_rd({port:#06x}): gate array is write only");
        }
        if port & 0x4000 == 0 {
            match (port >> 8) & 3 {
                3 => data = self.crtc.rd(data),
                2 => warn!("iorq_rd({port:#06x}): crtc status not supported"),
                _ => warn!("iorq_rd({port:#06x}): crtc register is write only"),
            }
        }
        if port & 0x2000 == 0 {
            warn!("iorq_rd({port:#06x}): rom select is write only");
        }
        if port & 0x1000 == 0 {
            warn!("iorq_rd({port:#06x}): printer port is write only");
        }
        if port & 0x0800 == 0 {
            match (port >> 8) & 3 {
                3 => warn!("iorq_rd({port:#06x}): ppi control is write only"),
                reg => data = self.ppi.read(&mut self.board, reg as u8),
            }
        }
        if port & 0x0480 == 0 && self.disc {
            match ((port >> 7) & 2) | (port & 1) {
                2 => data = self.fdc.rd_stat(),
                3 => data = self.fdc.rd_data(),
                _ => warn!("iorq_rd({port:#06x}): fdc motor latch is write only"),
            }
        }
        data
    }

    fn iorq_wr(&mut self, port: u16, data: u8) {
        if port & 0x8000 == 0 {
            self.gate_array_write(data);
        }
        if port & 0x4000 == 0 {
            match (port >> 8) & 3 {
                0 => self.crtc.rs(data),
                1 => self.crtc.wr(data),
                2 => warn!("iorq_wr({port:#06x}): crtc function not supported"),
                _ => warn!("iorq_wr({port:#06x}): crtc status is read only"),
            }
        }
        if port & 0x2000 == 0 {
            self.pager.rom_conf = data;
            self.remap();
        }
        if port & 0x1000 == 0 {
            self.printer = data;
        }
        if port & 0x0800 == 0 {
            self.ppi.write(&mut self.board, ((port >> 8) & 3) as u8, data);
        }
        if port & 0x0480 == 0 && self.disc {
            match ((port >> 7) & 2) | (port & 1) {
                0 | 1 => self.fdc.set_motor(data & 1 != 0),
                2 => self.fdc.wr_stat(data),
                _ => self.fdc.wr_data(data),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::CpcKey;
    use crate::memory::{BANK_SIZE, RomBank};
    use crate::pager::Bank;

    fn make_bus(banks: usize) -> CpcBus {
        let lower = RomBank::new(&[0x11; BANK_SIZE]).expect("rom");
        let upper = RomBank::new(&[0x22; BANK_SIZE]).expect("rom");
        CpcBus::new(Memory::new(banks, lower, upper), Signals::default())
    }

    #[test]
    fn roms_visible_after_power_on() {
        let mut bus = make_bus(4);
        assert_eq!(bus.mreq_rd(0x0000), 0x11);
        assert_eq!(bus.mreq_rd(0xC000), 0x22);
        bus.mreq_wr(0x0000, 0x99);
        assert_eq!(bus.mreq_rd(0x0000), 0x11);
        assert_eq!(bus.memory.ram[0].get(0), 0x99);
    }

    #[test]
    fn gate_array_mode_and_roms() {
        let mut bus = make_bus(4);
        bus.gate_array.counter = 40;
        bus.iorq_wr(0x7F00, 0x9C);
        assert_eq!(bus.gate_array.mode(), 0);
        assert_eq!(bus.gate_array.counter, 0);
        assert_eq!(bus.pager.read_bank(0), Bank::Ram(0));
        assert_eq!(bus.pager.read_bank(3), Bank::Ram(3));
    }

    #[test]
    fn pen_and_ink_writes() {
        let mut bus = make_bus(4);
        bus.iorq_wr(0x7F00, 0x10);
        bus.iorq_wr(0x7F00, 0x54);
        assert_eq!(bus.gate_array.ink[16], 0x14);
    }

    #[test]
    fn ram_configuration_through_gate_array() {
        let mut bus = make_bus(8);
        bus.iorq_wr(0x7F00, 0xC2);
        assert_eq!(bus.pager.ram_conf, 0x02);
        assert_eq!(bus.pager.ram_map(), [4, 5, 6, 7]);
        bus.iorq_wr(0x7F00, 0xC0);
        assert_eq!(bus.pager.ram_map(), [0, 1, 2, 3]);
    }

    #[test]
    fn rom_select_port() {
        let mut bus = make_bus(4);
        bus.memory.set_expansion(7, RomBank::new(&[0x77; BANK_SIZE]).expect("rom"));
        bus.iorq_wr(0xDF00, 7);
        assert_eq!(bus.mreq_rd(0xC000), 0x77);
        bus.iorq_wr(0xDF00, 0);
        assert_eq!(bus.mreq_rd(0xC000), 0x22);
    }

    #[test]
    fn crtc_select_write_read() {
        let mut bus = make_bus(4);
        bus.iorq_wr(0xBC00, 12);
        bus.iorq_wr(0xBD00, 0x20);
        assert_eq!(bus.crtc.regs.start_address_high, 0x20);
        // Start address is write only.
        assert_eq!(bus.iorq_rd(0xBF00), 0xFF);
        bus.iorq_wr(0xBC00, 14);
        bus.iorq_wr(0xBD00, 0x12);
        assert_eq!(bus.iorq_rd(0xBF00), 0x12);
    }

    #[test]
    fn unselected_reads_float_high() {
        let mut bus = make_bus(4);
        assert_eq!(bus.iorq_rd(0xFFFF), 0xFF);
        assert_eq!(bus.iorq_rd(0x7F00), 0xFF);
        assert_eq!(bus.iorq_rd(0xFA7E), 0xFF);
    }

    #[test]
    fn port_b_reports_straps_and_vsync() {
        let mut bus = make_bus(4);
        assert_eq!(bus.iorq_rd(0xF500), 0x7E);
        bus.board.signals.vsync = true;
        assert_eq!(bus.iorq_rd(0xF500), 0x7F);
    }

    fn scan(bus: &mut CpcBus, line: u8) -> u8 {
        // PSG register 14, then read it with port A as input.
        bus.iorq_wr(0xF782, 0x82);
        bus.iorq_wr(0xF400, 14);
        bus.iorq_wr(0xF600, 0xC0);
        bus.iorq_wr(0xF600, 0x00);
        bus.iorq_wr(0xF792, 0x92);
        bus.iorq_wr(0xF600, 0x40 | line);
        let data = bus.iorq_rd(0xF400);
        bus.iorq_wr(0xF782, 0x82);
        data
    }

    #[test]
    fn keyboard_through_ppi_and_psg() {
        let mut bus = make_bus(4);
        assert_eq!(scan(&mut bus, 5), 0xFF);
        bus.board.keyboard.set_key(CpcKey::Space, true);
        assert_eq!(scan(&mut bus, 5), 0x7F);
        assert_eq!(scan(&mut bus, 4), 0xFF);
    }

    #[test]
    fn port_c_outputs() {
        let mut bus = make_bus(4);
        bus.iorq_wr(0xF782, 0x82);
        bus.iorq_wr(0xF600, 0x39);
        assert_eq!(bus.board.keyboard.line, 9);
        assert!(bus.board.tape_motor);
        assert!(bus.board.tape_write);
        assert_eq!(bus.board.psg_function, PsgFunction::Inactive);
    }

    #[test]
    fn psg_register_write() {
        let mut bus = make_bus(4);
        bus.iorq_wr(0xF782, 0x82);
        bus.iorq_wr(0xF400, 8);
        bus.iorq_wr(0xF600, 0xC0);
        bus.iorq_wr(0xF600, 0x00);
        bus.iorq_wr(0xF400, 0x0F);
        bus.iorq_wr(0xF600, 0x80);
        bus.iorq_wr(0xF600, 0x00);
        assert_eq!(bus.board.psg.peek(8), 0x0F);
    }

    #[test]
    fn fdc_ports() {
        let mut bus = make_bus(4);
        bus.iorq_wr(0xFA7E, 0x01);
        assert!(bus.fdc.controller.motor());
        bus.iorq_wr(0xFA7E, 0x00);
        assert!(!bus.fdc.controller.motor());
        assert_eq!(bus.iorq_rd(0xFB7E), 0x80);
        bus.iorq_wr(0xFB7F, 0x10);
        assert_eq!(bus.iorq_rd(0xFB7E), 0xD0);
        assert_eq!(bus.iorq_rd(0xFB7F), 0x80);
    }

    #[test]
    fn fdc_ports_float_without_disc_interface() {
        let mut bus = make_bus(4);
        bus.disc = false;
        bus.iorq_wr(0xFA7E, 0x01);
        assert!(!bus.fdc.controller.motor());
        bus.iorq_wr(0xFB7F, 0x10);
        assert_eq!(bus.iorq_rd(0xFB7E), 0xFF);
        assert_eq!(bus.iorq_rd(0xFB7F), 0xFF);
    }

    #[test]
    fn printer_latch() {
        let mut bus = make_bus(4);
        bus.iorq_wr(0xEF00, 0x41);
        assert_eq!(bus.printer, 0x41);
    }

    #[test]
    fn interrupt_acknowledge_clears_bit_5() {
        let mut bus = make_bus(4);
        bus.gate_array.counter = 0x2A;
        assert_eq!(bus.iorq_m1(), 0x00);
        assert_eq!(bus.gate_array.counter, 0x0A);
    }
}
