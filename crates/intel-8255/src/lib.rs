//! Intel 8255 Programmable Peripheral Interface (PPI).
//!
//! Three 8-bit ports (A, B, C) and a control register. Only mode 0
//! (basic I/O) is modelled, which is all the CPC uses. The control word
//! either programs port directions (bit 7 set) or sets/resets a single
//! port C bit (bit 7 clear).
//!
//! | Reg | Name    |
//! |-----|---------|
//! | 0   | Port A  |
//! | 1   | Port B  |
//! | 2   | Port C  |
//! | 3   | Control |

/// Control word direction bits (1 = input).
const PORT_A_INPUT: u8 = 0x10;
const PORT_C_HIGH_INPUT: u8 = 0x08;
const PORT_B_INPUT: u8 = 0x02;
const PORT_C_LOW_INPUT: u8 = 0x01;

/// Pins on the far side of the PPI. Reads are sampled only for ports
/// programmed as inputs; writes are delivered only for outputs.
pub trait PpiPorts {
    fn read_a(&mut self) -> u8;
    fn read_b(&mut self) -> u8;
    fn read_c(&mut self) -> u8 {
        0xFF
    }
    fn write_a(&mut self, data: u8);
    fn write_b(&mut self, _data: u8) {}
    fn write_c(&mut self, data: u8);
}

/// Intel 8255 PPI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ppi8255 {
    /// Output latches.
    pub port_a: u8,
    pub port_b: u8,
    pub port_c: u8,
    pub control: u8,
}

impl Default for Ppi8255 {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppi8255 {
    /// Power-on state: every port an input.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_a: 0,
            port_b: 0,
            port_c: 0,
            control: 0x9B,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn port_a_is_input(&self) -> bool {
        self.control & PORT_A_INPUT != 0
    }

    #[must_use]
    pub const fn port_b_is_input(&self) -> bool {
        self.control & PORT_B_INPUT != 0
    }

    /// Bits of port C currently driven by the PPI.
    #[must_use]
    pub const fn port_c_output_mask(&self) -> u8 {
        let mut mask = 0;
        if self.control & PORT_C_HIGH_INPUT == 0 {
            mask |= 0xF0;
        }
        if self.control & PORT_C_LOW_INPUT == 0 {
            mask |= 0x0F;
        }
        mask
    }

    /// Read register `reg` (0-3).
    pub fn read<P: PpiPorts>(&mut self, ports: &mut P, reg: u8) -> u8 {
        match reg & 3 {
            0 => {
                if self.port_a_is_input() {
                    ports.read_a()
                } else {
                    self.port_a
                }
            }
            1 => {
                if self.port_b_is_input() {
                    ports.read_b()
                } else {
                    self.port_b
                }
            }
            2 => {
                let out = self.port_c_output_mask();
                (self.port_c & out) | (ports.read_c() & !out)
            }
            _ => self.control,
        }
    }

    /// Write register `reg` (0-3).
    pub fn write<P: PpiPorts>(&mut self, ports: &mut P, reg: u8, data: u8) {
        match reg & 3 {
            0 => {
                self.port_a = data;
                if !self.port_a_is_input() {
                    ports.write_a(data);
                }
            }
            1 => {
                self.port_b = data;
                if !self.port_b_is_input() {
                    ports.write_b(data);
                }
            }
            2 => {
                self.port_c = data;
                ports.write_c(data & self.port_c_output_mask());
            }
            _ => self.write_control(ports, data),
        }
    }

    fn write_control<P: PpiPorts>(&mut self, ports: &mut P, data: u8) {
        if data & 0x80 != 0 {
            // Mode set clears every output latch.
            self.control = data;
            self.port_a = 0;
            self.port_b = 0;
            self.port_c = 0;
            if !self.port_a_is_input() {
                ports.write_a(0);
            }
            if !self.port_b_is_input() {
                ports.write_b(0);
            }
            ports.write_c(0);
        } else {
            let bit = 1 << ((data >> 1) & 7);
            if data & 1 != 0 {
                self.port_c |= bit;
            } else {
                self.port_c &= !bit;
            }
            ports.write_c(self.port_c & self.port_c_output_mask());
        }
    }
}
