//! Amstrad CPC Gate Array.
//!
//! The gate array owns the palette (pen to ink indirection), the screen
//! mode, the ROM enables and the 52-line interrupt counter. It is written
//! through port &7Fxx; the top two data bits select the function:
//!
//! | Bits 7-6 | Function                                       |
//! |----------|------------------------------------------------|
//! | 00       | Select pen (bit 4 selects the border)          |
//! | 01       | Set ink for the selected pen                   |
//! | 10       | Mode, ROM enables, interrupt counter reset     |
//! | 11       | RAM configuration (decoded by the machine)     |
//!
//! The gate array also decodes video bytes into pen indices. Each mode
//! packs pixels into a byte with interleaved bits; [`Decoder`] holds one
//! 256-entry table per mode that reorders those bits so pixel 0 sits in
//! the most significant position.

/// Border pseudo-pen.
pub const BORDER: usize = 16;

/// Interrupt raised every 52 hsyncs.
const LINES_PER_INTERRUPT: u8 = 52;

/// Outcome of a gate array port write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    None,
    /// Mode or ROM enable bits changed; the memory map must be rebuilt.
    MemoryMap,
    /// Function 11: the machine owns RAM banking.
    RamConfig(u8),
}

/// Gate array register state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateArray {
    /// Selected pen, 0-15 or [`BORDER`].
    pub pen: u8,
    /// Hardware colour codes for pens 0-15 and the border.
    pub ink: [u8; 17],
    /// Bits 1-0 mode, bit 2 lower ROM disable, bit 3 upper ROM disable.
    pub rmr: u8,
    /// Hsyncs since the last interrupt (0-51).
    pub counter: u8,
    /// Hsyncs left before a vsync-triggered counter reset.
    pub delayed: u8,
}

impl Default for GateArray {
    fn default() -> Self {
        Self::new()
    }
}

impl GateArray {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pen: 0,
            ink: [0; 17],
            rmr: 0,
            counter: 0,
            delayed: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current screen mode, 0-3.
    #[must_use]
    pub const fn mode(&self) -> u8 {
        self.rmr & 0x03
    }

    #[must_use]
    pub const fn lower_rom_enabled(&self) -> bool {
        self.rmr & 0x04 == 0
    }

    #[must_use]
    pub const fn upper_rom_enabled(&self) -> bool {
        self.rmr & 0x08 == 0
    }

    pub fn set_pen(&mut self, data: u8) {
        self.pen = if data & 0x10 != 0 { BORDER as u8 } else { data & 0x0f };
    }

    pub fn set_ink(&mut self, data: u8) {
        self.ink[usize::from(self.pen)] = data & 0x1f;
    }

    pub fn set_rmr(&mut self, data: u8) {
        self.rmr = data & 0x1f;
        if data & 0x10 != 0 {
            self.counter = 0;
        }
    }

    /// Decode a port write by its function bits.
    pub fn write(&mut self, data: u8) -> WriteEffect {
        match data >> 6 {
            0 => {
                self.set_pen(data);
                WriteEffect::None
            }
            1 => {
                self.set_ink(data);
                WriteEffect::None
            }
            2 => {
                self.set_rmr(data);
                WriteEffect::MemoryMap
            }
            _ => WriteEffect::RamConfig(data),
        }
    }

    /// Account for one hsync falling edge. Returns true when the CPU
    /// should be interrupted.
    ///
    /// The 52-line rollover is evaluated before the vsync countdown, so
    /// when both land on the same line the rollover fires first and the
    /// countdown then sees a counter of zero and does not fire again.
    pub fn hsync_falling(&mut self) -> bool {
        let mut interrupt = false;

        self.counter += 1;
        if self.counter == LINES_PER_INTERRUPT {
            interrupt = true;
            self.counter = 0;
        }

        if self.delayed > 0 {
            self.delayed -= 1;
            if self.delayed == 0 {
                if self.counter >= 32 {
                    interrupt = true;
                }
                self.counter = 0;
            }
        }

        interrupt
    }

    /// Vsync rising edge: resynchronise the counter two hsyncs later.
    pub fn vsync_rising(&mut self) {
        self.delayed = 2;
    }

    /// Interrupt acknowledged by the CPU: clear bit 5 of the counter so
    /// the next interrupt is at least 32 lines away.
    pub fn acknowledge(&mut self) {
        self.counter &= 0x1f;
    }
}

/// Per-mode byte to pen-index tables.
#[derive(Debug, Clone)]
pub struct Decoder {
    tables: [[u8; 256]; 4],
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

const fn bit(value: usize, n: u32) -> usize {
    (value >> n) & 1
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        let mut tables = [[0u8; 256]; 4];
        for i in 0..256 {
            // Mode 0: two 4-bit pixels, bits 7,3,5,1 and 6,2,4,0.
            tables[0][i] = (bit(i, 7)
                | bit(i, 3) << 1
                | bit(i, 5) << 2
                | bit(i, 1) << 3
                | bit(i, 6) << 4
                | bit(i, 2) << 5
                | bit(i, 4) << 6
                | bit(i, 0) << 7) as u8;
            // Mode 1: four 2-bit pixels, bits 7,3 / 6,2 / 5,1 / 4,0.
            tables[1][i] = (bit(i, 7)
                | bit(i, 3) << 1
                | bit(i, 6) << 2
                | bit(i, 2) << 3
                | bit(i, 5) << 4
                | bit(i, 1) << 5
                | bit(i, 4) << 6
                | bit(i, 0) << 7) as u8;
            // Mode 2: eight 1-bit pixels, MSB first.
            tables[2][i] = (i as u8).reverse_bits();
        }
        // Mode 3 is undocumented and decodes like mode 1.
        tables[3] = tables[1];
        Self { tables }
    }

    /// Reordered byte: pixel n occupies bits starting at n * bits-per-pixel.
    #[must_use]
    pub fn decode(&self, mode: u8, byte: u8) -> u8 {
        self.tables[usize::from(mode & 3)][usize::from(byte)]
    }

    /// Pixels per byte in `mode`.
    #[must_use]
    pub const fn pixels_per_byte(mode: u8) -> usize {
        match mode & 3 {
            0 => 2,
            2 => 8,
            _ => 4,
        }
    }

    /// Pen indices of every pixel in `byte`, leftmost first.
    pub fn pens(&self, mode: u8, byte: u8) -> impl Iterator<Item = u8> {
        let decoded = self.decode(mode, byte);
        let count = Self::pixels_per_byte(mode);
        let width = 8 / count;
        let mask = ((1u16 << width) - 1) as u8;
        (0..count).map(move |n| (decoded >> (n * width)) & mask)
    }
}
