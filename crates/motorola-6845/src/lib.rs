//! Motorola 6845 CRT Controller (CRTC).
//!
//! The 6845 generates horizontal and vertical sync and walks a memory
//! address (MA) and row address (RA) across the display. The CPC clocks
//! it at 1 MHz, one tick per character (two bytes of video RAM).
//!
//! # Registers (R0-R17)
//!
//! | Reg | Name                      | Bits | Access |
//! |-----|---------------------------|------|--------|
//! | R0  | Horizontal total          | 8    | W      |
//! | R1  | Horizontal displayed      | 8    | W      |
//! | R2  | Horizontal sync position  | 8    | W      |
//! | R3  | Sync widths (V:4, H:4)    | 8    | W      |
//! | R4  | Vertical total            | 7    | W      |
//! | R5  | Vertical total adjust     | 5    | W      |
//! | R6  | Vertical displayed        | 7    | W      |
//! | R7  | Vertical sync position    | 7    | W      |
//! | R8  | Interlace mode and skew   | 2    | W      |
//! | R9  | Maximum scanline address  | 5    | W      |
//! | R10 | Cursor start              | 7    | W      |
//! | R11 | Cursor end                | 5    | W      |
//! | R12 | Start address high        | 6    | W      |
//! | R13 | Start address low         | 8    | W      |
//! | R14 | Cursor high               | 6    | R/W    |
//! | R15 | Cursor low                | 8    | R/W    |
//! | R16 | Light pen high            | 6    | R      |
//! | R17 | Light pen low             | 8    | R      |

/// Old and new level of a sync output, passed to [`SyncHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEdge {
    pub old: bool,
    pub new: bool,
}

impl SyncEdge {
    #[must_use]
    pub const fn rising(self) -> bool {
        !self.old && self.new
    }

    #[must_use]
    pub const fn falling(self) -> bool {
        self.old && !self.new
    }
}

/// Receiver for sync transitions raised during [`Crtc6845::clock`].
pub trait SyncHandler {
    fn hsync(&mut self, edge: SyncEdge);
    fn vsync(&mut self, edge: SyncEdge);
}

/// Register file with named fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub horizontal_total: u8,
    pub horizontal_displayed: u8,
    pub horizontal_sync_position: u8,
    pub sync_width: u8,
    pub vertical_total: u8,
    pub vertical_total_adjust: u8,
    pub vertical_displayed: u8,
    pub vertical_sync_position: u8,
    pub interlace_mode_and_skew: u8,
    pub maximum_scanline_address: u8,
    pub cursor_start: u8,
    pub cursor_end: u8,
    pub start_address_high: u8,
    pub start_address_low: u8,
    pub cursor_high: u8,
    pub cursor_low: u8,
    pub light_pen_high: u8,
    pub light_pen_low: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            horizontal_total: 63,
            horizontal_displayed: 40,
            horizontal_sync_position: 46,
            sync_width: 0x8E,
            vertical_total: 38,
            vertical_total_adjust: 0,
            vertical_displayed: 25,
            vertical_sync_position: 30,
            interlace_mode_and_skew: 0,
            maximum_scanline_address: 7,
            cursor_start: 0,
            cursor_end: 0,
            start_address_high: 0x30,
            start_address_low: 0,
            cursor_high: 0,
            cursor_low: 0,
            light_pen_high: 0,
            light_pen_low: 0,
        }
    }
}

/// Static description of one register: its name, width mask, CPU access
/// rights, and accessors into [`Registers`].
pub struct RegisterInfo {
    pub name: &'static str,
    pub mask: u8,
    pub readable: bool,
    pub writable: bool,
    pub get: fn(&Registers) -> u8,
    pub set: fn(&mut Registers, u8),
}

macro_rules! reg {
    ($name:literal, $field:ident, $mask:literal, $r:literal, $w:literal) => {
        RegisterInfo {
            name: $name,
            mask: $mask,
            readable: $r,
            writable: $w,
            get: |regs| regs.$field,
            set: |regs, v| regs.$field = v,
        }
    };
}

/// Index-to-field table for R0-R17.
pub static REGISTER_TABLE: [RegisterInfo; 18] = [
    reg!("horizontal-total", horizontal_total, 0xff, false, true),
    reg!("horizontal-displayed", horizontal_displayed, 0xff, false, true),
    reg!("horizontal-sync-position", horizontal_sync_position, 0xff, false, true),
    reg!("sync-width", sync_width, 0xff, false, true),
    reg!("vertical-total", vertical_total, 0x7f, false, true),
    reg!("vertical-total-adjust", vertical_total_adjust, 0x1f, false, true),
    reg!("vertical-displayed", vertical_displayed, 0x7f, false, true),
    reg!("vertical-sync-position", vertical_sync_position, 0x7f, false, true),
    reg!("interlace-mode-and-skew", interlace_mode_and_skew, 0x03, false, true),
    reg!("maximum-scanline-address", maximum_scanline_address, 0x1f, false, true),
    reg!("cursor-start", cursor_start, 0x7f, false, true),
    reg!("cursor-end", cursor_end, 0x1f, false, true),
    reg!("start-address-high", start_address_high, 0x3f, false, true),
    reg!("start-address-low", start_address_low, 0xff, false, true),
    reg!("cursor-high", cursor_high, 0x3f, true, true),
    reg!("cursor-low", cursor_low, 0xff, true, true),
    reg!("light-pen-high", light_pen_high, 0x3f, true, false),
    reg!("light-pen-low", light_pen_low, 0xff, true, false),
];

/// Mask applied to the address register on `rs()`.
const ADDRESS_MASK: u8 = 0x1f;

/// Motorola 6845 CRT Controller.
#[derive(Debug, Clone)]
pub struct Crtc6845 {
    pub regs: Registers,
    /// Address register: selects which Rn `wr`/`rd` reach.
    pub address: u8,
    /// Character counter within the line.
    pub h_counter: u8,
    /// Character row counter within the frame.
    pub v_counter: u8,
    /// Scanline counter within the character row (RA).
    pub scanline: u8,
    /// Remaining hsync width, in characters.
    pub hsync_counter: u8,
    /// Remaining vsync width, in scanlines.
    pub vsync_counter: u8,
    pub hsync: bool,
    pub vsync: bool,
}

impl Default for Crtc6845 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crtc6845 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            address: 0,
            h_counter: 0,
            v_counter: 0,
            scanline: 0,
            hsync_counter: 0,
            vsync_counter: 0,
            hsync: false,
            vsync: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Register select.
    pub fn rs(&mut self, data: u8) {
        self.address = data & ADDRESS_MASK;
    }

    /// Write the selected register. Read-only and out-of-range selections
    /// are ignored.
    pub fn wr(&mut self, data: u8) {
        let selected = REGISTER_TABLE.get(usize::from(self.address));
        if let Some(info) = selected.filter(|info| info.writable) {
            (info.set)(&mut self.regs, data & info.mask);
        }
    }

    /// Read the selected register. Write-only and out-of-range selections
    /// return `data`, the value already floating on the bus.
    #[must_use]
    pub fn rd(&self, data: u8) -> u8 {
        match REGISTER_TABLE.get(usize::from(self.address)) {
            Some(info) if info.readable => (info.get)(&self.regs),
            _ => data,
        }
    }

    /// Read any register regardless of access rights.
    #[must_use]
    pub fn peek(&self, index: usize) -> u8 {
        REGISTER_TABLE.get(index).map_or(0, |info| (info.get)(&self.regs))
    }

    /// Write any register regardless of access rights, applying its mask.
    pub fn poke(&mut self, index: usize, data: u8) {
        if let Some(info) = REGISTER_TABLE.get(index) {
            (info.set)(&mut self.regs, data & info.mask);
        }
    }

    /// 14-bit start address from R12:R13.
    #[must_use]
    pub const fn start_address(&self) -> u16 {
        (self.regs.start_address_high as u16) << 8 | self.regs.start_address_low as u16
    }

    /// MA at the first character of the current character row.
    #[must_use]
    pub const fn row_address(&self) -> u16 {
        let offset = self.v_counter as u16 * self.regs.horizontal_displayed as u16;
        self.start_address().wrapping_add(offset) & 0x3FFF
    }

    /// Current raster address.
    #[must_use]
    pub const fn ra(&self) -> u8 {
        self.scanline
    }

    /// True while the beam is inside the vertically displayed area.
    #[must_use]
    pub const fn row_displayed(&self) -> bool {
        self.v_counter < self.regs.vertical_displayed
    }

    /// Advance by one character clock.
    pub fn clock<H: SyncHandler>(&mut self, handler: &mut H) {
        let old_hsync = self.hsync;
        let old_vsync = self.vsync;

        if self.hsync_counter > 0 {
            self.hsync_counter -= 1;
            if self.hsync_counter == 0 {
                self.hsync = false;
            }
        }

        self.h_counter = self.h_counter.wrapping_add(1);
        if u16::from(self.h_counter) == u16::from(self.regs.horizontal_total) + 1 {
            self.h_counter = 0;
            self.end_of_line();
        }

        if !self.hsync && self.h_counter == self.regs.horizontal_sync_position {
            self.hsync = true;
            self.hsync_counter = width(self.regs.sync_width & 0x0f);
        }

        // Level triggered: a pulse ending inside row R7 restarts at once.
        if !self.vsync && self.v_counter == self.regs.vertical_sync_position {
            self.vsync = true;
            self.vsync_counter = width(self.regs.sync_width >> 4);
        }

        if self.vsync != old_vsync {
            handler.vsync(SyncEdge { old: old_vsync, new: self.vsync });
        }
        if self.hsync != old_hsync {
            handler.hsync(SyncEdge { old: old_hsync, new: self.hsync });
        }
    }

    fn end_of_line(&mut self) {
        if self.vsync_counter > 0 {
            self.vsync_counter -= 1;
            if self.vsync_counter == 0 {
                self.vsync = false;
            }
        }

        self.scanline = self.scanline.wrapping_add(1);
        if self.scanline == self.regs.maximum_scanline_address.wrapping_add(1) {
            self.scanline = 0;
            self.v_counter = self.v_counter.wrapping_add(1);
            if self.v_counter == self.regs.vertical_total.wrapping_add(1) {
                self.v_counter = 0;
            }
        }
    }
}

/// A zero width programs the maximum of 16.
const fn width(nibble: u8) -> u8 {
    if nibble == 0 { 16 } else { nibble }
}
