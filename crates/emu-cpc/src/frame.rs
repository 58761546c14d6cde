//! Frame bookkeeping.
//!
//! The machine records one [`Scanline`] per raster line while it runs and
//! paints the whole frame afterwards. CRTC addressing is captured when the
//! line starts; mode and inks are captured at the hsync falling edge of
//! the line before, which is when the gate array latches them.

use amstrad_gate_array::{Decoder, GateArray};
use log::trace;
use motorola_6845::{Crtc6845, SyncEdge, SyncHandler};

use crate::bus::Signals;
use crate::config::{Bpp, MonitorType, RefreshRate};
use crate::palette::Palette;
use crate::video::Surface;

/// Scanline slots; large enough for a 50 Hz frame.
pub const FRAME_LINES: usize = 312;

/// State needed to paint one raster line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scanline {
    pub mode: u8,
    /// Hardware ink of pens 0-15 and the border.
    pub ink: [u8; 17],
    /// CRTC memory address of the first character.
    pub ma: u16,
    pub ra: u8,
    /// Inside the vertically displayed area.
    pub displayed: bool,
    /// R1, characters displayed per line.
    pub h_displayed: u8,
    /// R2, horizontal sync position.
    pub h_sync: u8,
}

pub struct Frame {
    /// Raster lines per frame for the configured refresh rate.
    pub lines: usize,
    /// Line being generated.
    pub index: usize,
    /// Line on which the last vsync started.
    pub vsync_line: usize,
    pub array: [Scanline; FRAME_LINES],
    pub palette: Palette,
    pub decoder: Decoder,
    pub surface: Surface,
}

impl Frame {
    #[must_use]
    pub fn new(refresh: RefreshRate, monitor: MonitorType, bpp: Bpp) -> Self {
        Self {
            lines: refresh.lines(),
            index: 0,
            vsync_line: 0,
            array: [Scanline::default(); FRAME_LINES],
            palette: Palette::new(monitor, bpp),
            decoder: Decoder::new(),
            surface: Surface::new(bpp),
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.vsync_line = 0;
        self.array = [Scanline::default(); FRAME_LINES];
        self.surface.clear();
    }

    /// Record the CRTC addressing of the line about to be generated.
    pub fn begin_line(&mut self, crtc: &Crtc6845) {
        let slot = self.slot(self.index);
        let line = &mut self.array[slot];
        line.ma = crtc.row_address();
        line.ra = crtc.ra();
        line.displayed = crtc.row_displayed();
        line.h_displayed = crtc.regs.horizontal_displayed;
        line.h_sync = crtc.regs.horizontal_sync_position;
    }

    pub fn end_line(&mut self) {
        self.index += 1;
    }

    /// Scanline slot of raster line `index`, wrapping at the frame length.
    #[must_use]
    pub fn slot(&self, index: usize) -> usize {
        index % self.lines.clamp(1, FRAME_LINES)
    }
}

/// Sync handler wired between the CRTC and the rest of the machine for
/// one character clock.
pub struct Beam<'a> {
    pub gate_array: &'a mut GateArray,
    pub frame: &'a mut Frame,
    pub signals: &'a mut Signals,
    /// Set when the gate array raised an interrupt.
    pub interrupt: bool,
}

impl SyncHandler for Beam<'_> {
    fn hsync(&mut self, edge: SyncEdge) {
        self.signals.hsync = edge.new;
        if !edge.falling() {
            return;
        }
        if self.gate_array.hsync_falling() {
            self.interrupt = true;
        }
        let slot = self.frame.slot(self.frame.index + 1);
        let next = &mut self.frame.array[slot];
        next.mode = self.gate_array.mode();
        next.ink = self.gate_array.ink;
    }

    fn vsync(&mut self, edge: SyncEdge) {
        self.signals.vsync = edge.new;
        if edge.rising() {
            self.gate_array.vsync_rising();
            self.frame.vsync_line = self.frame.index;
            trace!("vsync on line {}", self.frame.index);
        }
    }
}
