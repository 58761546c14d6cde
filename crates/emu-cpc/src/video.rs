//! Display surface and frame painting.
//!
//! The surface is 768 x 576. Each recorded raster line becomes two surface
//! rows, the second at reduced intensity. Horizontally the surface holds
//! 48 CRTC characters of 16 pixels, so a mode 0 pixel is 4 surface pixels
//! wide, mode 1 is 2 and mode 2 is 1.

use amstrad_gate_array::{BORDER, Decoder};

use crate::config::Bpp;
use crate::frame::{FRAME_LINES, Frame, Scanline};
use crate::memory::Memory;
use crate::palette::{Palette, PixelFormat};

pub const WIDTH: usize = 768;
pub const HEIGHT: usize = 576;

/// Raster lines shown, each drawn twice.
pub const VISIBLE_LINES: usize = HEIGHT / 2;
/// First visible raster line, counted from the start of vsync.
pub const VSYNC_TO_VISIBLE: usize = 28;
/// Characters across the surface.
const COLUMNS: usize = 48;
/// Surface pixels per CRTC character (two bytes).
const CHAR_WIDTH: usize = WIDTH / COLUMNS;
/// Surface column 0 shows character `R2 - H_OFFSET`.
const H_OFFSET: i32 = 50;

/// Storage type of one surface pixel.
pub trait Pixel: Copy + Default {
    fn from_encoded(value: u32) -> Self;
    fn encoded(self) -> u32;
}

impl Pixel for u8 {
    fn from_encoded(value: u32) -> Self {
        value as u8
    }
    fn encoded(self) -> u32 {
        u32::from(self)
    }
}

impl Pixel for u16 {
    fn from_encoded(value: u32) -> Self {
        value as u16
    }
    fn encoded(self) -> u32 {
        u32::from(self)
    }
}

impl Pixel for u32 {
    fn from_encoded(value: u32) -> Self {
        value
    }
    fn encoded(self) -> u32 {
        self
    }
}

/// Framebuffer in the configured depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Eight(Vec<u8>),
    Sixteen(Vec<u16>),
    ThirtyTwo(Vec<u32>),
}

impl Surface {
    #[must_use]
    pub fn new(bpp: Bpp) -> Self {
        match bpp {
            Bpp::Eight => Self::Eight(vec![0; WIDTH * HEIGHT]),
            Bpp::Sixteen => Self::Sixteen(vec![0; WIDTH * HEIGHT]),
            Bpp::ThirtyTwo => Self::ThirtyTwo(vec![0; WIDTH * HEIGHT]),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Eight(p) => p.fill(0),
            Self::Sixteen(p) => p.fill(0),
            Self::ThirtyTwo(p) => p.fill(0),
        }
    }

    #[must_use]
    pub fn bpp(&self) -> Bpp {
        match self {
            Self::Eight(_) => Bpp::Eight,
            Self::Sixteen(_) => Bpp::Sixteen,
            Self::ThirtyTwo(_) => Bpp::ThirtyTwo,
        }
    }

    /// Encoded pixel at (x, y).
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        let i = y * WIDTH + x;
        match self {
            Self::Eight(p) => p.get(i).map_or(0, |v| v.encoded()),
            Self::Sixteen(p) => p.get(i).map_or(0, |v| v.encoded()),
            Self::ThirtyTwo(p) => p.get(i).map_or(0, |v| v.encoded()),
        }
    }

    /// Whole surface as 8-bit RGBA.
    #[must_use]
    pub fn to_rgba(&self, format: PixelFormat) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(WIDTH * HEIGHT * 4);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let [r, g, b] = format.decode(self.pixel(x, y));
                rgba.extend_from_slice(&[r, g, b, 0xFF]);
            }
        }
        rgba
    }
}

/// Paint the recorded frame onto its surface.
pub fn paint(frame: &mut Frame, memory: &Memory) {
    let Frame { lines, vsync_line, array, palette, decoder, surface, .. } = frame;
    let source = Source { lines: *lines, vsync_line: *vsync_line, array, palette, decoder, memory };
    match surface {
        Surface::Eight(p) => source.paint_into(p),
        Surface::Sixteen(p) => source.paint_into(p),
        Surface::ThirtyTwo(p) => source.paint_into(p),
    }
}

struct Source<'a> {
    lines: usize,
    vsync_line: usize,
    array: &'a [Scanline; FRAME_LINES],
    palette: &'a Palette,
    decoder: &'a Decoder,
    memory: &'a Memory,
}

impl Source<'_> {
    fn paint_into<P: Pixel>(&self, pixels: &mut [P]) {
        let lines = self.lines.clamp(1, FRAME_LINES);
        let visible = VISIBLE_LINES.min(lines);
        let mut chunks = pixels.chunks_exact_mut(WIDTH * 2);
        let mut last = &self.array[0];
        for (v, rows) in chunks.by_ref().take(visible).enumerate() {
            let line = &self.array[(self.vsync_line + VSYNC_TO_VISIBLE + v) % lines];
            let (row1, row2) = rows.split_at_mut(WIDTH);
            self.paint_line(line, row1, &self.palette.pixel1);
            self.paint_line(line, row2, &self.palette.pixel2);
            last = line;
        }
        // A frame shorter than the window leaves the rest in border colour.
        for rows in chunks.take(VISIBLE_LINES - visible) {
            let (row1, row2) = rows.split_at_mut(WIDTH);
            row1.fill(border_pixel(last, &self.palette.pixel1));
            row2.fill(border_pixel(last, &self.palette.pixel2));
        }
    }

    fn paint_line<P: Pixel>(&self, line: &Scanline, row: &mut [P], colours: &[u32; 32]) {
        let pen = |index: u8| P::from_encoded(colours[usize::from(line.ink[usize::from(index)] & 0x1F)]);
        let border = border_pixel(line, colours);
        let per_pen = 8 / Decoder::pixels_per_byte(line.mode);

        for (c, cell) in row.chunks_exact_mut(CHAR_WIDTH).enumerate() {
            let h = c as i32 + i32::from(line.h_sync) - H_OFFSET;
            if !line.displayed || h < 0 || h >= i32::from(line.h_displayed) {
                cell.fill(border);
                continue;
            }
            let base = video_address(line.ma.wrapping_add(h as u16), line.ra);
            let mut x = 0;
            for offset in 0..2 {
                let byte = self.memory.video_byte(base.wrapping_add(offset));
                for index in self.decoder.pens(line.mode, byte) {
                    cell[x..x + per_pen].fill(pen(index));
                    x += per_pen;
                }
            }
        }
    }
}

fn border_pixel<P: Pixel>(line: &Scanline, colours: &[u32; 32]) -> P {
    P::from_encoded(colours[usize::from(line.ink[BORDER] & 0x1F)])
}

/// RAM address of the first byte of character `ma` on raster `ra`.
#[must_use]
pub const fn video_address(ma: u16, ra: u8) -> u16 {
    ((ma & 0x3000) << 2) | (((ra & 7) as u16) << 11) | ((ma & 0x03FF) << 1)
}
