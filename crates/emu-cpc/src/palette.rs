//! CPC hardware palette and monitor emulation.
//!
//! The gate array drives each RGB gun at one of three levels, giving 27
//! distinct colours spread over 32 hardware ink numbers. A monitor turns
//! those into host pixels: colour monitors pass RGB through, green and
//! gray monitors show luminance only.

use crate::config::{Bpp, MonitorType};

/// Gun levels (red, green, blue) for each hardware ink, 0 = off, 2 = full.
const LEVELS: [(u8, u8, u8); 32] = [
    (1, 1, 1), // 0x00 white
    (1, 1, 1), // 0x01 white
    (0, 2, 1), // 0x02 sea green
    (2, 2, 1), // 0x03 pastel yellow
    (0, 0, 1), // 0x04 blue
    (2, 0, 1), // 0x05 purple
    (0, 1, 1), // 0x06 cyan
    (2, 1, 1), // 0x07 pink
    (2, 0, 1), // 0x08 purple
    (2, 2, 1), // 0x09 pastel yellow
    (2, 2, 0), // 0x0A bright yellow
    (2, 2, 2), // 0x0B bright white
    (2, 0, 0), // 0x0C bright red
    (2, 0, 2), // 0x0D bright magenta
    (2, 1, 0), // 0x0E orange
    (2, 1, 2), // 0x0F pastel magenta
    (0, 0, 1), // 0x10 blue
    (0, 2, 1), // 0x11 sea green
    (0, 2, 0), // 0x12 bright green
    (0, 2, 2), // 0x13 bright cyan
    (0, 0, 0), // 0x14 black
    (0, 0, 2), // 0x15 bright blue
    (0, 1, 0), // 0x16 green
    (0, 1, 2), // 0x17 sky blue
    (1, 0, 1), // 0x18 magenta
    (1, 2, 1), // 0x19 pastel green
    (1, 2, 0), // 0x1A lime
    (1, 2, 2), // 0x1B pastel cyan
    (1, 0, 0), // 0x1C red
    (1, 0, 2), // 0x1D mauve
    (1, 1, 0), // 0x1E yellow
    (1, 1, 2), // 0x1F pastel blue
];

const fn intensity(level: u8) -> u8 {
    match level {
        0 => 0x00,
        1 => 0x80,
        _ => 0xFF,
    }
}

/// 8-bit RGB of a hardware ink on a colour monitor.
#[must_use]
pub const fn hardware_rgb(ink: u8) -> [u8; 3] {
    let (r, g, b) = LEVELS[(ink & 0x1F) as usize];
    [intensity(r), intensity(g), intensity(b)]
}

/// How a monitor renders colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phosphor {
    Rgb,
    Green,
    Gray,
}

impl From<MonitorType> for Phosphor {
    fn from(monitor: MonitorType) -> Self {
        match monitor {
            MonitorType::Color | MonitorType::Ctm640 | MonitorType::Ctm644 | MonitorType::Cm14 => Self::Rgb,
            MonitorType::Green | MonitorType::Gt64 | MonitorType::Gt65 => Self::Green,
            MonitorType::Gray | MonitorType::Mm12 => Self::Gray,
        }
    }
}

impl Phosphor {
    #[must_use]
    pub fn render(self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        let luma = || ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8;
        match self {
            Self::Rgb => [r, g, b],
            Self::Green => [0, luma(), 0],
            Self::Gray => {
                let y = luma();
                [y, y, y]
            }
        }
    }
}

/// Host pixel encoding for a surface depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb332,
    Rgb565,
    Argb8888,
}

impl From<Bpp> for PixelFormat {
    fn from(bpp: Bpp) -> Self {
        match bpp {
            Bpp::Eight => Self::Rgb332,
            Bpp::Sixteen => Self::Rgb565,
            Bpp::ThirtyTwo => Self::Argb8888,
        }
    }
}

impl PixelFormat {
    #[must_use]
    pub fn encode(self, [r, g, b]: [u8; 3]) -> u32 {
        let (r, g, b) = (u32::from(r), u32::from(g), u32::from(b));
        match self {
            Self::Rgb332 => (r & 0xE0) | ((g >> 3) & 0x1C) | (b >> 6),
            Self::Rgb565 => ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3),
            Self::Argb8888 => 0xFF00_0000 | (r << 16) | (g << 8) | b,
        }
    }

    /// Expand a pixel back to 8-bit RGB, for screenshots.
    #[must_use]
    pub fn decode(self, pixel: u32) -> [u8; 3] {
        let scale = |value: u32, max: u32| (value * 255 / max) as u8;
        match self {
            Self::Rgb332 => [scale((pixel >> 5) & 7, 7), scale((pixel >> 2) & 7, 7), scale(pixel & 3, 3)],
            Self::Rgb565 => [
                scale((pixel >> 11) & 0x1F, 31),
                scale((pixel >> 5) & 0x3F, 63),
                scale(pixel & 0x1F, 31),
            ],
            Self::Argb8888 => [(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8],
        }
    }
}

/// Encoded pixels for all 32 hardware inks: full intensity for even
/// surface rows, three-quarter intensity for odd rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub format: PixelFormat,
    pub pixel1: [u32; 32],
    pub pixel2: [u32; 32],
}

impl Palette {
    #[must_use]
    pub fn new(monitor: MonitorType, bpp: Bpp) -> Self {
        let phosphor = Phosphor::from(monitor);
        let format = PixelFormat::from(bpp);
        let mut pixel1 = [0; 32];
        let mut pixel2 = [0; 32];
        for ink in 0..32u8 {
            let rgb = phosphor.render(hardware_rgb(ink));
            pixel1[usize::from(ink)] = format.encode(rgb);
            pixel2[usize::from(ink)] = format.encode(rgb.map(|c| (u16::from(c) * 3 / 4) as u8));
        }
        Self { format, pixel1, pixel2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_levels() {
        assert_eq!(hardware_rgb(0x14), [0, 0, 0]);
        assert_eq!(hardware_rgb(0x0B), [0xFF, 0xFF, 0xFF]);
        assert_eq!(hardware_rgb(0x04), [0, 0, 0x80]);
        assert_eq!(hardware_rgb(0x0E), [0xFF, 0x80, 0]);
        assert_eq!(hardware_rgb(0x54), hardware_rgb(0x14));
    }

    #[test]
    fn monitor_phosphors() {
        assert_eq!(Phosphor::from(MonitorType::Ctm644), Phosphor::Rgb);
        assert_eq!(Phosphor::from(MonitorType::Gt65), Phosphor::Green);
        assert_eq!(Phosphor::from(MonitorType::Mm12), Phosphor::Gray);
        assert_eq!(Phosphor::Green.render([0xFF, 0xFF, 0xFF]), [0, 0xFF, 0]);
        assert_eq!(Phosphor::Gray.render([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn encodings() {
        let white = [0xFF, 0xFF, 0xFF];
        assert_eq!(PixelFormat::Rgb332.encode(white), 0xFF);
        assert_eq!(PixelFormat::Rgb565.encode(white), 0xFFFF);
        assert_eq!(PixelFormat::Argb8888.encode(white), 0xFFFF_FFFF);
        assert_eq!(PixelFormat::Rgb565.decode(0xFFFF), white);
        assert_eq!(PixelFormat::Rgb332.decode(0x00), [0, 0, 0]);
        assert_eq!(PixelFormat::Argb8888.decode(0xFF12_3456), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn second_row_is_dimmer() {
        let palette = Palette::new(MonitorType::Color, Bpp::ThirtyTwo);
        assert_eq!(palette.pixel1[0x0B], 0xFFFF_FFFF);
        assert_eq!(palette.pixel2[0x0B], 0xFFBF_BFBF);
        assert_eq!(palette.pixel2[0x14], 0xFF00_0000);
    }
}
