//! Headless capture: PNG screenshots and WAV audio dumps.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use crate::bus::SAMPLE_RATE;
use crate::cpc::Cpc;
use crate::error::{Error, Result};
use crate::palette::PixelFormat;
use crate::video::{HEIGHT, WIDTH};

/// Save the current surface as an RGBA PNG.
pub fn save_screenshot(cpc: &Cpc, path: &Path) -> Result<()> {
    let surface = cpc.surface();
    let rgba = surface.to_rgba(PixelFormat::from(surface.bpp()));

    let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), WIDTH as u32, HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgba)?;
    Ok(())
}

/// Save stereo samples as 16-bit PCM at the PSG output rate.
pub fn save_audio(samples: &[[f32; 2]], path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in samples {
        for &sample in frame {
            writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
