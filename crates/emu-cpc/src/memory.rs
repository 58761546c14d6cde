//! RAM and ROM bank storage.
//!
//! The CPC maps everything in 16K units. The machine owns every bank
//! here; the [`Pager`](crate::pager::Pager) only records which bank each
//! of the four CPU windows points at.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const BANK_SIZE: usize = 0x4000;

/// One 16K bank of RAM.
#[derive(Clone)]
pub struct RamBank(Box<[u8; BANK_SIZE]>);

impl RamBank {
    #[must_use]
    pub fn new() -> Self {
        Self(Box::new([0; BANK_SIZE]))
    }

    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    /// Copy `data` in from the start, truncated to 16K.
    pub fn load(&mut self, data: &[u8]) {
        let len = data.len().min(BANK_SIZE);
        self.0[..len].copy_from_slice(&data[..len]);
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8; BANK_SIZE] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, offset: usize) -> u8 {
        self.0[offset & (BANK_SIZE - 1)]
    }

    pub fn set(&mut self, offset: usize, data: u8) {
        self.0[offset & (BANK_SIZE - 1)] = data;
    }
}

impl Default for RamBank {
    fn default() -> Self {
        Self::new()
    }
}

/// One 16K ROM.
#[derive(Clone)]
pub struct RomBank(Box<[u8; BANK_SIZE]>);

impl RomBank {
    /// Wrap an image of exactly 16K.
    #[must_use]
    pub fn new(data: &[u8]) -> Option<Self> {
        let bytes: [u8; BANK_SIZE] = data.try_into().ok()?;
        Some(Self(Box::new(bytes)))
    }

    /// Read a 16K ROM image from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::new(&data).ok_or_else(|| Error::RomSize { path: path.to_path_buf(), size: data.len() })
    }

    /// Read a 32K system ROM image and split it into firmware and BASIC.
    pub fn load_pair(path: &Path) -> Result<(Self, Self)> {
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::split_pair(&data).ok_or_else(|| Error::RomSize { path: path.to_path_buf(), size: data.len() })
    }

    /// Split an exactly 32K image.
    #[must_use]
    pub fn split_pair(data: &[u8]) -> Option<(Self, Self)> {
        if data.len() != 2 * BANK_SIZE {
            return None;
        }
        let (lower, upper) = data.split_at(BANK_SIZE);
        Some((Self::new(lower)?, Self::new(upper)?))
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8; BANK_SIZE] {
        &self.0
    }
}

/// Every bank in the machine.
pub struct Memory {
    pub ram: Vec<RamBank>,
    /// Firmware, overlaid on window 0.
    pub lower_rom: RomBank,
    /// BASIC, overlaid on window 3 when no expansion ROM is selected.
    pub upper_rom: RomBank,
    /// Sparse expansion ROM table indexed by the ROM select byte.
    pub expansion: Vec<Option<RomBank>>,
}

impl Memory {
    #[must_use]
    pub fn new(banks: usize, lower_rom: RomBank, upper_rom: RomBank) -> Self {
        Self {
            ram: vec![RamBank::new(); banks],
            lower_rom,
            upper_rom,
            expansion: vec![None; 256],
        }
    }

    pub fn set_expansion(&mut self, slot: u8, rom: RomBank) {
        self.expansion[usize::from(slot)] = Some(rom);
    }

    #[must_use]
    pub fn expansion(&self, slot: u8) -> Option<&RomBank> {
        self.expansion.get(usize::from(slot))?.as_ref()
    }

    /// Installed RAM in kilobytes.
    #[must_use]
    pub fn kilobytes(&self) -> usize {
        self.ram.len() * 16
    }

    /// Read the base 64K the way the CRTC sees it, ignoring paging.
    #[must_use]
    pub fn video_byte(&self, addr: u16) -> u8 {
        let bank = usize::from(addr >> 14);
        self.ram.get(bank).map_or(0xFF, |b| b.get(usize::from(addr)))
    }

    pub fn clear_ram(&mut self) {
        self.ram.iter_mut().for_each(RamBank::clear);
    }
}
