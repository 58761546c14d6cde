//! Machine configuration.
//!
//! Every field has a default, so a JSON config file only needs the keys
//! it changes. Enum values use kebab-case names, which are also what the
//! command line accepts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{LevelFilter, warn};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Implements `FromStr` over a fixed set of lower-case names.
macro_rules! named {
    ($ty:ident { $($variant:ident => $($name:literal)|+),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.to_ascii_lowercase().as_str() {
                    $($($name)|+ => Ok(Self::$variant),)+
                    other => Err(Error::Config(format!(
                        "unknown {} {other:?}",
                        stringify!($ty)
                    ))),
                }
            }
        }
    };
}

/// Manufacturer name strapped onto PPI port B bits 3:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum CompanyName {
    Isp = 0,
    Triumph = 1,
    Saisho = 2,
    Solavox = 3,
    Awa = 4,
    Schneider = 5,
    Orion = 6,
    #[default]
    Amstrad = 7,
}

named!(CompanyName {
    Isp => "isp",
    Triumph => "triumph",
    Saisho => "saisho",
    Solavox => "solavox",
    Awa => "awa",
    Schneider => "schneider",
    Orion => "orion",
    Amstrad => "amstrad",
});

impl CompanyName {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineType {
    Cpc464,
    Cpc664,
    #[default]
    Cpc6128,
}

named!(MachineType {
    Cpc464 => "cpc464" | "464",
    Cpc664 => "cpc664" | "664",
    Cpc6128 => "cpc6128" | "6128",
});

impl MachineType {
    #[must_use]
    pub const fn default_memory(self) -> MemorySize {
        match self {
            Self::Cpc464 | Self::Cpc664 => MemorySize::K64,
            Self::Cpc6128 => MemorySize::K128,
        }
    }

    /// Disc machines carry the FDC and ship with AMSDOS in expansion
    /// slot 7.
    #[must_use]
    pub const fn has_disc(self) -> bool {
        !matches!(self, Self::Cpc464)
    }

    /// Machine code stored in snapshots.
    #[must_use]
    pub const fn snapshot_code(self) -> u8 {
        match self {
            Self::Cpc464 => 0,
            Self::Cpc664 => 1,
            Self::Cpc6128 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorType {
    #[default]
    Color,
    Green,
    Gray,
    Ctm640,
    Ctm644,
    Gt64,
    Gt65,
    Cm14,
    Mm12,
}

named!(MonitorType {
    Color => "color" | "colour",
    Green => "green",
    Gray => "gray" | "grey",
    Ctm640 => "ctm640",
    Ctm644 => "ctm644",
    Gt64 => "gt64",
    Gt65 => "gt65",
    Cm14 => "cm14",
    Mm12 => "mm12",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RefreshRate {
    #[default]
    #[serde(rename = "50hz")]
    Hz50,
    #[serde(rename = "60hz")]
    Hz60,
}

named!(RefreshRate {
    Hz50 => "50hz" | "50",
    Hz60 => "60hz" | "60",
});

impl RefreshRate {
    /// Scanlines per frame.
    #[must_use]
    pub const fn lines(self) -> usize {
        match self {
            Self::Hz50 => 312,
            Self::Hz60 => 262,
        }
    }

    /// Level of the PPI port B refresh strap (set on 50 Hz machines).
    #[must_use]
    pub const fn strap(self) -> u8 {
        match self {
            Self::Hz50 => 1,
            Self::Hz60 => 0,
        }
    }

    #[must_use]
    pub const fn frame_period(self) -> Duration {
        match self {
            Self::Hz50 => Duration::from_micros(20_000),
            Self::Hz60 => Duration::from_micros(16_667),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyboardType {
    #[default]
    English,
    French,
    German,
    Spanish,
    Danish,
}

named!(KeyboardType {
    English => "english" | "qwerty",
    French => "french" | "azerty",
    German => "german" | "qwertz",
    Spanish => "spanish",
    Danish => "danish",
});

/// Installed RAM. Anything above 64K pages through the gate array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum MemorySize {
    #[serde(rename = "64k")]
    K64,
    #[serde(rename = "128k")]
    K128,
    #[serde(rename = "192k")]
    K192,
    #[serde(rename = "256k")]
    K256,
    #[serde(rename = "320k")]
    K320,
    #[serde(rename = "384k")]
    K384,
    #[serde(rename = "448k")]
    K448,
    #[serde(rename = "512k")]
    K512,
}

impl MemorySize {
    pub const ALL: [Self; 8] = [
        Self::K64,
        Self::K128,
        Self::K192,
        Self::K256,
        Self::K320,
        Self::K384,
        Self::K448,
        Self::K512,
    ];

    #[must_use]
    pub const fn kilobytes(self) -> usize {
        (self as usize + 1) * 64
    }

    /// Number of 16K RAM banks.
    #[must_use]
    pub const fn banks(self) -> usize {
        self.kilobytes() / 16
    }

    pub fn from_kilobytes(size: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.kilobytes() == size)
            .ok_or(Error::RamSize { size })
    }
}

impl FromStr for MemorySize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim_end_matches(['k', 'K']);
        let size = digits
            .parse()
            .map_err(|_| Error::Config(format!("unknown MemorySize {s:?}")))?;
        Self::from_kilobytes(size)
    }
}

/// Log severities of the emulator, mapped onto `log` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Quiet,
    Error,
    Alert,
    #[default]
    Print,
    Trace,
    Debug,
}

named!(LogLevel {
    Quiet => "quiet",
    Error => "error",
    Alert => "alert",
    Print => "print",
    Trace => "trace",
    Debug => "debug",
});

impl LogLevel {
    /// Debug is the most verbose level here, trace the most verbose in `log`,
    /// so the two swap places.
    #[must_use]
    pub const fn filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Alert => LevelFilter::Warn,
            Self::Print => LevelFilter::Info,
            Self::Trace => LevelFilter::Debug,
            Self::Debug => LevelFilter::Trace,
        }
    }
}

/// Bits per pixel of the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum Bpp {
    Eight,
    Sixteen,
    #[default]
    ThirtyTwo,
}

impl TryFrom<u8> for Bpp {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            32 => Ok(Self::ThirtyTwo),
            other => Err(Error::Config(format!("unsupported depth {other} bpp"))),
        }
    }
}

impl FromStr for Bpp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bits: u8 = s
            .parse()
            .map_err(|_| Error::Config(format!("unsupported depth {s:?}")))?;
        Self::try_from(bits)
    }
}

/// Everything needed to build a machine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CpcConfig {
    pub company: CompanyName,
    pub machine: MachineType,
    pub monitor: MonitorType,
    pub refresh: RefreshRate,
    pub keyboard: KeyboardType,
    /// Installed RAM; the machine type decides when absent.
    pub memory: Option<MemorySize>,
    /// Run as fast as possible instead of pacing to the refresh rate.
    pub turbo: bool,
    pub log_level: LogLevel,
    pub bpp: Bpp,
    /// 32K image: firmware in the lower half, BASIC in the upper.
    pub system_rom: Option<PathBuf>,
    pub amsdos_rom: Option<PathBuf>,
    /// Expansion ROM slots 0-15.
    pub expansion_roms: BTreeMap<u8, PathBuf>,
    pub drive0: Option<PathBuf>,
    pub drive1: Option<PathBuf>,
}

impl CpcConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn memory_size(&self) -> MemorySize {
        self.memory.unwrap_or(self.machine.default_memory())
    }

    /// Expansion slots to populate. On disc machines AMSDOS lands in
    /// slot 7 unless that slot is configured explicitly; a 464 ignores it.
    pub fn expansion_slots(&self) -> Result<BTreeMap<u8, PathBuf>> {
        if let Some(slot) = self.expansion_roms.keys().find(|&&slot| slot > 15) {
            return Err(Error::Config(format!("expansion ROM slot {slot} out of range 0-15")));
        }
        let mut slots = self.expansion_roms.clone();
        match &self.amsdos_rom {
            Some(amsdos) if self.machine.has_disc() => {
                slots.entry(7).or_insert_with(|| amsdos.clone());
            }
            Some(amsdos) => warn!("{:?} has no disc interface, ignoring {}", self.machine, amsdos.display()),
            None => {}
        }
        Ok(slots)
    }
}
