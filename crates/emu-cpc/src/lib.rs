//! Amstrad CPC 464/664/6128 emulator.
//!
//! The machine is driven one video frame at a time. Within a frame the
//! CRTC character clock (1 MHz) is the master: each tick clocks the CRTC,
//! grants the Z80 four T-states and clocks the PSG. Mode and ink changes
//! are latched per raster line at hsync, and the finished frame is painted
//! from RAM in one pass.

mod bus;
pub mod capture;
pub mod config;
mod cpc;
mod error;
mod fdc;
mod frame;
pub mod keyboard;
pub mod keyboard_map;
mod memory;
mod pager;
pub mod palette;
pub mod sna;
pub mod timer;
pub mod video;

pub use bus::{Board, CpcBus, PsgFunction, Signals};
pub use config::{
    Bpp, CompanyName, CpcConfig, KeyboardType, LogLevel, MachineType, MemorySize, MonitorType,
    RefreshRate,
};
pub use cpc::{CHARS_PER_LINE, Cpc, Roms};
pub use error::{Error, Result, SnapshotError};
pub use fdc::Fdc;
pub use frame::{FRAME_LINES, Frame, Scanline};
pub use keyboard::{CpcKey, Keyboard};
pub use memory::{BANK_SIZE, Memory, RamBank, RomBank};
pub use nec_upd765::DiskFormat;
pub use pager::{Bank, Pager};
pub use timer::FrameTimer;
pub use video::Surface;
