//! Top-level CPC system.
//!
//! The CRTC character clock runs at 1 MHz and the Z80 at 4 MHz, so each
//! character clock grants the CPU four T-states. A frame is one pass over
//! 312 (50 Hz) or 262 (60 Hz) raster lines of 64 characters:
//!
//! 1. record the CRTC addressing of the line
//! 2. 64 times: clock the CRTC, deliver any gate array interrupt, run the
//!    CPU for 4 T-states, clock the PSG
//!
//! After the last line the FDC is clocked once and the frame is painted.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use emu_core::{Cpu, Observable, Value};
use log::{debug, info, trace, warn};
use nec_upd765::DiskFormat;
use zilog_z80::Z80;

use crate::bus::{CpcBus, Signals};
use crate::config::{CpcConfig, MachineType};
use crate::error::{Error, Result};
use crate::frame::{Beam, Frame};
use crate::keyboard::CpcKey;
use crate::keyboard_map::{Layout, map_key};
use crate::memory::{Memory, RomBank};
use crate::sna;
use crate::video::{self, Surface};

/// CRTC character clocks per raster line.
pub const CHARS_PER_LINE: usize = 64;
/// Z80 T-states per character clock.
const CPU_QUANTUM: u32 = 4;

/// ROM images for a machine.
pub struct Roms {
    /// Firmware.
    pub lower: RomBank,
    /// BASIC.
    pub upper: RomBank,
    pub expansions: BTreeMap<u8, RomBank>,
}

impl Roms {
    /// Load the system ROM and every configured expansion ROM.
    pub fn load(config: &CpcConfig) -> Result<Self> {
        let path = config
            .system_rom
            .as_deref()
            .ok_or_else(|| Error::Config("no system ROM configured".into()))?;
        let (lower, upper) = RomBank::load_pair(path)?;
        let mut expansions = BTreeMap::new();
        for (slot, path) in config.expansion_slots()? {
            trace!("expansion ROM {slot}: {}", path.display());
            expansions.insert(slot, RomBank::load(&path)?);
        }
        Ok(Self { lower, upper, expansions })
    }

    /// Build from an in-memory 32K system image.
    pub fn from_system(data: &[u8]) -> Result<Self> {
        let (lower, upper) = RomBank::split_pair(data)
            .ok_or_else(|| Error::Config(format!("system ROM must be 32K, got {} bytes", data.len())))?;
        Ok(Self { lower, upper, expansions: BTreeMap::new() })
    }
}

pub struct Cpc {
    pub(crate) cpu: Z80,
    pub(crate) bus: CpcBus,
    pub(crate) frame: Frame,
    machine: MachineType,
    layout: Layout,
    frame_count: u64,
}

impl Cpc {
    /// Build and reset a machine. Disks named in the config are inserted.
    pub fn new(config: &CpcConfig, roms: Roms) -> Result<Self> {
        let size = config.memory_size();
        let mut memory = Memory::new(size.banks(), roms.lower, roms.upper);
        for (slot, rom) in roms.expansions {
            memory.set_expansion(slot, rom);
        }
        let signals = Signals {
            refresh: config.refresh.strap(),
            company: config.company.code(),
            ..Signals::default()
        };

        let mut cpc = Self {
            cpu: Z80::new(),
            bus: CpcBus::new(memory, signals),
            frame: Frame::new(config.refresh, config.monitor, config.bpp),
            machine: config.machine,
            layout: Layout::from(config.keyboard),
            frame_count: 0,
        };
        cpc.bus.disc = config.machine.has_disc();
        cpc.reset();

        for (drive, path) in [&config.drive0, &config.drive1].into_iter().enumerate() {
            let Some(path) = path else { continue };
            if cpc.bus.disc {
                cpc.insert_drive(drive, path)?;
            } else {
                warn!("{:?} has no disc interface, ignoring {}", config.machine, path.display());
            }
        }

        info!(
            "{:?} with {}K RAM, {:?} monitor, {} lines per frame",
            config.machine,
            size.kilobytes(),
            config.monitor,
            config.refresh.lines()
        );
        Ok(cpc)
    }

    /// Reset every chip. RAM, ROMs and disks are kept.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
        self.frame.reset();
        trace!("machine reset");
    }

    /// Run one video frame.
    pub fn clock(&mut self) {
        self.frame.index = 0;
        for _ in 0..self.frame.lines {
            self.frame.begin_line(&self.bus.crtc);
            for _ in 0..CHARS_PER_LINE {
                let mut beam = Beam {
                    gate_array: &mut self.bus.gate_array,
                    frame: &mut self.frame,
                    signals: &mut self.bus.board.signals,
                    interrupt: false,
                };
                self.bus.crtc.clock(&mut beam);
                if beam.interrupt {
                    self.cpu.pulse_int();
                }
                self.cpu.clock(&mut self.bus, CPU_QUANTUM);
                self.bus.board.psg.clock();
            }
            self.frame.end_line();
        }
        self.bus.fdc.clock();
        video::paint(&mut self.frame, &self.bus.memory);
        self.frame_count += 1;
    }

    #[must_use]
    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &CpcBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut CpcBus {
        &mut self.bus
    }

    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.frame.surface
    }

    #[must_use]
    pub fn machine(&self) -> MachineType {
        self.machine
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Stereo samples produced since the last call.
    pub fn take_audio(&mut self) -> Vec<[f32; 2]> {
        self.bus.board.psg.take_buffer()
    }

    // --- input ---

    pub fn press_key(&mut self, key: CpcKey) {
        self.bus.board.keyboard.set_key(key, true);
    }

    pub fn release_key(&mut self, key: CpcKey) {
        self.bus.board.keyboard.set_key(key, false);
    }

    pub fn release_all_keys(&mut self) {
        self.bus.board.keyboard.release_all();
    }

    /// Press or release a host key through the configured layout.
    /// Returns false for keys with no CPC equivalent.
    pub fn host_key(&mut self, name: &str, pressed: bool) -> bool {
        match map_key(name, self.layout) {
            Some(key) => {
                self.bus.board.keyboard.set_key(key, pressed);
                true
            }
            None => {
                debug!("unmapped host key {name:?}");
                false
            }
        }
    }

    // --- disks ---

    /// Insert an image file into a drive. An empty path ejects.
    pub fn insert_drive(&mut self, drive: usize, path: &Path) -> Result<()> {
        self.require_disc(path)?;
        self.bus.fdc.insert(drive, path)
    }

    /// Eject a drive, writing back unsaved changes.
    pub fn remove_drive(&mut self, drive: usize) -> Result<()> {
        self.bus.fdc.remove(drive)
    }

    #[must_use]
    pub fn drive_filename(&self, drive: usize) -> Option<&Path> {
        self.bus.fdc.filename(drive)
    }

    pub fn create_disk(&mut self, drive: usize, path: &Path, format: DiskFormat) -> Result<()> {
        self.require_disc(path)?;
        self.bus.fdc.create_disk(drive, path, format)
    }

    fn require_disc(&self, path: &Path) -> Result<()> {
        if self.bus.disc {
            Ok(())
        } else {
            Err(Error::Disk { path: path.to_path_buf(), reason: format!("{:?} has no disc interface", self.machine) })
        }
    }

    /// Eject every drive, saving modified images.
    pub fn shutdown(&mut self) -> Result<()> {
        self.bus.fdc.flush()
    }

    // --- snapshots ---

    /// Restore from snapshot bytes. On failure the machine is reset.
    pub fn load_snapshot_bytes(&mut self, data: &[u8]) -> Result<()> {
        match sna::load(self, data) {
            Ok(()) => {
                info!("snapshot loaded");
                Ok(())
            }
            Err(e) => {
                self.reset();
                Err(e.into())
            }
        }
    }

    pub fn load_snapshot(&mut self, path: &Path) -> Result<()> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                self.reset();
                return Err(Error::io(path, e));
            }
        };
        self.load_snapshot_bytes(&data)?;
        info!("snapshot {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        sna::save(self)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        fs::write(path, self.snapshot()).map_err(|e| Error::io(path, e))?;
        info!("snapshot saved to {}", path.display());
        Ok(())
    }
}

fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = text.strip_prefix('$') {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

impl Observable for Cpc {
    fn query(&self, path: &str) -> Option<Value> {
        let bus = &self.bus;
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("crtc.") {
            let crtc = &bus.crtc;
            match rest {
                "address" => Some(crtc.address.into()),
                "h_counter" => Some(crtc.h_counter.into()),
                "v_counter" => Some(crtc.v_counter.into()),
                "scanline" => Some(crtc.scanline.into()),
                "hsync" => Some(crtc.hsync.into()),
                "vsync" => Some(crtc.vsync.into()),
                "start_address" => Some(crtc.start_address().into()),
                other => {
                    let index: usize = other.strip_prefix('r')?.parse().ok()?;
                    (index < 18).then(|| crtc.peek(index).into())
                }
            }
        } else if let Some(rest) = path.strip_prefix("vga.") {
            let ga = &bus.gate_array;
            match rest {
                "pen" => Some(ga.pen.into()),
                "rmr" => Some(ga.rmr.into()),
                "mode" => Some(ga.mode().into()),
                "counter" => Some(ga.counter.into()),
                "delayed" => Some(ga.delayed.into()),
                "inks" => Some(Value::Array(ga.ink.iter().map(|&i| i.into()).collect())),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("pager.") {
            match rest {
                "ram_conf" => Some(bus.pager.ram_conf.into()),
                "rom_conf" => Some(bus.pager.rom_conf.into()),
                "banks" => Some(Value::Array(
                    bus.pager.ram_map().iter().map(|&b| Value::U8(b as u8)).collect(),
                )),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("frame.") {
            match rest {
                "index" => Some((self.frame.index as u32).into()),
                "lines" => Some((self.frame.lines as u32).into()),
                "vsync_line" => Some((self.frame.vsync_line as u32).into()),
                "count" => Some(self.frame_count.into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("fdc.") {
            let fdc = &bus.fdc;
            match rest {
                "motor" => Some(fdc.controller.motor().into()),
                "status" => Some(fdc.rd_stat().into()),
                "ticks" => Some(fdc.controller.ticks().into()),
                "drive0" | "drive1" => {
                    let drive = usize::from(rest.ends_with('1'));
                    Some(fdc.filename(drive).map_or_else(String::new, |p| p.display().to_string()).into())
                }
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|addr| Value::U8(bus.peek(addr)))
        } else {
            match path {
                "machine" => Some(format!("{:?}", self.machine).into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<z80_paths>",
            "crtc.address",
            "crtc.h_counter",
            "crtc.v_counter",
            "crtc.scanline",
            "crtc.hsync",
            "crtc.vsync",
            "crtc.start_address",
            "crtc.r<0-17>",
            "vga.pen",
            "vga.rmr",
            "vga.mode",
            "vga.counter",
            "vga.delayed",
            "vga.inks",
            "pager.ram_conf",
            "pager.rom_conf",
            "pager.banks",
            "frame.index",
            "frame.lines",
            "frame.vsync_line",
            "frame.count",
            "fdc.motor",
            "fdc.status",
            "fdc.ticks",
            "fdc.drive0",
            "fdc.drive1",
            "memory.<address>",
            "machine",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BANK_SIZE;

    /// Firmware that disables interrupts and halts.
    fn make_cpc(config: &CpcConfig) -> Cpc {
        let mut system = vec![0u8; 2 * BANK_SIZE];
        system[0] = 0xF3;
        system[1] = 0x76;
        let roms = Roms::from_system(&system).expect("roms");
        Cpc::new(config, roms).expect("cpc")
    }

    #[test]
    fn frame_runs_every_line() {
        let mut cpc = make_cpc(&CpcConfig::default());
        cpc.clock();
        assert_eq!(cpc.frame().index, 312);
        assert_eq!(cpc.bus().fdc.controller.ticks(), 1);
        assert_eq!(cpc.frame_count(), 1);
        assert!(cpc.cpu().regs.halted);
    }

    #[test]
    fn cpu_gets_four_ticks_per_character() {
        let mut cpc = make_cpc(&CpcConfig::default());
        cpc.clock();
        let ticks = cpc.cpu().total_ticks().get();
        let expected = (312 * 64 * 4) as u64;
        assert!((expected..expected + 24).contains(&ticks), "{ticks} T-states");
    }

    #[test]
    fn sixty_hz_frame_is_shorter() {
        let config = CpcConfig { refresh: crate::config::RefreshRate::Hz60, ..CpcConfig::default() };
        let mut cpc = make_cpc(&config);
        cpc.clock();
        assert_eq!(cpc.frame().index, 262);
    }

    #[test]
    fn audio_is_produced() {
        let mut cpc = make_cpc(&CpcConfig::default());
        cpc.clock();
        let samples = cpc.take_audio();
        assert!((880..=884).contains(&samples.len()), "{} samples", samples.len());
    }

    #[test]
    fn rom_size_is_checked() {
        assert!(Roms::from_system(&[0; 100]).is_err());
        assert!(Roms::load(&CpcConfig::default()).is_err());
    }

    #[test]
    fn host_keys_follow_layout() {
        let config = CpcConfig { keyboard: crate::config::KeyboardType::French, ..CpcConfig::default() };
        let mut cpc = make_cpc(&config);
        assert!(cpc.host_key("a", true));
        assert!(cpc.bus().board.keyboard.is_pressed(CpcKey::Q));
        assert!(!cpc.host_key("scroll_lock", true));
    }

    #[test]
    fn observable_paths() {
        let cpc = make_cpc(&CpcConfig::default());
        assert_eq!(cpc.query("cpu.pc"), Some(Value::U16(0)));
        assert_eq!(cpc.query("memory.0x0000"), Some(Value::U8(0xF3)));
        assert_eq!(cpc.query("memory.$0001"), Some(Value::U8(0x76)));
        assert_eq!(cpc.query("crtc.r1"), Some(Value::U8(40)));
        assert_eq!(cpc.query("crtc.r18"), None);
        assert_eq!(cpc.query("frame.lines"), Some(Value::U32(312)));
        assert_eq!(cpc.query("fdc.motor"), Some(Value::Bool(false)));
        assert_eq!(cpc.query("fdc.drive0"), Some(Value::String(String::new())));
        assert_eq!(cpc.query("vga.pen"), Some(Value::U8(0)));
        assert!(cpc.query("pager.banks").is_some());
        assert_eq!(cpc.query("nope"), None);
        assert!(!cpc.dump().is_empty());
    }
}
