//! Disk drives as seen by the machine.
//!
//! Wraps the uPD765A with the file side of things: which image file sits
//! in which drive, loading it, and writing it back when it is removed
//! with unsaved changes. The CPC wires two drives, A and B.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, trace};
use nec_upd765::{DiskFormat, DskImage, Upd765};

use crate::error::{Error, Result};

pub const DRIVES: usize = 2;

pub struct Fdc {
    pub controller: Upd765,
    files: [Option<PathBuf>; DRIVES],
    idle_reported: bool,
}

impl Default for Fdc {
    fn default() -> Self {
        Self::new()
    }
}

impl Fdc {
    #[must_use]
    pub fn new() -> Self {
        let mut controller = Upd765::new();
        for unit in 0..DRIVES {
            controller.attach(unit);
        }
        Self { controller, files: [None, None], idle_reported: false }
    }

    /// Abort any command and stop the motor. Disks stay in their drives.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.idle_reported = false;
    }

    /// Load an image file into `drive`. An empty path ejects instead.
    pub fn insert(&mut self, drive: usize, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return self.remove(drive);
        }
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        let image = DskImage::parse(&data).map_err(|e| Error::Disk { path: path.to_path_buf(), reason: e.to_string() })?;
        self.remove(drive)?;
        self.mount(drive, path, image)?;
        info!("drive {}: inserted {}", drive_letter(drive), path.display());
        Ok(())
    }

    /// Eject the disk in `drive`, saving it first if it was modified.
    /// If the save fails the disk stays in the drive.
    pub fn remove(&mut self, drive: usize) -> Result<()> {
        if let (Some(Some(path)), Some(image)) = (self.files.get(drive), self.controller.disk(drive))
            && image.is_dirty()
        {
            fs::write(path, image.to_bytes()).map_err(|e| Error::io(path, e))?;
            info!("drive {}: saved {}", drive_letter(drive), path.display());
        }
        let file = self.files.get_mut(drive).and_then(Option::take);
        if self.controller.eject(drive).is_none() {
            return Ok(());
        }
        match file {
            Some(path) => info!("drive {}: removed {}", drive_letter(drive), path.display()),
            None => trace!("drive {}: removed unnamed disk", drive_letter(drive)),
        }
        Ok(())
    }

    /// Eject every drive, saving modified images. Every drive is tried;
    /// the first failure is returned and that disk stays mounted.
    pub fn flush(&mut self) -> Result<()> {
        let mut first = Ok(());
        for drive in 0..DRIVES {
            if let Err(e) = self.remove(drive) {
                error!("drive {}: {e}", drive_letter(drive));
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }

    #[must_use]
    pub fn filename(&self, drive: usize) -> Option<&Path> {
        self.files.get(drive)?.as_deref()
    }

    /// Write a freshly formatted image to `path` and insert it.
    pub fn create_disk(&mut self, drive: usize, path: &Path, format: DiskFormat) -> Result<()> {
        let image = DskImage::formatted(format);
        fs::write(path, image.to_bytes()).map_err(|e| Error::io(path, e))?;
        self.remove(drive)?;
        self.mount(drive, path, image)?;
        info!("drive {}: created {:?} disk {}", drive_letter(drive), format, path.display());
        Ok(())
    }

    fn mount(&mut self, drive: usize, path: &Path, image: DskImage) -> Result<()> {
        let slot = self.files.get_mut(drive).ok_or_else(|| no_drive(drive, path))?;
        self.controller.insert(drive, image).map_err(|_| no_drive(drive, path))?;
        *slot = Some(path.to_path_buf());
        Ok(())
    }

    pub fn set_motor(&mut self, on: bool) {
        if on != self.controller.motor() {
            trace!("fdc motor {}", if on { "on" } else { "off" });
        }
        self.controller.set_motor(on);
    }

    #[must_use]
    pub fn rd_stat(&self) -> u8 {
        self.controller.read_msr()
    }

    /// The main status register is read-only.
    pub fn wr_stat(&mut self, _data: u8) {}

    pub fn rd_data(&mut self) -> u8 {
        self.controller.read_data()
    }

    pub fn wr_data(&mut self, data: u8) {
        self.controller.write_data(data);
    }

    /// Once per frame.
    pub fn clock(&mut self) {
        self.controller.clock();
        let spinning_empty = self.controller.motor() && self.controller.disk(0).is_none();
        if spinning_empty && !self.idle_reported {
            debug!("fdc motor running with drive A empty");
        }
        self.idle_reported = spinning_empty;
    }
}

fn drive_letter(drive: usize) -> char {
    char::from(b'A' + (drive as u8 & 3))
}

fn no_drive(drive: usize, path: &Path) -> Error {
    Error::Disk { path: path.to_path_buf(), reason: format!("no drive {}", drive_letter(drive)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("emu-cpc-{}-{name}", std::process::id()))
    }

    #[test]
    fn drives_a_and_b_are_attached() {
        let fdc = Fdc::new();
        assert!(fdc.controller.is_attached(0));
        assert!(fdc.controller.is_attached(1));
        assert!(!fdc.controller.is_attached(2));
    }

    #[test]
    fn create_insert_and_remove() {
        let path = temp_path("create.dsk");
        let mut fdc = Fdc::new();
        fdc.create_disk(1, &path, DiskFormat::Data).expect("create");
        assert_eq!(fdc.filename(1), Some(path.as_path()));
        assert!(fdc.controller.disk(1).is_some());

        fdc.remove(1).expect("remove");
        assert_eq!(fdc.filename(1), None);
        assert!(fdc.controller.disk(1).is_none());

        fdc.insert(0, &path).expect("insert");
        assert_eq!(fdc.filename(0), Some(path.as_path()));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_path_ejects() {
        let path = temp_path("eject.dsk");
        let mut fdc = Fdc::new();
        fdc.create_disk(0, &path, DiskFormat::System).expect("create");
        fdc.insert(0, Path::new("")).expect("eject");
        assert!(fdc.controller.disk(0).is_none());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn dirty_image_is_written_back() {
        let path = temp_path("dirty.dsk");
        let mut fdc = Fdc::new();
        fdc.create_disk(0, &path, DiskFormat::Data).expect("create");
        let disk = fdc.controller.disk_mut(0).expect("disk");
        assert!(disk.write_sector(0, 0, 0, 0xC1, &[0x42; 512], false));
        fdc.remove(0).expect("remove");

        let image = DskImage::parse(&fs::read(&path).expect("read")).expect("parse");
        let sector = image.sector(0, 0, 0, 0xC1).expect("sector");
        assert_eq!(sector.data[0], 0x42);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_write_back_keeps_the_disk() {
        let path = temp_path("keep.dsk");
        let mut fdc = Fdc::new();
        fdc.create_disk(0, &path, DiskFormat::Data).expect("create");
        let disk = fdc.controller.disk_mut(0).expect("disk");
        assert!(disk.write_sector(0, 0, 0, 0xC1, &[0x17; 512], false));

        // A directory cannot be written as a file.
        let dir = std::env::temp_dir();
        fdc.files[0] = Some(dir.clone());
        assert!(matches!(fdc.remove(0), Err(Error::Io { .. })));
        assert!(matches!(fdc.flush(), Err(Error::Io { .. })));
        assert_eq!(fdc.filename(0), Some(dir.as_path()));
        assert!(fdc.controller.disk(0).is_some_and(DskImage::is_dirty));

        fdc.files[0] = Some(path.clone());
        fdc.flush().expect("flush");
        assert!(fdc.controller.disk(0).is_none());
        let image = DskImage::parse(&fs::read(&path).expect("read")).expect("parse");
        assert_eq!(image.sector(0, 0, 0, 0xC1).expect("sector").data[0], 0x17);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn bad_images_are_rejected() {
        let path = temp_path("bad.dsk");
        fs::write(&path, b"not a disk").expect("write");
        let mut fdc = Fdc::new();
        assert!(matches!(fdc.insert(0, &path), Err(Error::Disk { .. })));
        assert!(matches!(fdc.insert(0, Path::new("/nonexistent/x.dsk")), Err(Error::Io { .. })));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn motor_goes_through_wrapper() {
        let mut fdc = Fdc::new();
        fdc.set_motor(true);
        fdc.clock();
        assert!(fdc.controller.motor());
        assert_eq!(fdc.controller.ticks(), 1);
        assert_eq!(fdc.rd_stat(), 0x80);
    }
}
