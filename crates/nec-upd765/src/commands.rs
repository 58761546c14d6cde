//! Command decoding and execution.
//!
//! Every command is decoded from the low five bits of its first byte.
//! Parameter byte 1 carries the head (bit 2) and unit select (bits 1:0)
//! for every command that addresses a drive.

use crate::dsk::Sector;
use crate::{Execution, Transfer, Upd765};

const ST0_INVALID: u8 = 0x80;
const ST0_ABNORMAL: u8 = 0x40;
const ST0_SEEK_END: u8 = 0x20;
const ST0_EQUIPMENT_CHECK: u8 = 0x10;
const ST0_NOT_READY: u8 = 0x08;

const ST1_END_OF_CYLINDER: u8 = 0x80;
const ST1_DATA_ERROR: u8 = 0x20;
const ST1_NO_DATA: u8 = 0x04;
const ST1_MISSING_ADDRESS: u8 = 0x01;

const ST2_CONTROL_MARK: u8 = 0x40;
const ST2_DATA_ERROR: u8 = 0x20;
const ST2_MISSING_ADDRESS: u8 = 0x01;

const ST3_READY: u8 = 0x20;
const ST3_TRACK_0: u8 = 0x10;
const ST3_TWO_SIDE: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReadTrack,
    Specify,
    SenseDriveStatus,
    WriteData,
    ReadData,
    Recalibrate,
    SenseInterruptStatus,
    WriteDeletedData,
    ReadId,
    ReadDeletedData,
    FormatTrack,
    Seek,
    Version,
    Invalid,
}

impl Command {
    /// Decode an opcode, ignoring the MT, MFM and SK modifier bits.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte & 0x1F {
            0x02 => Self::ReadTrack,
            0x03 => Self::Specify,
            0x04 => Self::SenseDriveStatus,
            0x05 => Self::WriteData,
            0x06 => Self::ReadData,
            0x07 => Self::Recalibrate,
            0x08 => Self::SenseInterruptStatus,
            0x09 => Self::WriteDeletedData,
            0x0A => Self::ReadId,
            0x0C => Self::ReadDeletedData,
            0x0D => Self::FormatTrack,
            0x0F => Self::Seek,
            0x10 => Self::Version,
            _ => Self::Invalid,
        }
    }

    /// Command length in bytes, opcode included.
    #[must_use]
    pub fn length(self) -> usize {
        match self {
            Self::ReadTrack
            | Self::WriteData
            | Self::ReadData
            | Self::WriteDeletedData
            | Self::ReadDeletedData => 9,
            Self::FormatTrack => 6,
            Self::Specify | Self::Seek => 3,
            Self::SenseDriveStatus | Self::Recalibrate | Self::ReadId => 2,
            Self::SenseInterruptStatus | Self::Version | Self::Invalid => 1,
        }
    }
}

impl Transfer {
    fn from_params(p: &[u8], deleted: bool) -> Self {
        Self {
            drive: usize::from(p[1] & 3),
            head: (p[1] >> 2) & 1,
            c: p[2],
            h: p[3],
            r: p[4],
            n: p[5],
            eot: p[6],
            dtl: p[8],
            deleted,
        }
    }

    fn st0(&self) -> u8 {
        (self.head << 2) | self.drive as u8
    }

    fn result(&self, st0: u8, st1: u8, st2: u8) -> Vec<u8> {
        vec![self.st0() | st0, st1, st2, self.c, self.h, self.r, self.n]
    }
}

/// Sector payload sized to what the command asked for.
fn sector_payload(sector: &Sector, len: usize, out: &mut Vec<u8>) {
    let available = len.min(sector.data.len());
    out.extend_from_slice(&sector.data[..available]);
    out.resize(out.len() + (len - available), 0);
}

impl Upd765 {
    pub(crate) fn execute_command(&mut self) {
        let p = std::mem::take(&mut self.command);
        self.phase = crate::Phase::Idle;
        match Command::from_byte(p[0]) {
            Command::Specify => self.specify = [p[1], p[2]],
            Command::SenseDriveStatus => self.sense_drive_status(p[1]),
            Command::Recalibrate => self.seek(p[1], 0),
            Command::Seek => self.seek(p[1], p[2]),
            Command::SenseInterruptStatus => self.sense_interrupt_status(),
            Command::ReadData => self.read_data_command(&p, false),
            Command::ReadDeletedData => self.read_data_command(&p, true),
            Command::ReadTrack => self.read_track(&p),
            Command::WriteData => self.write_data_command(&p, false),
            Command::WriteDeletedData => self.write_data_command(&p, true),
            Command::ReadId => self.read_id(p[1]),
            Command::FormatTrack => self.format_track(&p),
            Command::Version => self.enter_result(vec![0x80]),
            Command::Invalid => self.enter_result(vec![ST0_INVALID]),
        }
        self.command = p;
        self.command.clear();
    }

    fn sense_drive_status(&mut self, select: u8) {
        let unit = usize::from(select & 3);
        let mut st3 = select & 0x07;
        if self.is_ready(unit) {
            st3 |= ST3_READY;
        }
        if self.is_attached(unit) && self.cylinder(unit) == 0 {
            st3 |= ST3_TRACK_0;
        }
        if self.disk(unit).is_some_and(|d| d.sides > 1) {
            st3 |= ST3_TWO_SIDE;
        }
        self.enter_result(vec![st3]);
    }

    /// SEEK and RECALIBRATE. The head arrives immediately.
    fn seek(&mut self, select: u8, cylinder: u8) {
        let unit = usize::from(select & 3);
        let mut st0 = ST0_SEEK_END | (select & 3);
        if self.is_attached(unit) {
            self.set_cylinder(unit, cylinder);
            if !self.is_ready(unit) {
                st0 |= ST0_ABNORMAL | ST0_NOT_READY;
            }
        } else {
            st0 |= ST0_ABNORMAL | ST0_EQUIPMENT_CHECK;
        }
        self.set_seek_end(unit, st0);
    }

    fn sense_interrupt_status(&mut self) {
        let result = match self.take_seek_end() {
            Some((unit, st0)) => vec![st0, self.cylinder(unit)],
            None => vec![ST0_INVALID],
        };
        self.enter_result(result);
    }

    fn read_data_command(&mut self, p: &[u8], deleted: bool) {
        let t = Transfer::from_params(p, deleted);
        if !self.is_ready(t.drive) {
            self.enter_result(t.result(ST0_ABNORMAL | ST0_NOT_READY, 0, 0));
            return;
        }
        let cylinder = self.cylinder(t.drive);
        let Some(disk) = self.disk(t.drive) else {
            return;
        };

        let mut data = Vec::new();
        let (mut st1, mut st2) = (0, 0);
        let mut r = t.r;
        loop {
            let Some(sector) = disk.sector(cylinder, t.head, t.c, r) else {
                st1 |= ST1_NO_DATA;
                break;
            };
            sector_payload(sector, t.sector_len(), &mut data);
            st1 |= sector.st1 & ST1_DATA_ERROR;
            st2 |= sector.st2 & ST2_DATA_ERROR;
            if (sector.st2 & ST2_CONTROL_MARK != 0) != deleted {
                st2 |= ST2_CONTROL_MARK;
            }
            if r == t.eot {
                // Terminal count is not wired, so every transfer ends here.
                st1 |= ST1_END_OF_CYLINDER;
                break;
            }
            r = r.wrapping_add(1);
        }

        let result = Transfer { r, ..t }.result(ST0_ABNORMAL, st1, st2);
        self.start_read(data, result);
    }

    /// READ TRACK: EOT sectors in physical order, IDs unchecked.
    fn read_track(&mut self, p: &[u8]) {
        let t = Transfer::from_params(p, false);
        if !self.is_ready(t.drive) {
            self.enter_result(t.result(ST0_ABNORMAL | ST0_NOT_READY, 0, 0));
            return;
        }
        let cylinder = self.cylinder(t.drive);
        let data = self
            .disk(t.drive)
            .and_then(|d| d.track(cylinder, t.head))
            .filter(|track| !track.sectors.is_empty())
            .map(|track| {
                let mut data = Vec::new();
                for sector in track.sectors.iter().take(usize::from(t.eot)) {
                    sector_payload(sector, t.sector_len(), &mut data);
                }
                data
            });
        match data {
            Some(data) => self.start_read(data, t.result(ST0_ABNORMAL, ST1_END_OF_CYLINDER, 0)),
            None => self.enter_result(t.result(ST0_ABNORMAL, ST1_MISSING_ADDRESS, ST2_MISSING_ADDRESS)),
        }
    }

    fn read_id(&mut self, select: u8) {
        let unit = usize::from(select & 3);
        let st0 = select & 0x07;
        if !self.is_ready(unit) {
            self.enter_result(vec![st0 | ST0_ABNORMAL | ST0_NOT_READY, 0, 0, 0, 0, 0, 0]);
            return;
        }
        let cylinder = self.cylinder(unit);
        let head = (select >> 2) & 1;
        let ids: Vec<[u8; 4]> = self
            .disk(unit)
            .and_then(|d| d.track(cylinder, head))
            .map(|t| t.sectors.iter().map(|s| [s.c, s.h, s.r, s.n]).collect())
            .unwrap_or_default();
        if ids.is_empty() {
            self.enter_result(vec![st0 | ST0_ABNORMAL, ST1_MISSING_ADDRESS, ST2_MISSING_ADDRESS, 0, 0, 0, 0]);
            return;
        }
        // Successive READ IDs see successive sectors pass under the head.
        let [c, h, r, n] = ids[self.next_id % ids.len()];
        self.next_id = self.next_id.wrapping_add(1);
        self.enter_result(vec![st0, 0, 0, c, h, r, n]);
    }

    fn write_data_command(&mut self, p: &[u8], deleted: bool) {
        let t = Transfer::from_params(p, deleted);
        if !self.is_ready(t.drive) {
            self.enter_result(t.result(ST0_ABNORMAL | ST0_NOT_READY, 0, 0));
            return;
        }
        self.begin_sector_write(t);
    }

    /// Locate the next sector of a write, or finish with NO DATA.
    fn begin_sector_write(&mut self, t: Transfer) {
        let cylinder = self.cylinder(t.drive);
        let found = self.disk(t.drive).is_some_and(|d| d.sector(cylinder, t.head, t.c, t.r).is_some());
        if found {
            let data = Vec::with_capacity(t.sector_len());
            self.start_write(Execution::Write { transfer: t, data });
        } else {
            self.execution = Execution::None;
            self.enter_result(t.result(ST0_ABNORMAL, ST1_NO_DATA, 0));
        }
    }

    fn format_track(&mut self, p: &[u8]) {
        let drive = usize::from(p[1] & 3);
        let head = (p[1] >> 2) & 1;
        let st0 = p[1] & 0x07;
        if !self.is_ready(drive) {
            self.enter_result(vec![st0 | ST0_ABNORMAL | ST0_NOT_READY, 0, 0, 0, 0, 0, p[2]]);
            return;
        }
        let count = usize::from(p[3]);
        let execution = Execution::Format { drive, head, count, filler: p[5], ids: Vec::with_capacity(count * 4) };
        if count == 0 {
            self.execution = execution;
            self.commit_format();
        } else {
            self.start_write(execution);
        }
    }

    pub(crate) fn write_execution_byte(&mut self, value: u8) {
        match &mut self.execution {
            Execution::Write { transfer, data } => {
                data.push(value);
                if data.len() >= transfer.sector_len() {
                    let t = *transfer;
                    let data = std::mem::take(data);
                    self.commit_sector(t, &data);
                }
            }
            Execution::Format { count, ids, .. } => {
                ids.push(value);
                if ids.len() >= *count * 4 {
                    self.commit_format();
                }
            }
            Execution::None | Execution::Read { .. } => {}
        }
    }

    fn commit_sector(&mut self, t: Transfer, data: &[u8]) {
        let cylinder = self.cylinder(t.drive);
        let written = self
            .disk_mut(t.drive)
            .is_some_and(|d| d.write_sector(cylinder, t.head, t.c, t.r, data, t.deleted));
        if !written {
            self.execution = Execution::None;
            self.enter_result(t.result(ST0_ABNORMAL, ST1_NO_DATA, 0));
        } else if t.r == t.eot {
            self.execution = Execution::None;
            self.enter_result(t.result(ST0_ABNORMAL, ST1_END_OF_CYLINDER, 0));
        } else {
            self.begin_sector_write(Transfer { r: t.r.wrapping_add(1), ..t });
        }
    }

    fn commit_format(&mut self) {
        let Execution::Format { drive, head, filler, ids, .. } = self.take_execution() else {
            return;
        };
        let ids: Vec<(u8, u8, u8, u8)> = ids.chunks_exact(4).map(|id| (id[0], id[1], id[2], id[3])).collect();
        let cylinder = self.cylinder(drive);
        if let Some(disk) = self.disk_mut(drive) {
            disk.format_track(cylinder, head, &ids, filler);
        }
        let (c, h, r, n) = ids.last().copied().unwrap_or_default();
        self.enter_result(vec![(head << 2) | drive as u8, 0, 0, c, h, r, n]);
    }
}
