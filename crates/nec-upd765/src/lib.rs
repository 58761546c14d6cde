//! NEC uPD765A floppy disk controller.
//!
//! Chip-level emulation with no dependencies. Four drive slots hang off
//! the controller; a host machine attaches the ones it wires up and
//! inserts [`DskImage`]s into them. Seeks complete instantly, so the only
//! time the controller keeps is the motor spin-up, advanced by [`Upd765::clock`].
//!
//! # Register interface
//!
//! - **Main Status Register** (read-only): RQM, DIO, EXM and CB bits
//!   tell the CPU whether to write a command byte, transfer data or read
//!   a result.
//! - **Data Register** (read/write): command parameters, sector data in
//!   non-DMA mode, and result bytes.
//!
//! # State machine
//!
//! Idle → Command → (ExecutionRead | ExecutionWrite) → Result → Idle.

#![allow(clippy::cast_possible_truncation)]

pub mod commands;
pub mod dsk;

pub use commands::Command;
pub use dsk::{DiskFormat, DskError, DskImage};

/// Request for master: the data register is ready.
pub const MSR_RQM: u8 = 0x80;
/// Data direction: set when the CPU should read.
pub const MSR_DIO: u8 = 0x40;
/// Execution phase in non-DMA mode.
pub const MSR_EXM: u8 = 0x20;
/// Controller busy with a command.
pub const MSR_CB: u8 = 0x10;

/// Clocks a drive needs with the motor on before it reports ready.
const SPIN_UP_TICKS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a command byte.
    Idle,
    /// Receiving parameter bytes.
    Command,
    /// Controller → CPU data transfer.
    ExecutionRead,
    /// CPU → controller data transfer.
    ExecutionWrite,
    /// CPU reads status bytes.
    Result,
}

/// A drive mechanism connected to one of the four unit-select lines.
#[derive(Debug, Clone, Default)]
pub struct Drive {
    pub disk: Option<DskImage>,
    /// Physical head position.
    pub cylinder: u8,
}

/// State carried across the sectors of a multi-sector transfer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transfer {
    pub drive: usize,
    pub head: u8,
    pub c: u8,
    pub h: u8,
    pub r: u8,
    pub n: u8,
    pub eot: u8,
    pub dtl: u8,
    pub deleted: bool,
}

impl Transfer {
    /// Payload length of each sector in this transfer.
    pub(crate) fn sector_len(&self) -> usize {
        if self.n == 0 { usize::from(self.dtl) } else { 128 << self.n.min(6) }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Execution {
    None,
    /// Sector data queued for the CPU; `result` follows once drained.
    Read { data: Vec<u8>, pos: usize, result: Vec<u8> },
    /// Collecting the current sector from the CPU.
    Write { transfer: Transfer, data: Vec<u8> },
    /// Collecting C/H/R/N ID fields for a track format.
    Format { drive: usize, head: u8, count: usize, filler: u8, ids: Vec<u8> },
}

/// NEC uPD765A floppy disk controller.
pub struct Upd765 {
    phase: Phase,
    command: Vec<u8>,
    command_len: usize,
    result: Vec<u8>,
    result_pos: usize,
    execution: Execution,
    drives: [Option<Drive>; 4],
    /// ST0 of completed seeks awaiting SENSE INTERRUPT STATUS.
    seek_end: [Option<u8>; 4],
    motor: bool,
    spin: u32,
    ticks: u64,
    /// Rotating index for READ ID.
    next_id: usize,
    /// SPECIFY parameters: step rate, head unload, head load, non-DMA.
    pub(crate) specify: [u8; 2],
}

impl Default for Upd765 {
    fn default() -> Self {
        Self::new()
    }
}

impl Upd765 {
    /// A controller with no drives attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            command: Vec::with_capacity(9),
            command_len: 0,
            result: Vec::with_capacity(7),
            result_pos: 0,
            execution: Execution::None,
            drives: [None, None, None, None],
            seek_end: [None; 4],
            motor: false,
            spin: 0,
            ticks: 0,
            next_id: 0,
            specify: [0, 0],
        }
    }

    /// Abort any command in flight. Drives and disks are untouched.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.command.clear();
        self.command_len = 0;
        self.result.clear();
        self.result_pos = 0;
        self.execution = Execution::None;
        self.seek_end = [None; 4];
        self.motor = false;
        self.spin = 0;
    }

    // --- drives ---

    /// Connect a drive mechanism to a unit-select line.
    pub fn attach(&mut self, unit: usize) {
        if let Some(slot) = self.drives.get_mut(unit)
            && slot.is_none()
        {
            *slot = Some(Drive::default());
        }
    }

    /// Disconnect a drive, returning whatever disk it held.
    pub fn detach(&mut self, unit: usize) -> Option<DskImage> {
        self.drives.get_mut(unit)?.take()?.disk
    }

    #[must_use]
    pub fn is_attached(&self, unit: usize) -> bool {
        self.drives.get(unit).is_some_and(Option::is_some)
    }

    #[must_use]
    pub fn drive(&self, unit: usize) -> Option<&Drive> {
        self.drives.get(unit)?.as_ref()
    }

    pub fn drive_mut(&mut self, unit: usize) -> Option<&mut Drive> {
        self.drives.get_mut(unit)?.as_mut()
    }

    /// Put a disk in an attached drive, returning the previous one.
    ///
    /// # Errors
    ///
    /// Hands the image back if no drive is attached at `unit`.
    pub fn insert(&mut self, unit: usize, image: DskImage) -> Result<Option<DskImage>, DskImage> {
        match self.drive_mut(unit) {
            Some(drive) => Ok(drive.disk.replace(image)),
            None => Err(image),
        }
    }

    pub fn eject(&mut self, unit: usize) -> Option<DskImage> {
        self.drive_mut(unit)?.disk.take()
    }

    #[must_use]
    pub fn disk(&self, unit: usize) -> Option<&DskImage> {
        self.drive(unit)?.disk.as_ref()
    }

    pub fn disk_mut(&mut self, unit: usize) -> Option<&mut DskImage> {
        self.drive_mut(unit)?.disk.as_mut()
    }

    /// Head position of an attached drive.
    #[must_use]
    pub fn cylinder(&self, unit: usize) -> u8 {
        self.drive(unit).map_or(0, |d| d.cylinder)
    }

    pub fn set_cylinder(&mut self, unit: usize, cylinder: u8) {
        if let Some(drive) = self.drive_mut(unit) {
            drive.cylinder = cylinder;
        }
    }

    // --- motor and time ---

    /// The motor line is shared by every drive.
    pub fn set_motor(&mut self, on: bool) {
        if !on || !self.motor {
            self.spin = 0;
        }
        self.motor = on;
    }

    #[must_use]
    pub fn motor(&self) -> bool {
        self.motor
    }

    /// Advance controller time by one host tick.
    pub fn clock(&mut self) {
        self.ticks += 1;
        if self.motor {
            self.spin = self.spin.saturating_add(1);
        }
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Drive has a disk and its motor is up to speed.
    #[must_use]
    pub fn is_ready(&self, unit: usize) -> bool {
        self.motor && self.spin >= SPIN_UP_TICKS && self.disk(unit).is_some()
    }

    // --- register interface ---

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True while a seek result is waiting to be sensed.
    #[must_use]
    pub fn interrupt_pending(&self) -> bool {
        self.seek_end.iter().any(Option::is_some)
    }

    #[must_use]
    pub fn read_msr(&self) -> u8 {
        match self.phase {
            Phase::Idle => MSR_RQM,
            Phase::Command => MSR_RQM | MSR_CB,
            Phase::ExecutionRead => MSR_RQM | MSR_DIO | MSR_EXM | MSR_CB,
            Phase::ExecutionWrite => MSR_RQM | MSR_EXM | MSR_CB,
            Phase::Result => MSR_RQM | MSR_DIO | MSR_CB,
        }
    }

    pub fn read_data(&mut self) -> u8 {
        match self.phase {
            Phase::ExecutionRead => self.read_execution_byte(),
            Phase::Result => {
                let value = self.result.get(self.result_pos).copied().unwrap_or(0xFF);
                self.result_pos += 1;
                if self.result_pos >= self.result.len() {
                    self.phase = Phase::Idle;
                    self.result.clear();
                    self.result_pos = 0;
                }
                value
            }
            _ => 0xFF,
        }
    }

    pub fn write_data(&mut self, value: u8) {
        match self.phase {
            Phase::Idle => {
                self.command.clear();
                self.command.push(value);
                self.command_len = Command::from_byte(value).length();
                if self.command_len == 1 {
                    self.execute_command();
                } else {
                    self.phase = Phase::Command;
                }
            }
            Phase::Command => {
                self.command.push(value);
                if self.command.len() >= self.command_len {
                    self.execute_command();
                }
            }
            Phase::ExecutionWrite => self.write_execution_byte(value),
            Phase::ExecutionRead | Phase::Result => {}
        }
    }

    fn read_execution_byte(&mut self) -> u8 {
        let Execution::Read { data, pos, result } = &mut self.execution else {
            return 0xFF;
        };
        let value = data.get(*pos).copied().unwrap_or(0xFF);
        *pos += 1;
        if *pos >= data.len() {
            let result = std::mem::take(result);
            self.execution = Execution::None;
            self.enter_result(result);
        }
        value
    }

    pub(crate) fn enter_result(&mut self, result: Vec<u8>) {
        self.result = result;
        self.result_pos = 0;
        self.phase = Phase::Result;
    }

    pub(crate) fn start_read(&mut self, data: Vec<u8>, result: Vec<u8>) {
        if data.is_empty() {
            self.enter_result(result);
        } else {
            self.execution = Execution::Read { data, pos: 0, result };
            self.phase = Phase::ExecutionRead;
        }
    }

    pub(crate) fn start_write(&mut self, execution: Execution) {
        self.execution = execution;
        self.phase = Phase::ExecutionWrite;
    }

    pub(crate) fn take_execution(&mut self) -> Execution {
        std::mem::replace(&mut self.execution, Execution::None)
    }

    pub(crate) fn set_seek_end(&mut self, unit: usize, st0: u8) {
        self.seek_end[unit] = Some(st0);
    }

    pub(crate) fn take_seek_end(&mut self) -> Option<(usize, u8)> {
        let unit = self.seek_end.iter().position(Option::is_some)?;
        self.seek_end[unit].take().map(|st0| (unit, st0))
    }
}
