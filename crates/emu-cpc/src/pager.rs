//! Memory pager.
//!
//! Four 16K CPU windows, each with a read bank and a write bank. Writes
//! always land in RAM; reads may be overlaid by the firmware ROM (window
//! 0) or by BASIC or an expansion ROM (window 3). The map is rebuilt by
//! [`Pager::select`] whenever the RAM configuration, the ROM select byte
//! or the gate array ROM enables change.

use log::warn;

use crate::memory::{BANK_SIZE, Memory, RamBank};

/// RAM bank seen through each window for configurations 0-7. Banks 4-7
/// stand for the 64K group chosen by bits 5:3.
const RAM_CONFIGS: [[usize; 4]; 8] = [
    [0, 1, 2, 3],
    [0, 1, 2, 7],
    [4, 5, 6, 7],
    [0, 3, 2, 7],
    [0, 4, 2, 3],
    [0, 5, 2, 3],
    [0, 6, 2, 3],
    [0, 7, 2, 3],
];

/// Read source of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Ram(usize),
    LowerRom,
    UpperRom,
    Expansion(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    /// Last value written to gate array function 11, bits 5:0.
    pub ram_conf: u8,
    /// Last value written to the ROM select port.
    pub rom_conf: u8,
    read: [Bank; 4],
    write: [usize; 4],
}

impl Default for Pager {
    fn default() -> Self {
        Self::new()
    }
}

impl Pager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram_conf: 0,
            rom_conf: 0,
            read: [Bank::Ram(0), Bank::Ram(1), Bank::Ram(2), Bank::Ram(3)],
            write: [0, 1, 2, 3],
        }
    }

    /// Back to configuration 0 and ROM 0, then remap.
    pub fn reset(&mut self, memory: &Memory, rmr: u8) {
        *self = Self::new();
        self.select(memory, rmr);
    }

    /// Recompute all eight window mappings.
    pub fn select(&mut self, memory: &Memory, rmr: u8) {
        if memory.ram.len() >= 8 {
            let group = usize::from((self.ram_conf >> 3) & 7) * 4;
            let banks = RAM_CONFIGS[usize::from(self.ram_conf & 7)].map(|b| if b >= 4 { b + group } else { b });
            if banks.iter().all(|&b| b < memory.ram.len()) {
                self.write = banks;
            } else {
                warn!(
                    "RAM configuration {:#04x} needs more than {}K, mapping unchanged",
                    self.ram_conf,
                    memory.kilobytes()
                );
            }
        } else {
            self.write = [0, 1, 2, 3];
        }

        self.read = self.write.map(Bank::Ram);
        if rmr & 0x04 == 0 {
            self.read[0] = Bank::LowerRom;
        }
        if rmr & 0x08 == 0 {
            self.read[3] = match memory.expansion(self.rom_conf) {
                Some(_) => Bank::Expansion(self.rom_conf),
                None => Bank::UpperRom,
            };
        }
    }

    #[must_use]
    pub fn read_bank(&self, window: usize) -> Bank {
        self.read[window & 3]
    }

    #[must_use]
    pub fn write_bank(&self, window: usize) -> usize {
        self.write[window & 3]
    }

    /// Bank index of each window, as RAM, for tests and observation.
    #[must_use]
    pub fn ram_map(&self) -> [usize; 4] {
        self.write
    }

    #[must_use]
    pub fn read(&self, memory: &Memory, addr: u16) -> u8 {
        let offset = usize::from(addr) & (BANK_SIZE - 1);
        match self.read[usize::from(addr >> 14)] {
            Bank::Ram(bank) => ram(memory, bank).get(offset),
            Bank::LowerRom => memory.lower_rom.bytes()[offset],
            Bank::UpperRom => memory.upper_rom.bytes()[offset],
            Bank::Expansion(slot) => memory
                .expansion(slot)
                .unwrap_or(&memory.upper_rom)
                .bytes()[offset],
        }
    }

    pub fn write(&self, memory: &mut Memory, addr: u16, data: u8) {
        let bank = self.write[usize::from(addr >> 14)];
        let offset = usize::from(addr) & (BANK_SIZE - 1);
        if let Some(ram) = memory.ram.get_mut(bank) {
            ram.set(offset, data);
        }
    }
}

fn ram(memory: &Memory, bank: usize) -> &RamBank {
    memory.ram.get(bank).unwrap_or(&memory.ram[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RomBank;

    fn memory(banks: usize) -> Memory {
        let lower = RomBank::new(&[0x10; BANK_SIZE]).expect("rom");
        let upper = RomBank::new(&[0x20; BANK_SIZE]).expect("rom");
        let mut memory = Memory::new(banks, lower, upper);
        for (i, bank) in memory.ram.iter_mut().enumerate() {
            bank.load(&[i as u8]);
        }
        memory
    }

    /// ROMs disabled, so reads show RAM.
    const NO_ROMS: u8 = 0x0C;

    #[test]
    fn all_eight_ram_configurations() {
        let memory = memory(8);
        let expected = [
            [0, 1, 2, 3],
            [0, 1, 2, 7],
            [4, 5, 6, 7],
            [0, 3, 2, 7],
            [0, 4, 2, 3],
            [0, 5, 2, 3],
            [0, 6, 2, 3],
            [0, 7, 2, 3],
        ];
        let mut pager = Pager::new();
        for (conf, banks) in expected.iter().enumerate() {
            pager.ram_conf = conf as u8;
            pager.select(&memory, NO_ROMS);
            assert_eq!(&pager.ram_map(), banks, "configuration {conf}");
            for window in 0..4u16 {
                assert_eq!(pager.read(&memory, window << 14), banks[window as usize] as u8);
            }
        }
    }

    #[test]
    fn small_machines_ignore_ram_configuration() {
        let memory = memory(4);
        let mut pager = Pager::new();
        pager.ram_conf = 0x02;
        pager.select(&memory, NO_ROMS);
        assert_eq!(pager.ram_map(), [0, 1, 2, 3]);
    }

    #[test]
    fn missing_group_keeps_previous_map() {
        let memory = memory(8);
        let mut pager = Pager::new();
        pager.ram_conf = 0x02;
        pager.select(&memory, NO_ROMS);
        pager.ram_conf = 0x0A;
        pager.select(&memory, NO_ROMS);
        assert_eq!(pager.ram_map(), [4, 5, 6, 7]);
    }

    #[test]
    fn second_group_on_256k() {
        let memory = memory(16);
        let mut pager = Pager::new();
        pager.ram_conf = 0x0C;
        pager.select(&memory, NO_ROMS);
        assert_eq!(pager.ram_map(), [0, 8, 2, 3]);
    }

    #[test]
    fn rom_overlays_reads_only() {
        let mut memory = memory(4);
        let mut pager = Pager::new();
        pager.select(&memory, 0x00);
        assert_eq!(pager.read_bank(0), Bank::LowerRom);
        assert_eq!(pager.read_bank(3), Bank::UpperRom);
        assert_eq!(pager.read(&memory, 0x0000), 0x10);
        assert_eq!(pager.read(&memory, 0xC000), 0x20);

        pager.write(&mut memory, 0x0000, 0x99);
        assert_eq!(memory.ram[0].get(0), 0x99);
        pager.select(&memory, 0x04);
        assert_eq!(pager.read(&memory, 0x0000), 0x99);
    }

    #[test]
    fn expansion_rom_replaces_basic() {
        let mut memory = memory(4);
        memory.set_expansion(7, RomBank::new(&[0x77; BANK_SIZE]).expect("rom"));
        let mut pager = Pager::new();
        pager.rom_conf = 7;
        pager.select(&memory, 0x00);
        assert_eq!(pager.read_bank(3), Bank::Expansion(7));
        assert_eq!(pager.read(&memory, 0xC123), 0x77);

        pager.rom_conf = 5;
        pager.select(&memory, 0x00);
        assert_eq!(pager.read_bank(3), Bank::UpperRom);
    }
}
