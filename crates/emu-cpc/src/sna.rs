//! CPC snapshot files ("MV - SNA").
//!
//! A 256-byte header followed by the RAM banks in order, 16K each.
//!
//! | Offset    | Contents                                         |
//! |-----------|--------------------------------------------------|
//! | 0x00-0x07 | `MV - SNA`                                       |
//! | 0x10      | version                                          |
//! | 0x11-0x2D | Z80: F A C B E D L H R I IFF0 IFF1 IX IY SP PC IM F' A' C' B' E' D' L' H' |
//! | 0x2E      | gate array pen                                   |
//! | 0x2F-0x3F | gate array inks 0-15 and border                  |
//! | 0x40      | gate array mode and ROM enables                  |
//! | 0x41      | RAM configuration                                |
//! | 0x42      | CRTC selected register                           |
//! | 0x43-0x54 | CRTC registers 0-17                              |
//! | 0x55      | ROM select                                       |
//! | 0x56-0x59 | PPI ports A, B, C and control                    |
//! | 0x5A      | PSG selected register                            |
//! | 0x5B-0x6A | PSG registers 0-15                               |
//! | 0x6B-0x6C | memory dump size in K, little endian             |
//! | 0x6D      | machine type (version 2+)                        |
//! | 0x9C      | FDC motor (version 3)                            |
//! | 0x9D-0xA0 | FDC drive cylinders (version 3)                  |
//! | 0xA1      | printer data (version 3)                         |
//! | 0xB2      | gate array vsync delay (version 3)               |
//! | 0xB3      | gate array interrupt line counter (version 3)    |
//! | 0xB4      | interrupt request pending (version 3)            |

use emu_core::Cpu;

use crate::bus::PsgFunction;
use crate::cpc::Cpc;
use crate::error::SnapshotError;
use crate::memory::BANK_SIZE;

pub const SIGNATURE: &[u8; 8] = b"MV - SNA";
pub const HEADER_SIZE: usize = 0x100;
const VERSION: u8 = 3;

const MEMORY_SIZE: usize = 0x6B;
const MACHINE: usize = 0x6D;
const FDC_MOTOR: usize = 0x9C;
const FDC_CYLINDERS: usize = 0x9D;
const PRINTER: usize = 0xA1;
const GA_DELAYED: usize = 0xB2;
const GA_COUNTER: usize = 0xB3;
const INT_REQUEST: usize = 0xB4;

fn word(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn put_word(data: &mut [u8], at: usize, value: u16) {
    data[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

/// Check a snapshot against the machine and return the number of RAM
/// banks it carries. Nothing is modified.
pub fn validate(data: &[u8], installed_kilobytes: usize) -> Result<usize, SnapshotError> {
    if data.len() < HEADER_SIZE {
        if !data.starts_with(SIGNATURE) && data.len() >= SIGNATURE.len() {
            return Err(SnapshotError::BadSignature);
        }
        return Err(SnapshotError::Truncated { expected: HEADER_SIZE, actual: data.len() });
    }
    if !data.starts_with(SIGNATURE) {
        return Err(SnapshotError::BadSignature);
    }
    let kilobytes = usize::from(word(data, MEMORY_SIZE));
    if kilobytes % 16 != 0 {
        return Err(SnapshotError::MemorySize { kilobytes });
    }
    if kilobytes > installed_kilobytes {
        return Err(SnapshotError::TooLarge { kilobytes, installed: installed_kilobytes });
    }
    let expected = HEADER_SIZE + kilobytes * 1024;
    if data.len() < expected {
        return Err(SnapshotError::Truncated { expected, actual: data.len() });
    }
    Ok(kilobytes / 16)
}

/// Restore machine state. The caller resets the machine if this fails.
pub fn load(cpc: &mut Cpc, data: &[u8]) -> Result<(), SnapshotError> {
    let banks = validate(data, cpc.bus.memory.kilobytes())?;
    let h = &data[..HEADER_SIZE];
    let version = h[0x10];

    cpc.cpu.reset();
    let r = &mut cpc.cpu.regs;
    r.f = h[0x11];
    r.a = h[0x12];
    r.c = h[0x13];
    r.b = h[0x14];
    r.e = h[0x15];
    r.d = h[0x16];
    r.l = h[0x17];
    r.h = h[0x18];
    r.r = h[0x19];
    r.i = h[0x1A];
    r.iff1 = h[0x1B] & 1 != 0;
    r.iff2 = h[0x1C] & 1 != 0;
    r.ix = word(h, 0x1D);
    r.iy = word(h, 0x1F);
    r.sp = word(h, 0x21);
    r.pc = word(h, 0x23);
    r.im = h[0x25] & 3;
    r.f_alt = h[0x26];
    r.a_alt = h[0x27];
    r.c_alt = h[0x28];
    r.b_alt = h[0x29];
    r.e_alt = h[0x2A];
    r.d_alt = h[0x2B];
    r.l_alt = h[0x2C];
    r.h_alt = h[0x2D];

    let bus = &mut cpc.bus;
    let ga = &mut bus.gate_array;
    ga.pen = if h[0x2E] & 0x10 != 0 { 16 } else { h[0x2E] & 0x0F };
    for (ink, &value) in ga.ink.iter_mut().zip(&h[0x2F..0x40]) {
        *ink = value & 0x1F;
    }
    ga.rmr = h[0x40] & 0x1F;
    bus.pager.ram_conf = h[0x41] & 0x3F;

    bus.crtc.address = h[0x42] & 0x1F;
    for (index, &value) in h[0x43..0x55].iter().enumerate() {
        bus.crtc.poke(index, value);
    }

    bus.pager.rom_conf = h[0x55];

    bus.ppi.port_a = h[0x56];
    bus.ppi.port_b = h[0x57];
    bus.ppi.port_c = h[0x58];
    bus.ppi.control = h[0x59];
    let port_c = h[0x58];
    bus.board.keyboard.line = port_c & 0x0F;
    bus.board.tape_motor = port_c & 0x10 != 0;
    bus.board.tape_write = port_c & 0x20 != 0;
    bus.board.psg_function = PsgFunction::from(port_c >> 6);
    bus.board.psg_data = h[0x56];

    bus.board.psg.select(h[0x5A]);
    for (index, &value) in h[0x5B..0x6B].iter().enumerate() {
        bus.board.psg.poke(index, value);
    }

    bus.memory.clear_ram();
    for (bank, chunk) in bus.memory.ram.iter_mut().zip(data[HEADER_SIZE..].chunks_exact(BANK_SIZE)).take(banks) {
        bank.load(chunk);
    }

    if version >= 3 {
        bus.fdc.set_motor(h[FDC_MOTOR] & 1 != 0);
        for (unit, &cylinder) in h[FDC_CYLINDERS..FDC_CYLINDERS + 4].iter().enumerate() {
            bus.fdc.controller.set_cylinder(unit, cylinder);
        }
        bus.printer = h[PRINTER];
        bus.gate_array.delayed = h[GA_DELAYED];
        bus.gate_array.counter = h[GA_COUNTER] & 0x3F;
        if h[INT_REQUEST] != 0 {
            cpc.cpu.pulse_int();
        }
    }

    cpc.bus.remap();
    Ok(())
}

/// Serialise the machine as a version 3 snapshot.
#[must_use]
pub fn save(cpc: &Cpc) -> Vec<u8> {
    let mut h = [0u8; HEADER_SIZE];
    h[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
    h[0x10] = VERSION;

    let r = &cpc.cpu.regs;
    h[0x11] = r.f;
    h[0x12] = r.a;
    h[0x13] = r.c;
    h[0x14] = r.b;
    h[0x15] = r.e;
    h[0x16] = r.d;
    h[0x17] = r.l;
    h[0x18] = r.h;
    h[0x19] = r.r;
    h[0x1A] = r.i;
    h[0x1B] = u8::from(r.iff1);
    h[0x1C] = u8::from(r.iff2);
    put_word(&mut h, 0x1D, r.ix);
    put_word(&mut h, 0x1F, r.iy);
    put_word(&mut h, 0x21, r.sp);
    put_word(&mut h, 0x23, r.pc);
    h[0x25] = r.im;
    h[0x26] = r.f_alt;
    h[0x27] = r.a_alt;
    h[0x28] = r.c_alt;
    h[0x29] = r.b_alt;
    h[0x2A] = r.e_alt;
    h[0x2B] = r.d_alt;
    h[0x2C] = r.l_alt;
    h[0x2D] = r.h_alt;

    let bus = &cpc.bus;
    h[0x2E] = bus.gate_array.pen;
    h[0x2F..0x40].copy_from_slice(&bus.gate_array.ink);
    h[0x40] = 0x80 | bus.gate_array.rmr;
    h[0x41] = 0xC0 | bus.pager.ram_conf;
    h[0x42] = bus.crtc.address;
    for (index, slot) in h[0x43..0x55].iter_mut().enumerate() {
        *slot = bus.crtc.peek(index);
    }
    h[0x55] = bus.pager.rom_conf;
    h[0x56] = bus.ppi.port_a;
    h[0x57] = bus.ppi.port_b;
    h[0x58] = bus.ppi.port_c;
    h[0x59] = bus.ppi.control;
    h[0x5A] = bus.board.psg.selected;
    for (index, slot) in h[0x5B..0x6B].iter_mut().enumerate() {
        *slot = bus.board.psg.peek(index);
    }
    put_word(&mut h, MEMORY_SIZE, bus.memory.kilobytes() as u16);
    h[MACHINE] = cpc.machine().snapshot_code();

    h[FDC_MOTOR] = u8::from(bus.fdc.controller.motor());
    for (unit, slot) in h[FDC_CYLINDERS..FDC_CYLINDERS + 4].iter_mut().enumerate() {
        *slot = bus.fdc.controller.cylinder(unit);
    }
    h[PRINTER] = bus.printer;
    h[GA_DELAYED] = bus.gate_array.delayed;
    h[GA_COUNTER] = bus.gate_array.counter;
    h[INT_REQUEST] = u8::from(cpc.cpu.int_pending());

    let mut data = Vec::with_capacity(HEADER_SIZE + bus.memory.ram.len() * BANK_SIZE);
    data.extend_from_slice(&h);
    for bank in &bus.memory.ram {
        data.extend_from_slice(bank.bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kilobytes: u16) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..8].copy_from_slice(SIGNATURE);
        data[0x10] = 1;
        put_word(&mut data, MEMORY_SIZE, kilobytes);
        data
    }

    #[test]
    fn validate_counts_banks() {
        let mut data = header(192);
        data.resize(HEADER_SIZE + 192 * 1024, 0);
        assert_eq!(validate(&data, 256), Ok(12));
    }

    #[test]
    fn validate_rejects_partial_banks() {
        let data = header(72);
        assert_eq!(validate(&data, 128), Err(SnapshotError::MemorySize { kilobytes: 72 }));
    }

    #[test]
    fn validate_rejects_oversized_dump() {
        let data = header(128);
        assert_eq!(validate(&data, 64), Err(SnapshotError::TooLarge { kilobytes: 128, installed: 64 }));
    }

    #[test]
    fn validate_rejects_short_files() {
        let data = header(64);
        assert_eq!(
            validate(&data, 64),
            Err(SnapshotError::Truncated { expected: HEADER_SIZE + 64 * 1024, actual: HEADER_SIZE })
        );
        assert_eq!(
            validate(SIGNATURE, 64),
            Err(SnapshotError::Truncated { expected: HEADER_SIZE, actual: 8 })
        );
    }

    #[test]
    fn validate_checks_signature() {
        let mut data = header(0);
        data[0] = b'X';
        assert_eq!(validate(&data, 64), Err(SnapshotError::BadSignature));
    }
}
