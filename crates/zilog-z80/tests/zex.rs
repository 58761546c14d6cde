//! CP/M shim for the ZEXDOC/ZEXALL exercisers.
//!
//! The program loads at 0x0100, warm boot at 0x0000 halts, and BDOS
//! calls through 0x0005 are serviced by the harness.

use std::io::Write;

use emu_core::{Cpu, SimpleBus};
use zilog_z80::Z80;

fn bdos(cpu: &Z80, bus: &SimpleBus, output: &mut String) {
    match cpu.regs.c {
        2 => output.push(char::from(cpu.regs.e)),
        9 => {
            let mut addr = cpu.de();
            while bus.peek(addr) != b'$' {
                output.push(char::from(bus.peek(addr)));
                addr = addr.wrapping_add(1);
            }
        }
        func => eprintln!("\nUnknown BDOS function: {func}"),
    }
}

fn run_zex(binary: &[u8]) -> bool {
    let mut bus = SimpleBus::new();
    bus.load(0x0100, binary);
    bus.load(0x0000, &[0x76]);
    bus.load(0x0005, &[0xC9]);
    bus.load(0x0006, &[0x00, 0xFE]);

    let mut cpu = Z80::new();
    cpu.set_pc(0x0100);

    let mut output = String::new();
    let mut instructions = 0u64;
    while !cpu.is_halted() {
        if cpu.pc() == 0x0005 {
            let before = output.len();
            bdos(&cpu, &bus, &mut output);
            eprint!("{}", &output[before..]);
            let _ = std::io::stderr().flush();
            cpu.force_ret(&mut bus);
            continue;
        }
        cpu.step(&mut bus);
        instructions += 1;
    }

    eprintln!("\nTotal: {instructions} instructions");
    !output.contains("ERROR")
}

#[test]
#[ignore]
fn zexdoc() {
    let binary = std::fs::read("tests/data/zexdoc.com").expect("tests/data/zexdoc.com not found");
    assert!(run_zex(&binary), "ZEXDOC failed");
}

#[test]
#[ignore]
fn zexall() {
    let binary = std::fs::read("tests/data/zexall.com").expect("tests/data/zexall.com not found");
    assert!(run_zex(&binary), "ZEXALL failed");
}
