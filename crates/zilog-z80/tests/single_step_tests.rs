//! Per-opcode conformance against the `SingleStepTests` JSON corpus.
//!
//! Data is expected under `test-data/z80/v1/` at the workspace root. The
//! interpreter is instruction-stepped, so only end state and total cycle
//! count are compared. WZ and the Q/P latches are not modelled exactly.

use std::fs;
use std::path::Path;

use emu_core::{Cpu, SimpleBus};
use serde::Deserialize;
use zilog_z80::Z80;

#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    cycles: Vec<serde_json::Value>,
    #[serde(default)]
    ports: Vec<(u16, u8, String)>,
}

#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    sp: u16,
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    h: u8,
    l: u8,
    i: u8,
    r: u8,
    ix: u16,
    iy: u16,
    #[serde(rename = "af_")]
    af_alt: u16,
    #[serde(rename = "bc_")]
    bc_alt: u16,
    #[serde(rename = "de_")]
    de_alt: u16,
    #[serde(rename = "hl_")]
    hl_alt: u16,
    iff1: u8,
    iff2: u8,
    im: u8,
    ram: Vec<(u16, u8)>,
}

fn setup(state: &CpuState, ports: &[(u16, u8, String)]) -> (Z80, SimpleBus) {
    let mut bus = SimpleBus::new();
    for &(addr, value) in &state.ram {
        bus.memory[usize::from(addr)] = value;
    }
    for (port, value, dir) in ports {
        if dir == "r" {
            bus.ports[usize::from(*port)] = *value;
        }
    }

    let mut cpu = Z80::new();
    let r = &mut cpu.regs;
    r.a = state.a;
    r.f = state.f;
    r.b = state.b;
    r.c = state.c;
    r.d = state.d;
    r.e = state.e;
    r.h = state.h;
    r.l = state.l;
    r.set_af_alt(state.af_alt);
    r.set_bc_alt(state.bc_alt);
    r.set_de_alt(state.de_alt);
    r.set_hl_alt(state.hl_alt);
    r.ix = state.ix;
    r.iy = state.iy;
    r.sp = state.sp;
    r.pc = state.pc;
    r.i = state.i;
    r.r = state.r;
    r.iff1 = state.iff1 != 0;
    r.iff2 = state.iff2 != 0;
    r.im = state.im;
    (cpu, bus)
}

fn compare(cpu: &Z80, bus: &SimpleBus, want: &CpuState) -> Vec<String> {
    let r = &cpu.regs;
    let mut errors = Vec::new();
    let mut check = |name: &str, got: u16, want: u16| {
        if got != want {
            errors.push(format!("{name}: got ${got:04X}, want ${want:04X}"));
        }
    };
    check("AF", r.af(), u16::from(want.a) << 8 | u16::from(want.f));
    check("BC", r.bc(), u16::from(want.b) << 8 | u16::from(want.c));
    check("DE", r.de(), u16::from(want.d) << 8 | u16::from(want.e));
    check("HL", r.hl(), u16::from(want.h) << 8 | u16::from(want.l));
    check("AF'", r.af_alt(), want.af_alt);
    check("BC'", r.bc_alt(), want.bc_alt);
    check("DE'", r.de_alt(), want.de_alt);
    check("HL'", r.hl_alt(), want.hl_alt);
    check("IX", r.ix, want.ix);
    check("IY", r.iy, want.iy);
    check("SP", r.sp, want.sp);
    check("PC", r.pc, want.pc);
    check("I", r.i.into(), want.i.into());
    check("R", r.r.into(), want.r.into());
    check("IFF1", r.iff1.into(), want.iff1.into());
    check("IFF2", r.iff2.into(), want.iff2.into());
    check("IM", r.im.into(), want.im.into());
    for &(addr, value) in &want.ram {
        check(&format!("RAM[${addr:04X}]"), bus.peek(addr).into(), value.into());
    }
    errors
}

fn opcode_files() -> Vec<String> {
    let mut names = Vec::new();
    for op in 0..=0xFFu8 {
        if !matches!(op, 0xCB | 0xDD | 0xED | 0xFD) {
            names.push(format!("{op:02x}.json"));
        }
    }
    for prefix in ["cb", "dd", "ed", "fd", "dd cb __", "fd cb __"] {
        for op in 0..=0xFFu8 {
            names.push(format!("{prefix} {op:02x}.json"));
        }
    }
    names
}

#[test]
#[ignore = "requires test-data/z80"]
fn run_all() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/z80/v1");
    if !dir.exists() {
        eprintln!("Test data not found at {}", dir.display());
        return;
    }

    let mut failed = 0u64;
    let mut passed = 0u64;
    for name in opcode_files() {
        let path = dir.join(&name);
        let Ok(data) = fs::read_to_string(&path) else {
            continue;
        };
        let tests: Vec<TestCase> = serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));

        let mut shown = 0;
        for test in &tests {
            let (mut cpu, mut bus) = setup(&test.initial, &test.ports);
            let cycles = cpu.step(&mut bus) as usize;
            let mut errors = compare(&cpu, &bus, &test.final_state);
            if cycles != test.cycles.len() {
                errors.push(format!("cycles: got {cycles}, want {}", test.cycles.len()));
            }
            if errors.is_empty() {
                passed += 1;
            } else {
                failed += 1;
                if shown < 3 {
                    println!("  FAIL [{}]: {}", test.name, errors.join(", "));
                    shown += 1;
                }
            }
        }
    }

    println!("SingleStepTests: {passed} passed, {failed} failed");
    assert_eq!(failed, 0, "{failed} tests failed");
}
