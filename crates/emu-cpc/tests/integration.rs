//! Whole-machine tests.
//!
//! Machines are built from small hand-assembled system ROMs, so no
//! firmware is needed. Tests against the real firmware are ignored and
//! read `roms/cpc6128.rom` from the workspace root when run.

use std::path::PathBuf;

use emu_core::{Bus, Observable, Value};
use emu_cpc::{
    BANK_SIZE, Bank, Cpc, CpcConfig, CpcKey, DiskFormat, Error, KeyboardType, MachineType,
    MemorySize, Roms, SnapshotError, capture,
};

/// Build a machine whose firmware is `program` at address 0 plus an
/// optional interrupt handler at 0x0038.
fn make_cpc(config: &CpcConfig, program: &[u8], handler: &[u8]) -> Cpc {
    let mut system = vec![0u8; 2 * BANK_SIZE];
    system[..program.len()].copy_from_slice(program);
    system[0x38..0x38 + handler.len()].copy_from_slice(handler);
    let roms = Roms::from_system(&system).expect("roms");
    Cpc::new(config, roms).expect("cpc")
}

/// DI; HALT.
fn idle_cpc(config: &CpcConfig) -> Cpc {
    make_cpc(config, &[0xF3, 0x76], &[])
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("emu-cpc-it-{}-{name}", std::process::id()))
}

/// Counts interrupts in RAM at 0x8000.
const COUNT_INTERRUPTS: &[u8] = &[
    0xF3, // DI
    0x31, 0x00, 0xC0, // LD SP,0xC000
    0x21, 0x00, 0x80, // LD HL,0x8000
    0x36, 0x00, // LD (HL),0
    0xED, 0x56, // IM 1
    0xFB, // EI
    0x76, // HALT
    0x18, 0xFD, // JR -3
];

/// INC (HL); EI; RET
const COUNT_HANDLER: &[u8] = &[0x34, 0xFB, 0xC9];

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

#[test]
fn frame_covers_every_line_and_clocks_fdc_once() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    cpc.clock();
    assert_eq!(cpc.query("frame.index"), Some(Value::U32(312)));
    assert_eq!(cpc.query("fdc.ticks"), Some(Value::U64(1)));
    cpc.clock();
    assert_eq!(cpc.query("fdc.ticks"), Some(Value::U64(2)));
    assert_eq!(cpc.frame_count(), 2);
}

#[test]
fn six_interrupts_per_frame() {
    let mut cpc = make_cpc(&CpcConfig::default(), COUNT_INTERRUPTS, COUNT_HANDLER);
    for _ in 0..10 {
        cpc.clock();
    }
    let count = cpc.bus().peek(0x8000);
    assert!((58..=62).contains(&count), "{count} interrupts in 10 frames");
}

#[test]
fn interrupts_stay_pending_while_disabled() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    cpc.clock();
    assert!(cpc.cpu().int_pending());
    assert!(cpc.cpu().regs.halted);
}

#[test]
fn im2_vectors_through_i_register_page() {
    let program = [
        0xF3, // DI
        0x31, 0x00, 0xC0, // LD SP,0xC000
        0x21, 0x38, 0x00, // LD HL,0x0038
        0x22, 0x00, 0x40, // LD (0x4000),HL
        0x3E, 0x40, // LD A,0x40
        0xED, 0x47, // LD I,A
        0xED, 0x5E, // IM 2
        0x21, 0x00, 0x80, // LD HL,0x8000
        0x36, 0x00, // LD (HL),0
        0xFB, // EI
        0x76, // HALT
        0x18, 0xFD, // JR -3
    ];
    let mut cpc = make_cpc(&CpcConfig::default(), &program, COUNT_HANDLER);
    for _ in 0..10 {
        cpc.clock();
    }
    // The acknowledge cycle reads 0x00, so every interrupt goes through 0x4000.
    let count = cpc.bus().peek(0x8000);
    assert!((58..=62).contains(&count), "{count} interrupts in 10 frames");
}

// ---------------------------------------------------------------------------
// Gate array and paging
// ---------------------------------------------------------------------------

#[test]
fn cpu_out_selects_mode_and_unmaps_roms() {
    let program = [
        0xF3, // DI
        0x01, 0x00, 0x7F, // LD BC,0x7F00
        0x3E, 0x8D, // LD A,0x8D
        0xED, 0x79, // OUT (C),A
        0x76, // HALT
    ];
    let mut cpc = make_cpc(&CpcConfig::default(), &program, &[]);
    cpc.clock();
    assert_eq!(cpc.query("vga.mode"), Some(Value::U8(1)));
    assert_eq!(cpc.bus().pager.read_bank(0), Bank::Ram(0));
    assert_eq!(cpc.bus().pager.read_bank(3), Bank::Ram(3));
    // Executing from RAM now: the HALT at 0x0008 is gone, RAM is zeroed.
    assert!(!cpc.cpu().regs.halted);
}

#[test]
fn expanded_ram_is_reachable_through_every_configuration() {
    let config = CpcConfig { memory: Some(MemorySize::K128), ..CpcConfig::default() };
    let mut cpc = idle_cpc(&config);
    let bus = cpc.bus_mut();
    bus.iorq_wr(0x7F00, 0x8C);

    for (conf, marker) in (4u8..8).zip([0x44, 0x55, 0x66, 0x77]) {
        bus.iorq_wr(0x7F00, 0xC0 | conf);
        bus.mreq_wr(0x4000, marker);
    }

    // Configuration 2 maps banks 4-7 over the whole address space.
    bus.iorq_wr(0x7F00, 0xC2);
    for (window, marker) in [0x44, 0x55, 0x66, 0x77].into_iter().enumerate() {
        assert_eq!(bus.mreq_rd((window as u16) << 14), marker, "window {window}");
    }

    // The base bank at 0x4000 was never touched.
    bus.iorq_wr(0x7F00, 0xC0);
    assert_eq!(bus.mreq_rd(0x4000), 0);
}

#[test]
fn configuration_three_moves_bank_three_to_window_one() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    let bus = cpc.bus_mut();
    bus.iorq_wr(0x7F00, 0x8C);
    bus.mreq_wr(0xC123, 0x5A);
    bus.iorq_wr(0x7F00, 0xC3);
    assert_eq!(bus.mreq_rd(0x4123), 0x5A);
    assert_eq!(bus.pager.ram_map(), [0, 3, 2, 7]);
}

#[test]
fn base_machine_ignores_expansion_configurations() {
    let config = CpcConfig { memory: Some(MemorySize::K64), ..CpcConfig::default() };
    let mut cpc = idle_cpc(&config);
    for conf in 0..8 {
        cpc.bus_mut().iorq_wr(0x7F00, 0xC0 | conf);
        assert_eq!(cpc.bus().pager.ram_map(), [0, 1, 2, 3], "config {conf}");
    }
}

// ---------------------------------------------------------------------------
// Keyboard through the PPI and PSG
// ---------------------------------------------------------------------------

/// Scan one keyboard line the way the firmware does.
fn scan_line(bus: &mut impl Bus, line: usize) -> u8 {
    bus.iorq_wr(0xF782, 0x82); // port A out
    bus.iorq_wr(0xF400, 14);
    bus.iorq_wr(0xF600, 0xC0); // latch address
    bus.iorq_wr(0xF600, 0x00);
    bus.iorq_wr(0xF782, 0x92); // port A in
    bus.iorq_wr(0xF600, 0x40 | line as u8); // read
    let data = bus.iorq_rd(0xF400);
    bus.iorq_wr(0xF600, 0x00);
    bus.iorq_wr(0xF782, 0x82);
    data
}

#[test]
fn keyboard_scan_sees_pressed_keys() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    let (line, bit) = CpcKey::Space.matrix();

    assert_eq!(scan_line(cpc.bus_mut(), line), 0xFF);
    cpc.press_key(CpcKey::Space);
    assert_eq!(scan_line(cpc.bus_mut(), line), !(1 << bit));
    cpc.release_all_keys();
    assert_eq!(scan_line(cpc.bus_mut(), line), 0xFF);
}

#[test]
fn french_layout_swaps_a_and_q() {
    let config = CpcConfig { keyboard: KeyboardType::French, ..CpcConfig::default() };
    let mut cpc = idle_cpc(&config);
    assert!(cpc.host_key("a", true));
    let (line, bit) = CpcKey::Q.matrix();
    assert_eq!(scan_line(cpc.bus_mut(), line) & (1 << bit), 0);
    assert!(!cpc.host_key("no-such-key", true));
}

#[test]
fn port_b_reports_vsync_and_straps() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    let straps = cpc.bus_mut().iorq_rd(0xF500) & 0x3E;
    // Amstrad (7) on bits 3:1, 50 Hz on bit 4, expansion on bit 5.
    assert_eq!(straps, 0x3E);
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn snapshot_round_trip_restores_cpu_and_ram() {
    let mut cpc = make_cpc(&CpcConfig::default(), COUNT_INTERRUPTS, COUNT_HANDLER);
    for _ in 0..3 {
        cpc.clock();
    }
    cpc.bus_mut().memory.ram[5].set(0x123, 0xA5);
    let regs = cpc.cpu().regs;
    let count = cpc.bus().peek(0x8000);
    let data = cpc.snapshot();

    let mut restored = make_cpc(&CpcConfig::default(), COUNT_INTERRUPTS, COUNT_HANDLER);
    restored.load_snapshot_bytes(&data).expect("load");
    assert_eq!(restored.cpu().regs.pc, regs.pc);
    assert_eq!(restored.cpu().regs.sp, regs.sp);
    assert_eq!(restored.cpu().regs.hl(), regs.hl());
    assert_eq!(restored.cpu().regs.im, 1);
    assert_eq!(restored.bus().peek(0x8000), count);
    assert_eq!(restored.bus().memory.ram[5].get(0x123), 0xA5);

    // The restored machine keeps counting.
    restored.clock();
    assert!(restored.bus().peek(0x8000) > count);
}

#[test]
fn snapshot_of_192k_loads_on_192k_machine() {
    let config = CpcConfig { memory: Some(MemorySize::K192), ..CpcConfig::default() };
    let mut cpc = idle_cpc(&config);
    cpc.bus_mut().memory.ram[11].set(0, 0x11);
    let data = cpc.snapshot();
    assert_eq!(data.len(), 0x100 + 192 * 1024);

    let mut restored = idle_cpc(&config);
    restored.load_snapshot_bytes(&data).expect("load");
    assert_eq!(restored.bus().memory.ram[11].get(0), 0x11);
}

#[test]
fn snapshot_larger_than_installed_ram_is_refused() {
    let big = CpcConfig { memory: Some(MemorySize::K192), ..CpcConfig::default() };
    let data = idle_cpc(&big).snapshot();

    let mut small = idle_cpc(&CpcConfig::default());
    let err = small.load_snapshot_bytes(&data).expect_err("too large");
    assert!(matches!(
        err,
        Error::Snapshot(SnapshotError::TooLarge { kilobytes: 192, installed: 128 })
    ));
}

#[test]
fn odd_memory_size_fails_and_resets() {
    let mut cpc = make_cpc(&CpcConfig::default(), COUNT_INTERRUPTS, COUNT_HANDLER);
    let mut data = cpc.snapshot();
    data[0x6B] = 100;
    data[0x6C] = 0;

    cpc.clock();
    assert_ne!(cpc.cpu().regs.pc, 0);
    let err = cpc.load_snapshot_bytes(&data).expect_err("bad size");
    assert!(matches!(err, Error::Snapshot(SnapshotError::MemorySize { kilobytes: 100 })));
    assert_eq!(cpc.cpu().regs.pc, 0);
    assert_eq!(cpc.query("frame.index"), Some(Value::U32(0)));
}

#[test]
fn bad_signature_is_refused() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    let mut data = cpc.snapshot();
    data[0] = b'X';
    let err = cpc.load_snapshot_bytes(&data).expect_err("signature");
    assert!(matches!(err, Error::Snapshot(SnapshotError::BadSignature)));
}

#[test]
fn snapshot_files_round_trip() {
    let path = temp_path("state.sna");
    let mut cpc = idle_cpc(&CpcConfig::default());
    cpc.bus_mut().iorq_wr(0x7F00, 0x10);
    cpc.bus_mut().iorq_wr(0x7F00, 0x54);
    cpc.save_snapshot(&path).expect("save");

    let mut restored = idle_cpc(&CpcConfig::default());
    restored.load_snapshot(&path).expect("load");
    assert_eq!(restored.bus().gate_array.ink[16], 0x14);
    assert!(restored.load_snapshot(&temp_path("missing.sna")).is_err());
    let _ = std::fs::remove_file(path);
}

// ---------------------------------------------------------------------------
// Disks
// ---------------------------------------------------------------------------

#[test]
fn created_disk_can_be_reinserted() {
    let path = temp_path("blank.dsk");
    let mut cpc = idle_cpc(&CpcConfig::default());
    cpc.create_disk(0, &path, DiskFormat::Data).expect("create");
    assert_eq!(cpc.drive_filename(0), Some(path.as_path()));

    cpc.remove_drive(0).expect("remove");
    assert_eq!(cpc.drive_filename(0), None);

    cpc.insert_drive(1, &path).expect("insert");
    assert_eq!(cpc.drive_filename(1), Some(path.as_path()));
    assert_eq!(cpc.query("fdc.drive1"), Some(Value::String(path.display().to_string())));

    cpc.shutdown().expect("shutdown");
    let _ = std::fs::remove_file(path);
}

#[test]
fn cpc464_has_no_disc_interface() {
    let config = CpcConfig {
        machine: MachineType::Cpc464,
        drive0: Some(temp_path("never-read.dsk")),
        ..CpcConfig::default()
    };
    // The configured drive is ignored rather than failing construction.
    let mut cpc = idle_cpc(&config);
    assert_eq!(cpc.drive_filename(0), None);

    let path = temp_path("464.dsk");
    assert!(matches!(cpc.create_disk(0, &path, DiskFormat::Data), Err(Error::Disk { .. })));
    assert!(!path.exists());
    assert_eq!(cpc.bus_mut().iorq_rd(0xFB7E), 0xFF);
}

#[test]
fn unreadable_disk_is_an_error() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    assert!(matches!(cpc.insert_drive(0, &temp_path("missing.dsk")), Err(Error::Io { .. })));

    let path = temp_path("garbage.dsk");
    std::fs::write(&path, b"not a disk image").expect("write");
    assert!(matches!(cpc.insert_drive(0, &path), Err(Error::Disk { .. })));
    assert_eq!(cpc.drive_filename(0), None);
    let _ = std::fs::remove_file(path);
}

#[test]
fn fdc_answers_version_command() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    let bus = cpc.bus_mut();
    assert_eq!(bus.iorq_rd(0xFB7E) & 0x80, 0x80);
    bus.iorq_wr(0xFB7F, 0x10);
    assert_eq!(bus.iorq_rd(0xFB7E), 0xD0);
    assert_eq!(bus.iorq_rd(0xFB7F), 0x80);
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[test]
fn screenshot_and_audio_are_written() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    cpc.clock();
    let png = temp_path("screen.png");
    let wav = temp_path("sound.wav");
    capture::save_screenshot(&cpc, &png).expect("png");
    capture::save_audio(&cpc.take_audio(), &wav).expect("wav");
    assert!(std::fs::metadata(&png).expect("png file").len() > 0);
    assert!(std::fs::metadata(&wav).expect("wav file").len() > 44);
    let _ = std::fs::remove_file(png);
    let _ = std::fs::remove_file(wav);
}

// ---------------------------------------------------------------------------
// Observability
// ---------------------------------------------------------------------------

#[test]
fn observable_paths_answer() {
    let mut cpc = idle_cpc(&CpcConfig::default());
    cpc.clock();
    assert_eq!(cpc.query("machine"), Some(Value::String("Cpc6128".into())));
    assert_eq!(cpc.query("crtc.r0"), Some(Value::U8(63)));
    assert_eq!(cpc.query("pager.ram_conf"), Some(Value::U8(0)));
    assert_eq!(cpc.query("memory.0x0000"), Some(Value::U8(0xF3)));
    assert!(cpc.query("cpu.pc").is_some());
    assert_eq!(cpc.query("crtc.r18"), None);
    assert_eq!(cpc.query("nonsense"), None);
}

// ---------------------------------------------------------------------------
// Real firmware
// ---------------------------------------------------------------------------

fn firmware() -> Option<Vec<u8>> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../roms/cpc6128.rom");
    std::fs::read(path).ok()
}

#[test]
#[ignore = "needs roms/cpc6128.rom"]
fn firmware_boots_to_basic() {
    let Some(system) = firmware() else {
        return;
    };
    let roms = Roms::from_system(&system).expect("roms");
    let mut cpc = Cpc::new(&CpcConfig::default(), roms).expect("cpc");
    for _ in 0..150 {
        cpc.clock();
    }
    // BASIC runs in mode 1 with the upper ROM paged in.
    assert_eq!(cpc.query("vga.mode"), Some(Value::U8(1)));
    assert!(cpc.cpu().regs.iff1);
}
