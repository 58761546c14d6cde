//! Amstrad CPC emulator binary.
//!
//! Runs a fixed number of frames, paced to the refresh rate unless turbo
//! or headless, then optionally saves a screenshot, an audio dump and a
//! snapshot.

use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::thread;
use std::time::Instant;

use emu_cpc::{Cpc, CpcConfig, FrameTimer, Roms, capture};
use log::{error, info, warn};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    machine: Option<String>,
    memory: Option<String>,
    refresh: Option<String>,
    monitor: Option<String>,
    keyboard: Option<String>,
    company: Option<String>,
    bpp: Option<String>,
    log_level: Option<String>,
    turbo: bool,
    headless: bool,
    sys_rom: Option<PathBuf>,
    dos_rom: Option<PathBuf>,
    expansion_roms: Vec<(u8, PathBuf)>,
    drive0: Option<PathBuf>,
    drive1: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
    frames: u32,
    screenshot_path: Option<PathBuf>,
    audio_path: Option<PathBuf>,
    save_snapshot_path: Option<PathBuf>,
}

fn usage() {
    eprintln!("Usage: emu-cpc [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file>         JSON machine configuration");
    eprintln!("  --machine <type>        cpc464, cpc664, cpc6128 [default: cpc6128]");
    eprintln!("  --memory <size>         64k .. 512k [default: from machine]");
    eprintln!("  --refresh <rate>        50hz or 60hz [default: 50hz]");
    eprintln!("  --monitor <type>        color, green, gray, ctm640, ctm644, gt64, gt65, cm14, mm12");
    eprintln!("  --keyboard <layout>     english, french, german, spanish, danish");
    eprintln!("  --company <name>        isp, triumph, saisho, solavox, awa, schneider, orion, amstrad");
    eprintln!("  --bpp <bits>            8, 16 or 32 [default: 32]");
    eprintln!("  --log-level <level>     quiet, error, alert, print, trace, debug");
    eprintln!("  --turbo                 Run as fast as possible");
    eprintln!("  --headless              Never sleep between frames");
    eprintln!("  --sys-rom <file>        32K system ROM (firmware + BASIC)");
    eprintln!("  --dos-rom <file>        AMSDOS ROM for expansion slot 7");
    eprintln!("  --rom<N> <file>         Expansion ROM for slot N (0-15)");
    eprintln!("  --drive0 <file>         DSK image for drive A");
    eprintln!("  --drive1 <file>         DSK image for drive B");
    eprintln!("  --snapshot <file>       Load an SNA snapshot");
    eprintln!("  --frames <n>            Number of frames to run [default: 250]");
    eprintln!("  --screenshot <file>     Save a PNG screenshot after the last frame");
    eprintln!("  --audio <file>          Save a WAV dump of the PSG output");
    eprintln!("  --save-snapshot <file>  Save an SNA snapshot after the last frame");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        frames: 250,
        ..CliArgs::default()
    };

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if matches!(arg, "--turbo" | "--headless" | "--help" | "-h") {
            match arg {
                "--turbo" => cli.turbo = true,
                "--headless" => cli.headless = true,
                _ => {
                    usage();
                    process::exit(0);
                }
            }
            i += 1;
            continue;
        }

        i += 1;
        let Some(value) = args.get(i).cloned() else {
            eprintln!("Missing value for {arg}");
            process::exit(1);
        };
        match arg {
            "--config" => cli.config_path = Some(value.into()),
            "--machine" => cli.machine = Some(value),
            "--memory" => cli.memory = Some(value),
            "--refresh" => cli.refresh = Some(value),
            "--monitor" => cli.monitor = Some(value),
            "--keyboard" => cli.keyboard = Some(value),
            "--company" => cli.company = Some(value),
            "--bpp" => cli.bpp = Some(value),
            "--log-level" => cli.log_level = Some(value),
            "--sys-rom" => cli.sys_rom = Some(value.into()),
            "--dos-rom" => cli.dos_rom = Some(value.into()),
            "--drive0" => cli.drive0 = Some(value.into()),
            "--drive1" => cli.drive1 = Some(value.into()),
            "--snapshot" => cli.snapshot_path = Some(value.into()),
            "--frames" => {
                cli.frames = value.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid frame count: {value}");
                    process::exit(1);
                });
            }
            "--screenshot" => cli.screenshot_path = Some(value.into()),
            "--audio" => cli.audio_path = Some(value.into()),
            "--save-snapshot" => cli.save_snapshot_path = Some(value.into()),
            other => match other.strip_prefix("--rom").and_then(|n| n.parse::<u8>().ok()) {
                Some(slot) if slot <= 15 => cli.expansion_roms.push((slot, value.into())),
                _ => {
                    eprintln!("Unknown argument: {other}");
                    process::exit(1);
                }
            },
        }
        i += 1;
    }

    cli
}

/// Parse an option value into `slot`. A bad value keeps the previous
/// setting and is reported once logging is up.
fn apply<T: FromStr<Err = emu_cpc::Error>>(value: Option<&String>, slot: &mut T, alerts: &mut Vec<String>) {
    if let Some(s) = value {
        match s.parse() {
            Ok(parsed) => *slot = parsed,
            Err(e) => alerts.push(e.to_string()),
        }
    }
}

/// Config file first, then command-line overrides.
fn build_config(cli: &CliArgs, alerts: &mut Vec<String>) -> CpcConfig {
    let mut config = match &cli.config_path {
        Some(path) => CpcConfig::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => CpcConfig::default(),
    };

    apply(cli.machine.as_ref(), &mut config.machine, alerts);
    apply(cli.refresh.as_ref(), &mut config.refresh, alerts);
    apply(cli.monitor.as_ref(), &mut config.monitor, alerts);
    apply(cli.keyboard.as_ref(), &mut config.keyboard, alerts);
    apply(cli.company.as_ref(), &mut config.company, alerts);
    apply(cli.bpp.as_ref(), &mut config.bpp, alerts);
    apply(cli.log_level.as_ref(), &mut config.log_level, alerts);
    if cli.memory.is_some() {
        let mut size = config.memory_size();
        apply(cli.memory.as_ref(), &mut size, alerts);
        config.memory = Some(size);
    }

    config.turbo |= cli.turbo;
    if let Some(path) = &cli.sys_rom {
        config.system_rom = Some(path.clone());
    }
    if let Some(path) = &cli.dos_rom {
        config.amsdos_rom = Some(path.clone());
    }
    for (slot, path) in &cli.expansion_roms {
        config.expansion_roms.insert(*slot, path.clone());
    }
    if let Some(path) = &cli.drive0 {
        config.drive0 = Some(path.clone());
    }
    if let Some(path) = &cli.drive1 {
        config.drive1 = Some(path.clone());
    }
    config
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

fn run(cli: &CliArgs, config: &CpcConfig) -> emu_cpc::Result<()> {
    let roms = Roms::load(config)?;
    let mut cpc = Cpc::new(config, roms)?;

    if let Some(path) = &cli.snapshot_path {
        cpc.load_snapshot(path)?;
    }

    let pace = !config.turbo && !cli.headless;
    let mut timer = FrameTimer::new(config.refresh, !pace);
    let mut audio: Vec<[f32; 2]> = Vec::new();
    let started = Instant::now();

    for _ in 0..cli.frames {
        cpc.clock();
        let samples = cpc.take_audio();
        if cli.audio_path.is_some() {
            audio.extend_from_slice(&samples);
        }
        if pace {
            thread::sleep(timer.schedule(Instant::now()));
        }
    }
    info!(
        "{} frames in {:.2}s",
        cpc.frame_count(),
        started.elapsed().as_secs_f64()
    );

    if let Some(path) = &cli.screenshot_path {
        capture::save_screenshot(&cpc, path)?;
        info!("screenshot saved to {}", path.display());
    }
    if let Some(path) = &cli.audio_path {
        capture::save_audio(&audio, path)?;
        info!("audio saved to {}", path.display());
    }
    if let Some(path) = &cli.save_snapshot_path {
        cpc.save_snapshot(path)?;
    }

    cpc.shutdown()
}

fn main() {
    let cli = parse_args();
    let mut alerts = Vec::new();
    let config = build_config(&cli, &mut alerts);

    env_logger::Builder::new()
        .filter_level(config.log_level.filter())
        .parse_default_env()
        .init();
    for alert in &alerts {
        warn!("{alert}, keeping the previous setting");
    }

    if let Err(e) = run(&cli, &config) {
        error!("{e}");
        process::exit(1);
    }
}
