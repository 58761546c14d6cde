//! General Instrument AY-3-8910 Programmable Sound Generator.
//!
//! Three square-wave tone channels, one noise source and one envelope
//! generator feed a per-channel mixer. Two 8-bit I/O ports hang off
//! R14/R15; on the CPC port A reads the keyboard matrix.
//!
//! # Register map
//!
//! | Reg | Name                 | Mask |
//! |-----|----------------------|------|
//! | R0  | Channel A fine tune  | 0xFF |
//! | R1  | Channel A coarse     | 0x0F |
//! | R2  | Channel B fine tune  | 0xFF |
//! | R3  | Channel B coarse     | 0x0F |
//! | R4  | Channel C fine tune  | 0xFF |
//! | R5  | Channel C coarse     | 0x0F |
//! | R6  | Noise period         | 0x1F |
//! | R7  | Mixer and I/O enable | 0xFF |
//! | R8  | Channel A amplitude  | 0x1F |
//! | R9  | Channel B amplitude  | 0x1F |
//! | R10 | Channel C amplitude  | 0x1F |
//! | R11 | Envelope fine        | 0xFF |
//! | R12 | Envelope coarse      | 0xFF |
//! | R13 | Envelope shape       | 0x0F |
//! | R14 | I/O port A           | 0xFF |
//! | R15 | I/O port B           | 0xFF |

#![allow(clippy::cast_precision_loss)]

/// DAC output per 4-bit amplitude, normalised to 1.0.
const LEVELS: [f32; 16] = [
    0.0000, 0.0137, 0.0205, 0.0291, 0.0423, 0.0618, 0.0847, 0.1369,
    0.1691, 0.2647, 0.3527, 0.4499, 0.5765, 0.7258, 0.8819, 1.0000,
];

/// Mixer bits 6 and 7: set when the matching port is an output.
const PORT_A_OUTPUT: u8 = 0x40;
const PORT_B_OUTPUT: u8 = 0x80;

/// Devices wired to the two I/O ports.
pub trait PsgPorts {
    fn read_port_a(&mut self) -> u8 {
        0xFF
    }
    fn read_port_b(&mut self) -> u8 {
        0xFF
    }
    fn write_port_a(&mut self, _data: u8) {}
    fn write_port_b(&mut self, _data: u8) {}
}

/// Register file with named fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub channel_a_fine_tune: u8,
    pub channel_a_coarse_tune: u8,
    pub channel_b_fine_tune: u8,
    pub channel_b_coarse_tune: u8,
    pub channel_c_fine_tune: u8,
    pub channel_c_coarse_tune: u8,
    pub noise_period: u8,
    pub mixer_and_io_control: u8,
    pub channel_a_amplitude: u8,
    pub channel_b_amplitude: u8,
    pub channel_c_amplitude: u8,
    pub envelope_fine_tune: u8,
    pub envelope_coarse_tune: u8,
    pub envelope_shape: u8,
    pub io_port_a: u8,
    pub io_port_b: u8,
}

impl Registers {
    fn tone_period(&self, channel: usize) -> u16 {
        let (fine, coarse) = match channel {
            0 => (self.channel_a_fine_tune, self.channel_a_coarse_tune),
            1 => (self.channel_b_fine_tune, self.channel_b_coarse_tune),
            _ => (self.channel_c_fine_tune, self.channel_c_coarse_tune),
        };
        u16::from(coarse) << 8 | u16::from(fine)
    }

    fn amplitude(&self, channel: usize) -> u8 {
        match channel {
            0 => self.channel_a_amplitude,
            1 => self.channel_b_amplitude,
            _ => self.channel_c_amplitude,
        }
    }

    fn envelope_period(&self) -> u16 {
        u16::from(self.envelope_coarse_tune) << 8 | u16::from(self.envelope_fine_tune)
    }
}

/// Index-to-field accessor for one register.
pub struct RegisterInfo {
    pub name: &'static str,
    pub mask: u8,
    pub get: fn(&Registers) -> u8,
    pub set: fn(&mut Registers, u8),
}

macro_rules! reg {
    ($name:literal, $field:ident, $mask:literal) => {
        RegisterInfo {
            name: $name,
            mask: $mask,
            get: |regs| regs.$field,
            set: |regs, v| regs.$field = v,
        }
    };
}

pub static REGISTER_TABLE: [RegisterInfo; 16] = [
    reg!("channel-a-fine-tune", channel_a_fine_tune, 0xff),
    reg!("channel-a-coarse-tune", channel_a_coarse_tune, 0x0f),
    reg!("channel-b-fine-tune", channel_b_fine_tune, 0xff),
    reg!("channel-b-coarse-tune", channel_b_coarse_tune, 0x0f),
    reg!("channel-c-fine-tune", channel_c_fine_tune, 0xff),
    reg!("channel-c-coarse-tune", channel_c_coarse_tune, 0x0f),
    reg!("noise-period", noise_period, 0x1f),
    reg!("mixer-and-io-control", mixer_and_io_control, 0xff),
    reg!("channel-a-amplitude", channel_a_amplitude, 0x1f),
    reg!("channel-b-amplitude", channel_b_amplitude, 0x1f),
    reg!("channel-c-amplitude", channel_c_amplitude, 0x1f),
    reg!("envelope-fine-tune", envelope_fine_tune, 0xff),
    reg!("envelope-coarse-tune", envelope_coarse_tune, 0xff),
    reg!("envelope-shape", envelope_shape, 0x0f),
    reg!("io-port-a", io_port_a, 0xff),
    reg!("io-port-b", io_port_b, 0xff),
];

/// Square wave flipping every `period` prescaled ticks.
#[derive(Debug, Clone, Default)]
struct Tone {
    counter: u16,
    high: bool,
}

impl Tone {
    fn step(&mut self, period: u16) {
        self.counter += 1;
        if self.counter >= period.max(1) {
            self.counter = 0;
            self.high = !self.high;
        }
    }
}

/// 17-bit LFSR, taps at bits 0 and 3.
#[derive(Debug, Clone)]
struct Noise {
    counter: u8,
    lfsr: u32,
    high: bool,
}

impl Default for Noise {
    fn default() -> Self {
        Self { counter: 0, lfsr: 1, high: false }
    }
}

impl Noise {
    fn step(&mut self, period: u8) {
        self.counter += 1;
        if self.counter >= period.max(1) {
            self.counter = 0;
            let feedback = (self.lfsr ^ (self.lfsr >> 3)) & 1;
            self.lfsr = (self.lfsr >> 1) | (feedback << 16);
            self.high = self.lfsr & 1 != 0;
        }
    }
}

/// 16-step ramp shaped by R13's continue/attack/alternate/hold bits.
#[derive(Debug, Clone, Default)]
struct Envelope {
    counter: u32,
    position: u8,
    attack: bool,
    holding: bool,
}

impl Envelope {
    fn restart(&mut self, shape: u8) {
        self.counter = 0;
        self.position = 0;
        self.attack = shape & 0x04 != 0;
        self.holding = false;
    }

    fn step(&mut self, period: u32, shape: u8) {
        if self.holding {
            return;
        }
        self.counter += 1;
        if self.counter < period.max(1) {
            return;
        }
        self.counter = 0;
        self.position += 1;
        if self.position < 16 {
            return;
        }

        let cont = shape & 0x08 != 0;
        let alternate = shape & 0x02 != 0;
        let hold = shape & 0x01 != 0;
        if !cont {
            // Shapes 0-7 fall silent after one ramp.
            self.holding = true;
            self.attack = false;
            self.position = 15;
        } else if hold {
            self.holding = true;
            self.position = 15;
            if alternate {
                self.attack = !self.attack;
            }
        } else {
            self.position = 0;
            if alternate {
                self.attack = !self.attack;
            }
        }
    }

    fn level(&self) -> u8 {
        let ramp = self.position.min(15);
        match (self.attack, self.holding) {
            (true, false) => ramp,
            (false, false) => 15 - ramp,
            // Holding: a finished ramp rests at its end level.
            (true, true) => 15,
            (false, true) => 0,
        }
    }
}

/// Channel placement in the stereo image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    Mono,
    /// A left, B centre, C right.
    Abc,
}

/// AY-3-8910 PSG.
#[derive(Debug, Clone)]
pub struct Ay3_8910 {
    pub regs: Registers,
    /// Address latch.
    pub selected: u8,
    tones: [Tone; 3],
    noise: Noise,
    envelope: Envelope,
    /// Input clocks since the last prescaler tick.
    prescaler: u8,
    stereo: StereoMode,
    clocks_per_sample: f32,
    /// Clocks elapsed towards the next output sample.
    phase: f32,
    accumulated: [f32; 2],
    accumulated_clocks: u32,
    buffer: Vec<[f32; 2]>,
}

impl Ay3_8910 {
    /// `clock_freq` is the chip input clock (1 MHz on the CPC).
    #[must_use]
    pub fn new(clock_freq: u32, sample_rate: u32) -> Self {
        Self {
            regs: Registers::default(),
            selected: 0,
            tones: Default::default(),
            noise: Noise::default(),
            envelope: Envelope::default(),
            prescaler: 0,
            stereo: StereoMode::Abc,
            clocks_per_sample: clock_freq as f32 / sample_rate as f32,
            phase: 0.0,
            accumulated: [0.0; 2],
            accumulated_clocks: 0,
            buffer: Vec::with_capacity(sample_rate as usize / 50 + 1),
        }
    }

    /// Clear registers and generators. Buffered audio is kept.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.selected = 0;
        self.tones = Default::default();
        self.noise = Noise::default();
        self.envelope = Envelope::default();
        self.prescaler = 0;
    }

    pub fn set_stereo(&mut self, mode: StereoMode) {
        self.stereo = mode;
    }

    /// Latch a register address. Values above 15 select nothing.
    pub fn select(&mut self, address: u8) {
        self.selected = address;
    }

    /// Write the selected register.
    pub fn write<P: PsgPorts>(&mut self, ports: &mut P, data: u8) {
        let index = usize::from(self.selected);
        if index >= REGISTER_TABLE.len() {
            return;
        }
        self.poke(index, data);
        let mixer = self.regs.mixer_and_io_control;
        match index {
            13 => self.envelope.restart(self.regs.envelope_shape),
            14 if mixer & PORT_A_OUTPUT != 0 => ports.write_port_a(data),
            15 if mixer & PORT_B_OUTPUT != 0 => ports.write_port_b(data),
            _ => {}
        }
    }

    /// Read the selected register. Ports in input mode sample `ports`.
    pub fn read<P: PsgPorts>(&mut self, ports: &mut P) -> u8 {
        let mixer = self.regs.mixer_and_io_control;
        match self.selected {
            14 if mixer & PORT_A_OUTPUT == 0 => ports.read_port_a(),
            15 if mixer & PORT_B_OUTPUT == 0 => ports.read_port_b(),
            index => self.peek(usize::from(index)),
        }
    }

    /// Raw register access for snapshots. Unknown indices read as 0xFF.
    #[must_use]
    pub fn peek(&self, index: usize) -> u8 {
        REGISTER_TABLE.get(index).map_or(0xFF, |info| (info.get)(&self.regs))
    }

    /// Raw register store, masked, with no side effects.
    pub fn poke(&mut self, index: usize, data: u8) {
        if let Some(info) = REGISTER_TABLE.get(index) {
            (info.set)(&mut self.regs, data & info.mask);
        }
    }

    /// Advance by one input clock.
    pub fn clock(&mut self) {
        self.prescaler += 1;
        if self.prescaler == 8 {
            self.prescaler = 0;
            for (channel, tone) in self.tones.iter_mut().enumerate() {
                tone.step(self.regs.tone_period(channel));
            }
            self.noise.step(self.regs.noise_period);
            // The envelope runs at half the tone rate.
            let period = u32::from(self.regs.envelope_period()) * 2;
            self.envelope.step(period, self.regs.envelope_shape);
        }

        let [left, right] = self.output();
        self.accumulated[0] += left;
        self.accumulated[1] += right;
        self.accumulated_clocks += 1;
        self.phase += 1.0;
        if self.phase >= self.clocks_per_sample {
            self.phase -= self.clocks_per_sample;
            let n = self.accumulated_clocks as f32;
            self.buffer.push([self.accumulated[0] / n, self.accumulated[1] / n]);
            self.accumulated = [0.0; 2];
            self.accumulated_clocks = 0;
        }
    }

    fn output(&self) -> [f32; 2] {
        let mixer = self.regs.mixer_and_io_control;
        let pan: [[f32; 2]; 3] = match self.stereo {
            StereoMode::Mono => [[0.5, 0.5]; 3],
            StereoMode::Abc => [[1.0, 0.0], [0.5, 0.5], [0.0, 1.0]],
        };
        let mut out = [0.0f32; 2];
        for channel in 0..3 {
            let tone_on = self.tones[channel].high || mixer & (1 << channel) != 0;
            let noise_on = self.noise.high || mixer & (8 << channel) != 0;
            let amplitude = self.regs.amplitude(channel);
            let level = if amplitude & 0x10 != 0 {
                self.envelope.level()
            } else {
                amplitude & 0x0F
            };
            let volume = LEVELS[usize::from(level)];
            let sample = if tone_on && noise_on { volume * 0.5 } else { -volume * 0.5 };
            out[0] += sample * pan[channel][0];
            out[1] += sample * pan[channel][1];
        }
        // Peak excursion is 0.75 in either stereo mode.
        [out[0] / 0.75, out[1] / 0.75]
    }

    /// Drain buffered `[left, right]` samples.
    pub fn take_buffer(&mut self) -> Vec<[f32; 2]> {
        std::mem::take(&mut self.buffer)
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPC_CLOCK: u32 = 1_000_000;
    const SAMPLE_RATE: u32 = 44_100;

    #[derive(Default)]
    struct Keyboard {
        line: u8,
        written: Vec<u8>,
    }

    impl PsgPorts for Keyboard {
        fn read_port_a(&mut self) -> u8 {
            self.line
        }
        fn write_port_a(&mut self, data: u8) {
            self.written.push(data);
        }
    }

    fn psg() -> Ay3_8910 {
        Ay3_8910::new(CPC_CLOCK, SAMPLE_RATE)
    }

    fn set(psg: &mut Ay3_8910, reg: u8, value: u8) {
        psg.select(reg);
        psg.write(&mut Keyboard::default(), value);
    }

    fn run(psg: &mut Ay3_8910, clocks: u32) -> Vec<[f32; 2]> {
        for _ in 0..clocks {
            psg.clock();
        }
        psg.take_buffer()
    }

    fn energy(buf: &[[f32; 2]], side: usize) -> f32 {
        buf.iter().map(|s| s[side] * s[side]).sum()
    }

    #[test]
    fn writes_are_masked() {
        let mut psg = psg();
        set(&mut psg, 1, 0xFF);
        assert_eq!(psg.regs.channel_a_coarse_tune, 0x0F);
        set(&mut psg, 8, 0xFF);
        assert_eq!(psg.peek(8), 0x1F);
    }

    #[test]
    fn port_a_input_reads_keyboard() {
        let mut psg = psg();
        let mut kbd = Keyboard { line: 0xFB, ..Keyboard::default() };
        psg.select(7);
        psg.write(&mut kbd, 0x3F);
        psg.select(14);
        assert_eq!(psg.read(&mut kbd), 0xFB);
    }

    #[test]
    fn port_a_output_drives_pins() {
        let mut psg = psg();
        let mut kbd = Keyboard::default();
        psg.select(7);
        psg.write(&mut kbd, 0x40);
        psg.select(14);
        psg.write(&mut kbd, 0x5A);
        assert_eq!(kbd.written, vec![0x5A]);
        assert_eq!(psg.read(&mut kbd), 0x5A);
    }

    #[test]
    fn out_of_range_select_is_ignored() {
        let mut psg = psg();
        set(&mut psg, 16, 0x12);
        assert_eq!(psg.regs, Registers::default());
        assert_eq!(psg.read(&mut Keyboard::default()), 0xFF);
    }

    #[test]
    fn produces_one_sample_per_rate_interval() {
        let mut psg = psg();
        let buf = run(&mut psg, CPC_CLOCK / 50);
        assert!((880..=883).contains(&buf.len()), "{}", buf.len());
    }

    #[test]
    fn tone_a_is_hard_left() {
        let mut psg = psg();
        set(&mut psg, 0, 142); // ~440 Hz
        set(&mut psg, 7, 0b0011_1110);
        set(&mut psg, 8, 0x0F);
        let buf = run(&mut psg, 40_000);
        assert!(energy(&buf, 0) > 0.1);
        assert!(buf.iter().any(|s| s[0] > 0.2) && buf.iter().any(|s| s[0] < -0.2));
        assert!(buf.iter().all(|s| s[1].abs() < 1e-6));
    }

    #[test]
    fn tone_c_is_hard_right() {
        let mut psg = psg();
        set(&mut psg, 4, 100);
        set(&mut psg, 7, 0b0011_1011);
        set(&mut psg, 10, 0x0F);
        let buf = run(&mut psg, 40_000);
        assert!(energy(&buf, 1) > 0.1);
        assert!(energy(&buf, 0) < 1e-6);
    }

    #[test]
    fn noise_toggles() {
        let mut psg = psg();
        set(&mut psg, 6, 15);
        set(&mut psg, 7, 0b0011_0111);
        set(&mut psg, 8, 0x0F);
        let buf = run(&mut psg, 40_000);
        assert!(buf.iter().any(|s| s[0] > 0.2) && buf.iter().any(|s| s[0] < -0.2));
    }

    #[test]
    fn decay_envelope_ends_silent() {
        let mut psg = psg();
        set(&mut psg, 7, 0b0011_1111);
        set(&mut psg, 8, 0x10);
        set(&mut psg, 11, 10);
        set(&mut psg, 13, 0x00);
        assert_eq!(psg.envelope.level(), 15);
        run(&mut psg, 10 * 16 * 16 * 2);
        assert!(psg.envelope.holding);
        assert_eq!(psg.envelope.level(), 0);
    }

    #[test]
    fn sawtooth_envelope_repeats() {
        let mut psg = psg();
        set(&mut psg, 11, 1);
        set(&mut psg, 13, 0x0C);
        let mut seen_top = 0;
        let mut last = psg.envelope.level();
        for _ in 0..2000 {
            psg.clock();
            let level = psg.envelope.level();
            if level < last {
                seen_top += 1;
            }
            last = level;
        }
        assert!(seen_top >= 3);
        assert!(!psg.envelope.holding);
    }
}
