//! CPU core trait.

use crate::Bus;

/// A CPU core driven one instruction at a time.
///
/// The bus is borrowed for the duration of each step so the machine can
/// keep owning every other chip.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction (or accept one pending interrupt) and
    /// return the number of clock cycles it took.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Current program counter, zero-extended.
    fn pc(&self) -> u32;

    /// Snapshot of all registers.
    fn registers(&self) -> Self::Registers;

    /// True while the CPU is executing HALT.
    fn is_halted(&self) -> bool;

    /// Raise the maskable interrupt line. It stays raised until the CPU
    /// accepts it.
    fn pulse_int(&mut self);

    /// Raise the non-maskable interrupt (edge triggered).
    fn pulse_nmi(&mut self);

    /// Power-on reset.
    fn reset(&mut self);
}
