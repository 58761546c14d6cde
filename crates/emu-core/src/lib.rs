//! Core traits and types shared by the CPC chip crates.
//!
//! The CPU sees the rest of the machine only through [`Bus`]: six hooks
//! that mirror the Z80's MREQ/IORQ cycles. Every chip exposes its state
//! for inspection through [`Observable`].

mod bus;
mod cpu;
mod observable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use ticks::Ticks;
