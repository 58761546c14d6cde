//! Zilog Z80 interpreter.
//!
//! Each call to `step()` executes one whole instruction (or accepts one
//! pending interrupt) and returns its cost in T-states. The CPC machine
//! feeds the CPU in 4-cycle quanta through [`Z80::clock`], which keeps a
//! running budget so long instructions borrow from the next quantum.

mod alu;
mod cpu;
mod flags;
mod registers;

pub use cpu::Z80;
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
