//! `i8086-core`: the instruction fetch/decode/execute engine of an Intel
//! 8086 CPU — register file, ModR/M addressing, memory bus, and opcode
//! dispatch.
//!
//! A terminal-raw-mode interactive loop, ROM-from-file loading, a
//! disassembly/register-dump TUI, and the executable entry point are
//! deliberately out of scope: those are external collaborators an embedder
//! wires up against the `Bus`/`Cpu` interfaces this crate exposes.

pub mod bus;
pub mod cpu;
pub mod disasm;

pub use bus::{Bus, Device, RamDevice};
pub use cpu::{Cpu, CpuHarness};
