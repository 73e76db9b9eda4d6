//! Catch-all handlers: invalid opcodes and single-byte no-ops.

use crate::bus::Bus;
use crate::cpu::decode::DecodedInstruction;
use crate::cpu::Cpu;

/// Unimplemented or out-of-scope opcode (80186+ encodings, port I/O, LOCK,
/// FPU escape, `0x0F`). Records `error_msg` and lets IP stand where decode
/// already advanced it by one byte, per `spec.md` §4.D/§7 — never panics.
pub fn invalid_opcode(cpu: &mut Cpu, _bus: &mut Bus, instr: &DecodedInstruction) {
    cpu.set_error(format!(
        "opcode {:#04x} unimplemented at {:04X}:{:04X}",
        instr.opcode,
        cpu.read_seg(1),
        instr.start_ip
    ));
}

/// NOP (0x90), also reachable as XCHG AX, AX.
pub fn nop(_cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {}

/// WAIT (0x9B). No external coprocessor to synchronize with; decoded for
/// length/cost only.
pub fn wait(_cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {}

/// HLT (0xF4). Halts the processor until an external event; this core has
/// no interrupt delivery, so halting is permanent until the embedder calls
/// `reset`/`jump_to_bios`.
pub fn hlt(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.halted = true;
}
