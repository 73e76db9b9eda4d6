//! OR/AND/XOR and TEST. Logical ops always clear CF/OF; AF is left
//! undefined (untouched), matching `state.rs::clear_of_cf`'s documented
//! contract and `FlagOp::Logic8`/`Logic16`'s lazy S/Z/P derivation.
//!
//! Grounded in `andrewimm-ezpc/src/cpu/execute/logic.rs`'s module shape (an
//! empty stub in the teacher, naming this as the home for these handlers).

use crate::bus::Bus;
use crate::cpu::decode::{DecodedInstruction, OperandType};
use crate::cpu::state::FlagOp;
use crate::cpu::Cpu;

fn is_byte(instr: &DecodedInstruction) -> bool {
    matches!(instr.dst.op_type, OperandType::Reg8 | OperandType::Mem8)
}

fn logic_op(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, f: impl Fn(u32, u32) -> u32) {
    let byte = is_byte(instr);
    let a = cpu.read_operand(bus, &instr.dst) as u32;
    let b = cpu.read_operand(bus, &instr.src) as u32;
    let result = f(a, b) & if byte { 0xFF } else { 0xFFFF };
    cpu.write_operand(bus, &instr.dst, result as u16);
    let op = if byte { FlagOp::Logic8 } else { FlagOp::Logic16 };
    cpu.set_lazy_flags(result, op);
    cpu.clear_of_cf();
}

pub fn or(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    logic_op(cpu, bus, instr, |a, b| a | b);
}

pub fn and(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    logic_op(cpu, bus, instr, |a, b| a & b);
}

pub fn xor(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    logic_op(cpu, bus, instr, |a, b| a ^ b);
}

/// TEST: dst & src, discarding the result (no write-back). Reached both from
/// the rm/r and acc/imm opcode forms and from the 0xF6/0xF7 unary group's
/// reg=0/1 sub-operation.
pub fn test(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    let byte = is_byte(instr);
    let a = cpu.read_operand(bus, &instr.dst) as u32;
    let b = cpu.read_operand(bus, &instr.src) as u32;
    let result = (a & b) & if byte { 0xFF } else { 0xFFFF };
    let op = if byte { FlagOp::Logic8 } else { FlagOp::Logic16 };
    cpu.set_lazy_flags(result, op);
    cpu.clear_of_cf();
}
