//! Decoded instruction representation handed from decode to execute.
//!
//! Grounded in `andrewimm-ezpc/src/cpu/decode/instruction.rs`: the same
//! `DecodedInstruction` shape and `InstructionHandler` function-pointer type,
//! which is exactly the re-architecture `spec.md` §9 asks for in place of a
//! pointer-to-member-function table with per-opcode template instantiation.
//! Dropped relative to the teacher: the tier-2 decode-cache bookkeeping this
//! struct also served there (`with_timing`, cache-eligibility flags), since
//! this crate has no instruction cache (§1 Non-goals: no pipelining).

use super::operands::Operand;
use crate::bus::Bus;
use crate::cpu::Cpu;

/// Instruction handler: mutates `Cpu` and `Bus` state for one decoded
/// instruction. Returns nothing; variable-cost handlers (taken branches,
/// by-CL shifts, REP-repeated string ops) report their extra clocks via
/// `Cpu::add_extra_cost`.
pub type InstructionHandler = fn(&mut Cpu, &mut Bus, &DecodedInstruction);

/// A fully decoded instruction, ready for its handler.
pub struct DecodedInstruction {
    pub opcode: u8,
    pub dst: Operand,
    pub src: Operand,
    /// Scratch slot for a ModR/M `reg` field used as a group-opcode
    /// sub-operation selector (e.g. 0x80-0x83, 0xF6/0xF7, 0xD0-0xD3), or
    /// any other small per-instruction datum a handler needs that isn't an
    /// operand in its own right.
    pub aux: u8,
    /// IP of this instruction's opcode byte (after any prefixes), used to
    /// roll IP back on a failing instruction per `spec.md` §4.D/§7 ("A
    /// division by zero in AAM leaves IP at the failing instruction").
    pub start_ip: u16,
    /// Total bytes consumed by this instruction, excluding any prefixes.
    pub length: u8,
    pub handler: InstructionHandler,
    pub base_cost: u8,
    pub ea_cost: u8,
}

impl DecodedInstruction {
    pub fn new(opcode: u8, handler: InstructionHandler, start_ip: u16) -> Self {
        Self {
            opcode,
            dst: Operand::none(),
            src: Operand::none(),
            aux: 0,
            start_ip,
            length: 1,
            handler,
            base_cost: 0,
            ea_cost: 0,
        }
    }

    pub fn with_dst(mut self, dst: Operand) -> Self {
        self.dst = dst;
        self
    }

    pub fn with_src(mut self, src: Operand) -> Self {
        self.src = src;
        self
    }

    pub fn with_aux(mut self, aux: u8) -> Self {
        self.aux = aux;
        self
    }

    pub fn with_length(mut self, length: u8) -> Self {
        self.length = length;
        self
    }

    pub fn with_cost(mut self, base_cost: u8, ea_cost: u8) -> Self {
        self.base_cost = base_cost;
        self.ea_cost = ea_cost;
        self
    }

    pub fn with_handler(mut self, handler: InstructionHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Base + EA cost, excluding any prefix folding or handler-reported
    /// extra cost (branch-taken, REP iteration count, shift-by-CL count).
    pub fn total_cost(&self) -> u16 {
        self.base_cost as u16 + self.ea_cost as u16
    }
}
