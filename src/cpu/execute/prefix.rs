//! Segment-override and REP/REPE/REPNE prefix handlers.
//!
//! These never reach the normal handler-dispatch cost accounting on their
//! own: `Cpu::step` loops over consecutive prefix bytes internally and
//! folds their cost into the following non-prefix instruction, per
//! `spec.md` §4.D's state machine and `SPEC_FULL.md` §9.2.

use crate::bus::Bus;
use crate::cpu::decode::DecodedInstruction;
use crate::cpu::state::RepeatPrefix;
use crate::cpu::Cpu;

pub fn seg_es(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.segment_override = Some(0);
}

pub fn seg_cs(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.segment_override = Some(1);
}

pub fn seg_ss(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.segment_override = Some(2);
}

pub fn seg_ds(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.segment_override = Some(3);
}

/// REPNE/REPNZ (0xF2). Latches both the repeat kind and the prefix byte's
/// own IP, so a string handler's per-iteration jump-back lands here again.
pub fn repne(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.repeat_prefix = RepeatPrefix::RepNe;
    cpu.repeat_ip = cpu.ip.wrapping_sub(1);
}

/// REP/REPE/REPZ (0xF3).
pub fn rep(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.repeat_prefix = RepeatPrefix::Rep;
    cpu.repeat_ip = cpu.ip.wrapping_sub(1);
}
