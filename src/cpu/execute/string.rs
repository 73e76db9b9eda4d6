//! String instructions: MOVS/CMPS/STOS/LODS/SCAS, each in byte and word
//! forms, plus the REP/REPE/REPNE repeat-loop mechanics.
//!
//! Grounded directly in `andrewimm-ezpc/src/cpu/execute/string.rs`'s
//! `stosb`/`stosw`/`movsb`/`movsw`/`lodsb`/`lodsw`/`cmpsb`/`cmpsw`/`scasb`/
//! `scasw` and its private `handle_rep`/`handle_rep_conditional` helpers,
//! ported onto this crate's API names: `Cpu::set_sub_of_af` takes an
//! explicit `width` parameter rather than the teacher's `set_sub8_of_af`/
//! `set_sub16_of_af` split, and the bus type is `crate::bus::Bus`.

use crate::bus::Bus;
use crate::cpu::decode::DecodedInstruction;
use crate::cpu::state::{FlagOp, RepeatPrefix};
use crate::cpu::Cpu;

fn ds_segment(cpu: &Cpu) -> u16 {
    match cpu.segment_override {
        Some(s) => cpu.read_seg(s),
        None => cpu.read_seg(3),
    }
}

fn si_di_step(cpu: &mut Cpu, width: u16) -> u16 {
    if cpu.get_flag(Cpu::DF) {
        width.wrapping_neg()
    } else {
        width
    }
}

/// Loop a REP/REPE/REPNE-prefixed string op back to its prefix byte while
/// CX (already decremented by the caller) is non-zero. A bare `REP`
/// (`RepeatPrefix::Rep` ahead of a non-flag-testing string op like
/// MOVS/STOS/LODS) always loops on CX != 0 regardless of ZF.
fn handle_rep(cpu: &mut Cpu) {
    if cpu.repeat_prefix == RepeatPrefix::None {
        return;
    }
    let cx = cpu.read_reg16(1).wrapping_sub(1);
    cpu.write_reg16(1, cx);
    if cx != 0 {
        cpu.ip = cpu.repeat_ip;
    }
    cpu.add_extra_cost(4);
}

/// Loop a REPE/REPZ (continue while ZF) or REPNE/REPNZ (continue while
/// !ZF) prefixed CMPS/SCAS back to its prefix byte while CX != 0 and the
/// flag condition holds.
fn handle_rep_conditional(cpu: &mut Cpu) {
    if cpu.repeat_prefix == RepeatPrefix::None {
        return;
    }
    let cx = cpu.read_reg16(1).wrapping_sub(1);
    cpu.write_reg16(1, cx);
    let zf = cpu.get_flag(Cpu::ZF);
    let keep_going = match cpu.repeat_prefix {
        RepeatPrefix::Rep => zf,
        RepeatPrefix::RepNe => !zf,
        RepeatPrefix::None => false,
    };
    if cx != 0 && keep_going {
        cpu.ip = cpu.repeat_ip;
    }
    cpu.add_extra_cost(4);
}

/// MOVSB (0xA4): `[ES:DI] = [DS:SI]` (or overridden segment for SI); SI/DI
/// step by +-1.
pub fn movsb(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let src_seg = ds_segment(cpu);
    let si = cpu.read_reg16(6);
    let di = cpu.read_reg16(7);
    let value = cpu.read_mem8(bus, src_seg, si);
    let es = cpu.read_seg(0);
    cpu.write_mem8(bus, es, di, value);
    let step = si_di_step(cpu, 1);
    cpu.write_reg16(6, si.wrapping_add(step));
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep(cpu);
}

/// MOVSW (0xA5).
pub fn movsw(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let src_seg = ds_segment(cpu);
    let si = cpu.read_reg16(6);
    let di = cpu.read_reg16(7);
    let value = cpu.read_mem16(bus, src_seg, si);
    let es = cpu.read_seg(0);
    cpu.write_mem16(bus, es, di, value);
    let step = si_di_step(cpu, 2);
    cpu.write_reg16(6, si.wrapping_add(step));
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep(cpu);
}

/// STOSB (0xAA): `[ES:DI] = AL`; DI steps by +-1.
pub fn stosb(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let al = cpu.read_reg8(0);
    let di = cpu.read_reg16(7);
    let es = cpu.read_seg(0);
    cpu.write_mem8(bus, es, di, al);
    let step = si_di_step(cpu, 1);
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep(cpu);
}

/// STOSW (0xAB).
pub fn stosw(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let ax = cpu.read_reg16(0);
    let di = cpu.read_reg16(7);
    let es = cpu.read_seg(0);
    cpu.write_mem16(bus, es, di, ax);
    let step = si_di_step(cpu, 2);
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep(cpu);
}

/// LODSB (0xAC): `AL = [DS:SI]`; SI steps by +-1.
pub fn lodsb(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let seg = ds_segment(cpu);
    let si = cpu.read_reg16(6);
    let value = cpu.read_mem8(bus, seg, si);
    cpu.write_reg8(0, value);
    let step = si_di_step(cpu, 1);
    cpu.write_reg16(6, si.wrapping_add(step));
    handle_rep(cpu);
}

/// LODSW (0xAD).
pub fn lodsw(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let seg = ds_segment(cpu);
    let si = cpu.read_reg16(6);
    let value = cpu.read_mem16(bus, seg, si);
    cpu.write_reg16(0, value);
    let step = si_di_step(cpu, 2);
    cpu.write_reg16(6, si.wrapping_add(step));
    handle_rep(cpu);
}

/// CMPSB (0xA6): `[DS:SI] - [ES:DI]`, flags only; SI/DI step by +-1.
pub fn cmpsb(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let src_seg = ds_segment(cpu);
    let si = cpu.read_reg16(6);
    let di = cpu.read_reg16(7);
    let a = cpu.read_mem8(bus, src_seg, si) as u32;
    let es = cpu.read_seg(0);
    let b = cpu.read_mem8(bus, es, di) as u32;
    let result = a.wrapping_sub(b);
    cpu.set_sub_of_af(a, b, result, 8);
    cpu.set_lazy_flags(result, FlagOp::Sub8);
    let step = si_di_step(cpu, 1);
    cpu.write_reg16(6, si.wrapping_add(step));
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep_conditional(cpu);
}

/// CMPSW (0xA7).
pub fn cmpsw(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let src_seg = ds_segment(cpu);
    let si = cpu.read_reg16(6);
    let di = cpu.read_reg16(7);
    let a = cpu.read_mem16(bus, src_seg, si) as u32;
    let es = cpu.read_seg(0);
    let b = cpu.read_mem16(bus, es, di) as u32;
    let result = a.wrapping_sub(b);
    cpu.set_sub_of_af(a, b, result, 16);
    cpu.set_lazy_flags(result, FlagOp::Sub16);
    let step = si_di_step(cpu, 2);
    cpu.write_reg16(6, si.wrapping_add(step));
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep_conditional(cpu);
}

/// SCASB (0xAE): `AL - [ES:DI]`, flags only; DI steps by +-1.
pub fn scasb(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let al = cpu.read_reg8(0) as u32;
    let di = cpu.read_reg16(7);
    let es = cpu.read_seg(0);
    let b = cpu.read_mem8(bus, es, di) as u32;
    let result = al.wrapping_sub(b);
    cpu.set_sub_of_af(al, b, result, 8);
    cpu.set_lazy_flags(result, FlagOp::Sub8);
    let step = si_di_step(cpu, 1);
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep_conditional(cpu);
}

/// SCASW (0xAF).
pub fn scasw(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let ax = cpu.read_reg16(0) as u32;
    let di = cpu.read_reg16(7);
    let es = cpu.read_seg(0);
    let b = cpu.read_mem16(bus, es, di) as u32;
    let result = ax.wrapping_sub(b);
    cpu.set_sub_of_af(ax, b, result, 16);
    cpu.set_lazy_flags(result, FlagOp::Sub16);
    let step = si_di_step(cpu, 2);
    cpu.write_reg16(7, di.wrapping_add(step));
    handle_rep_conditional(cpu);
}
