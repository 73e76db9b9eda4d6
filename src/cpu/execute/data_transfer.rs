//! MOV (every addressing form collapses to one handler since `read_operand`/
//! `write_operand` already normalize register/memory/segment/direct-address
//! access), XCHG, LEA, XLAT, and the LES/LDS far-pointer loads.
//!
//! Grounded in `andrewimm-ezpc/src/cpu/execute/data_transfer.rs`'s
//! `mov_rm_r`/`mov_r_rm`/`mov_r_imm`/`mov_rm_imm`/`xchg_rm_r`/
//! `xchg_ax_r16`/`lea`, generalized into one `mov` and one `xchg` handler
//! since this crate's `Operand`/`read_operand` already cover every MOV
//! addressing form uniformly. LES/LDS are a `SPEC_FULL.md` §6.1 enrichment
//! with no teacher counterpart, grounded on the same far-pointer segment
//! resolution `control_flow.rs`'s `call_m16_16`/`jmp_m16_16` use.

use crate::bus::Bus;
use crate::cpu::decode::{DecodedInstruction, Operand, OperandType};
use crate::cpu::Cpu;

/// MOV: every r/m-r, r-imm, rm-imm, sreg, and moffs direct-address form.
/// Never touches flags.
pub fn mov(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    let value = cpu.read_operand(bus, &instr.src);
    cpu.write_operand(bus, &instr.dst, value);
}

fn is_byte(instr: &DecodedInstruction) -> bool {
    matches!(instr.dst.op_type, OperandType::Reg8 | OperandType::Mem8)
}

/// XCHG r/m, r (0x86/0x87) and XCHG AX, r16 (0x90-0x97, with 0x90 itself
/// reserved for NOP since XCHG AX, AX is a no-op).
pub fn xchg(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    let a = cpu.read_operand(bus, &instr.dst);
    let b = cpu.read_operand(bus, &instr.src);
    cpu.write_operand(bus, &instr.dst, b);
    cpu.write_operand(bus, &instr.src, a);
    let _ = is_byte(instr); // width is implicit in the 16-bit read/write above for reg forms
}

/// Resolve a memory operand to `(segment_value, offset)` without reading
/// through the bus, duplicating `Cpu::resolve_mem_operand`'s (private)
/// sentinel/override logic for callers outside `state.rs`.
fn resolve_address(cpu: &Cpu, operand: &Operand) -> (u16, u16) {
    let base_index = (operand.value & 0xFF) as u8;
    if base_index == 0xFF {
        let seg = if operand.segment != 0xFF {
            cpu.read_seg(operand.segment)
        } else {
            cpu.read_seg(3)
        };
        (seg, operand.disp as u16)
    } else {
        let (seg_idx, offset) = cpu.calculate_ea_from_operand(operand, base_index);
        let seg = if operand.segment != 0xFF {
            cpu.read_seg(operand.segment)
        } else {
            cpu.read_seg(seg_idx)
        };
        (seg, offset)
    }
}

/// LEA r16, m (0x8D): load the computed offset itself, not the value it
/// addresses. Direct-address sentinel forms load the bare address.
pub fn lea(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    let base_index = (instr.src.value & 0xFF) as u8;
    let offset = if base_index == 0xFF {
        instr.src.disp as u16
    } else {
        cpu.calculate_ea_from_operand(&instr.src, base_index).1
    };
    cpu.write_operand(bus, &instr.dst, offset);
}

/// XLAT (0xD7): AL = `[segment:BX+AL]`, DS by default, honoring a pending
/// segment override.
pub fn xlat(cpu: &mut Cpu, bus: &mut Bus, _instr: &DecodedInstruction) {
    let seg = match cpu.segment_override {
        Some(s) => cpu.read_seg(s),
        None => cpu.read_seg(3),
    };
    let offset = cpu.read_reg16(3).wrapping_add(cpu.read_reg8(0) as u16);
    let value = cpu.read_mem8(bus, seg, offset);
    cpu.write_reg8(0, value);
}

/// LES r16, m32 (0xC4): r16 = `[m32]`, ES = `[m32+2]`.
pub fn les(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    load_far_pointer(cpu, bus, instr, 0);
}

/// LDS r16, m32 (0xC5): r16 = `[m32]`, DS = `[m32+2]`.
pub fn lds(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    load_far_pointer(cpu, bus, instr, 3);
}

fn load_far_pointer(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, seg_reg: u8) {
    let (seg, offset) = resolve_address(cpu, &instr.src);
    let value = cpu.read_mem16(bus, seg, offset);
    let seg_value = cpu.read_mem16(bus, seg, offset.wrapping_add(2));
    cpu.write_operand(bus, &instr.dst, value);
    cpu.write_seg(seg_reg, seg_value);
}
