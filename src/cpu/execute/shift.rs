//! Shift and rotate instructions (SHL/SAL, SHR, SAR, ROL, ROR, RCL, RCR) and
//! the D0-D3 group dispatch (by-1 vs by-CL count).
//!
//! Grounded in `andrewimm-ezpc/src/cpu/execute/shift.rs`'s bit-level
//! rotate/shift arithmetic, ported onto this crate's flag API: rotates only
//! ever touch CF/OF, so they go through `Cpu::set_flag` directly; SHL/SHR/
//! SAR additionally set S/Z/P from the result via `Cpu::set_szp` (AF stays
//! undefined/untouched), which is the helper `state.rs` documents as built
//! for exactly this group rather than the teacher's `FlagOp::And8`/`And16`
//! lazy-flag family (incompatible here: this crate's `FlagOp::Logic8/16`
//! path force-clears CF/OF on every read, which would stomp the shift's own
//! eagerly-computed carry). The group dispatchers read their sub-operation
//! out of `instr.aux`, this crate's ModR/M-reg-as-selector convention,
//! rather than the teacher's `instr.src.value`.

use crate::bus::Bus;
use crate::cpu::decode::{DecodedInstruction, OperandType};
use crate::cpu::Cpu;

fn is_byte(instr: &DecodedInstruction) -> bool {
    matches!(instr.dst.op_type, OperandType::Reg8 | OperandType::Mem8)
}

/// ROL: CF = last bit rotated out; OF defined only for count=1.
pub fn rol(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let value = cpu.read_operand(bus, &instr.dst);
    let bits = if byte { 8 } else { 16 };
    let count = count % bits;
    if count == 0 {
        return;
    }
    let (result, new_cf) = if byte {
        let r = (value as u8).rotate_left(count as u32);
        (r as u16, r & 1 != 0)
    } else {
        let r = value.rotate_left(count as u32);
        (r, r & 1 != 0)
    };
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_flag(Cpu::CF, new_cf);
    if count == 1 {
        let msb = if byte { result & 0x80 != 0 } else { result & 0x8000 != 0 };
        cpu.set_flag(Cpu::OF, msb != new_cf);
    }
}

/// ROR: CF = last bit rotated out (now the new MSB); OF defined only for
/// count=1.
pub fn ror(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let value = cpu.read_operand(bus, &instr.dst);
    let bits = if byte { 8 } else { 16 };
    let count = count % bits;
    if count == 0 {
        return;
    }
    let (result, new_cf) = if byte {
        let r = (value as u8).rotate_right(count as u32);
        (r as u16, r & 0x80 != 0)
    } else {
        let r = value.rotate_right(count as u32);
        (r, r & 0x8000 != 0)
    };
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_flag(Cpu::CF, new_cf);
    if count == 1 {
        let msb = if byte { result & 0x80 != 0 } else { result & 0x8000 != 0 };
        let next_msb = if byte { result & 0x40 != 0 } else { result & 0x4000 != 0 };
        cpu.set_flag(Cpu::OF, msb != next_msb);
    }
}

/// RCL: rotate left through CF (CF is bit -1/9/17 of the rotated value).
pub fn rcl(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let mut result = cpu.read_operand(bus, &instr.dst);
    let mut cf = cpu.get_flag(Cpu::CF);
    let count = count & 0x1F;
    for _ in 0..count {
        let new_cf = if byte { result & 0x80 != 0 } else { result & 0x8000 != 0 };
        result = if byte {
            ((result << 1) & 0xFF) | cf as u16
        } else {
            (result << 1) | cf as u16
        };
        cf = new_cf;
    }
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_flag(Cpu::CF, cf);
    if count == 1 {
        let msb = if byte { result & 0x80 != 0 } else { result & 0x8000 != 0 };
        cpu.set_flag(Cpu::OF, msb != cf);
    }
}

/// RCR: rotate right through CF.
pub fn rcr(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let mut result = cpu.read_operand(bus, &instr.dst);
    let mut cf = cpu.get_flag(Cpu::CF);
    let count = count & 0x1F;
    let msb_set = if byte { 0x80u16 } else { 0x8000u16 };
    // OF uses the *pre-rotation* two most-significant bits for count=1.
    let pre_msb = result & msb_set != 0;
    for _ in 0..count {
        let new_cf = result & 1 != 0;
        result = (result >> 1) | if cf { msb_set } else { 0 };
        cf = new_cf;
    }
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_flag(Cpu::CF, cf);
    if count == 1 {
        let msb = result & msb_set != 0;
        cpu.set_flag(Cpu::OF, msb != pre_msb);
    }
}

/// SHL/SAL: zeros shift in from the right; CF = last bit shifted out; OF
/// defined only for count=1; S/Z/P set from the result, A undefined.
pub fn shl(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let value = cpu.read_operand(bus, &instr.dst);
    let bits = if byte { 8u32 } else { 16u32 };
    let count32 = count as u32;
    let (result, new_cf) = if count32 >= bits {
        (0u16, count32 == bits && (value >> (bits - 1)) & 1 != 0)
    } else {
        let cf = (value >> (bits - count32 as u32 - 1)) & 1 != 0;
        let r = (value << count32) & if byte { 0xFF } else { 0xFFFF };
        (r, cf)
    };
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_szp(result as u32, byte);
    cpu.set_flag(Cpu::CF, new_cf);
    if count == 1 {
        let msb = if byte { result & 0x80 != 0 } else { result & 0x8000 != 0 };
        cpu.set_flag(Cpu::OF, msb != new_cf);
    }
}

/// SHR: zeros shift in from the left; CF = last bit shifted out; OF (count=1)
/// is the original value's sign bit.
pub fn shr(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let value = cpu.read_operand(bus, &instr.dst);
    let bits = if byte { 8u32 } else { 16u32 };
    let original_msb = if byte { value & 0x80 != 0 } else { value & 0x8000 != 0 };
    let count32 = count as u32;
    let (result, new_cf) = if count32 > bits {
        (0u16, false)
    } else if count32 == bits {
        (0u16, original_msb)
    } else {
        let cf = (value >> (count32 - 1)) & 1 != 0;
        (value >> count32, cf)
    };
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_szp(result as u32, byte);
    cpu.set_flag(Cpu::CF, new_cf);
    if count == 1 {
        cpu.set_flag(Cpu::OF, original_msb);
    }
}

/// SAR: the sign bit shifts in from the left; CF = last bit shifted out; OF
/// is always cleared for count=1 (the sign never changes).
pub fn sar(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    if count == 0 {
        return;
    }
    let byte = is_byte(instr);
    let value = cpu.read_operand(bus, &instr.dst);
    let bits = if byte { 8u32 } else { 16u32 };
    let count32 = (count as u32).min(bits - 1 + 1); // full sign-fill beyond width
    let (result, new_cf) = if byte {
        let signed = value as u8 as i8;
        let eff = count32.min(8);
        let cf = if eff > 0 { ((signed as u8) >> (eff - 1)) & 1 != 0 } else { false };
        ((signed >> eff.min(7)) as u8 as u16, cf)
    } else {
        let signed = value as i16;
        let eff = count32.min(16);
        let cf = if eff > 0 { ((signed as u16) >> (eff - 1)) & 1 != 0 } else { false };
        ((signed >> eff.min(15)) as u16, cf)
    };
    cpu.write_operand(bus, &instr.dst, result);
    cpu.set_szp(result as u32, byte);
    cpu.set_flag(Cpu::CF, new_cf);
    if count == 1 {
        cpu.set_flag(Cpu::OF, false);
    }
}

fn dispatch(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction, count: u8) {
    match instr.aux {
        0 => rol(cpu, bus, instr, count),
        1 => ror(cpu, bus, instr, count),
        2 => rcl(cpu, bus, instr, count),
        3 => rcr(cpu, bus, instr, count),
        4 | 6 => shl(cpu, bus, instr, count),
        5 => shr(cpu, bus, instr, count),
        7 => sar(cpu, bus, instr, count),
        _ => unreachable!("ModR/M reg field is always 3 bits"),
    }
}

/// Group 0xD0: shift/rotate r/m8 by 1.
pub fn group_d0(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    dispatch(cpu, bus, instr, 1);
}

/// Group 0xD1: shift/rotate r/m16 by 1.
pub fn group_d1(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    dispatch(cpu, bus, instr, 1);
}

/// Group 0xD2: shift/rotate r/m8 by CL.
pub fn group_d2(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    let count = cpu.read_reg8(1);
    dispatch(cpu, bus, instr, count);
}

/// Group 0xD3: shift/rotate r/m16 by CL.
pub fn group_d3(cpu: &mut Cpu, bus: &mut Bus, instr: &DecodedInstruction) {
    let count = cpu.read_reg8(1);
    dispatch(cpu, bus, instr, count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Operand;

    fn instr_for(dst: Operand, aux: u8) -> DecodedInstruction {
        fn nop_handler(_: &mut Cpu, _: &mut Bus, _: &DecodedInstruction) {}
        DecodedInstruction::new(0, nop_handler, 0).with_dst(dst).with_aux(aux)
    }

    #[test]
    fn shl_by_one_sets_carry_from_msb() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::flat_1mb();
        cpu.write_reg8(0, 0x81);
        shl(&mut cpu, &mut bus, &instr_for(Operand::reg8(0), 4), 1);
        assert_eq!(cpu.read_reg8(0), 0x02);
        assert!(cpu.get_flag(Cpu::CF));
    }

    #[test]
    fn shr_by_one_preserves_sign_into_of() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::flat_1mb();
        cpu.write_reg8(0, 0x81);
        shr(&mut cpu, &mut bus, &instr_for(Operand::reg8(0), 5), 1);
        assert_eq!(cpu.read_reg8(0), 0x40);
        assert!(cpu.get_flag(Cpu::CF));
        assert!(cpu.get_flag(Cpu::OF));
    }

    #[test]
    fn sar_preserves_sign_bit() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::flat_1mb();
        cpu.write_reg8(0, 0x81); // -127
        sar(&mut cpu, &mut bus, &instr_for(Operand::reg8(0), 7), 1);
        assert_eq!(cpu.read_reg8(0), 0xC0); // sign-extended
        assert!(cpu.get_flag(Cpu::CF));
        assert!(!cpu.get_flag(Cpu::OF));
    }

    #[test]
    fn rol_by_one_wraps_msb_into_cf_and_lsb() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::flat_1mb();
        cpu.write_reg8(0, 0x81);
        rol(&mut cpu, &mut bus, &instr_for(Operand::reg8(0), 0), 1);
        assert_eq!(cpu.read_reg8(0), 0x03);
        assert!(cpu.get_flag(Cpu::CF));
    }

    #[test]
    fn rcr_by_one_rotates_through_carry() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::flat_1mb();
        cpu.write_reg8(0, 0x01);
        cpu.set_flag(Cpu::CF, true);
        rcr(&mut cpu, &mut bus, &instr_for(Operand::reg8(0), 3), 1);
        assert_eq!(cpu.read_reg8(0), 0x80); // old CF rotated into MSB
        assert!(cpu.get_flag(Cpu::CF)); // old bit0 rotated out
    }

    #[test]
    fn group_d2_reads_count_from_cl() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::flat_1mb();
        cpu.write_reg8(0, 0x01);
        cpu.write_reg8(1, 3); // CL = 3
        group_d2(&mut cpu, &mut bus, &instr_for(Operand::reg8(0), 4)); // SHL
        assert_eq!(cpu.read_reg8(0), 0x08);
    }
}
