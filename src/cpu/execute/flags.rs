//! Direct flag-bit instructions and the AX/AH flag-byte transfers.

use crate::bus::Bus;
use crate::cpu::decode::DecodedInstruction;
use crate::cpu::Cpu;

#[inline(always)]
pub fn clc(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.set_flag(Cpu::CF, false);
}

#[inline(always)]
pub fn stc(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.set_flag(Cpu::CF, true);
}

#[inline(always)]
pub fn cli(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.set_flag(Cpu::IF, false);
}

#[inline(always)]
pub fn sti(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.set_flag(Cpu::IF, true);
}

#[inline(always)]
pub fn cld(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.set_flag(Cpu::DF, false);
}

#[inline(always)]
pub fn std(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    cpu.set_flag(Cpu::DF, true);
}

/// CMC - complement carry.
#[inline(always)]
pub fn cmc(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    let cf = cpu.get_flag(Cpu::CF);
    cpu.set_flag(Cpu::CF, !cf);
}

/// SAHF - load SF/ZF/AF/PF/CF from AH.
pub fn sahf(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    let ah = cpu.read_reg8(4) as u16;
    let preserved = cpu.get_flags() & !(Cpu::SF | Cpu::ZF | Cpu::AF | Cpu::PF | Cpu::CF);
    let imported = ah & (Cpu::SF | Cpu::ZF | Cpu::AF | Cpu::PF | Cpu::CF);
    cpu.set_flags(preserved | imported);
}

/// LAHF - store SF/ZF/AF/PF/CF into AH (bit 1 and bit 3/5 reserved bits not
/// modeled, per `state.rs`'s dropped-8088-quirk decision).
pub fn lahf(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    let flags = cpu.get_flags();
    cpu.write_reg8(4, (flags & 0xFF) as u8);
}

/// CBW - sign-extend AL into AH.
pub fn cbw(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    let al = cpu.read_reg8(0) as i8;
    cpu.write_reg16(0, al as i16 as u16);
}

/// CWD - sign-extend AX into DX:AX.
pub fn cwd(cpu: &mut Cpu, _bus: &mut Bus, _instr: &DecodedInstruction) {
    let ax = cpu.read_reg16(0) as i16;
    cpu.write_reg16(2, if ax < 0 { 0xFFFF } else { 0 });
}
