//! Logic instruction tests: AND/OR/XOR/TEST, and the OF/CF-clearing
//! convention shared by all logic ops.

use i8086_core::cpu::{Cpu, CpuHarness};

#[test]
fn and_clears_carry_and_overflow() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0xFF); // AL
    harness.cpu.set_flag(Cpu::CF, true);
    harness.cpu.set_flag(Cpu::OF, true);
    harness.load_program(&[0x24, 0x0F], 0); // AND AL, 0x0F
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x0F);
    assert!(!harness.cpu.get_flag(Cpu::CF));
    assert!(!harness.cpu.get_flag(Cpu::OF));
}

#[test]
fn or_sets_zero_flag_on_all_zero_result() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0x00); // AL
    harness.load_program(&[0x0C, 0x00], 0); // OR AL, 0
    harness.step();
    assert!(harness.cpu.get_flag(Cpu::ZF));
}

#[test]
fn xor_self_clears_register_and_sets_zero() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[0] = 0xBEEF; // AX
    harness.load_program(&[0x31, 0xC0], 0); // XOR AX, AX
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0);
    assert!(harness.cpu.get_flag(Cpu::ZF));
}

#[test]
fn test_does_not_write_back_operand() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0b1010_1010); // AL
    harness.load_program(&[0xA8, 0b1010_1010], 0); // TEST AL, 0xAA
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0b1010_1010); // unchanged
    assert!(!harness.cpu.get_flag(Cpu::ZF));
}
