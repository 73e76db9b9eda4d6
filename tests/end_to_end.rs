//! The literal end-to-end scenarios used to pin down `step`'s observable
//! behavior: register/flag/IP/cost after one or two instructions, starting
//! from documented preconditions.

use i8086_core::cpu::CpuHarness;
use i8086_core::cpu::Cpu;

#[test]
fn mov_r8_imm8() {
    let mut harness = CpuHarness::new();
    harness.load_program(&[0xB0, 0x10], 0); // MOV AL, 0x10
    let cost = harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x10);
    assert_eq!(harness.cpu.ip, 2);
    assert_eq!(cost, 4);
}

#[test]
fn mov_r16_imm16() {
    let mut harness = CpuHarness::new();
    harness.load_program(&[0xB8, 0xCE, 0xFA], 0); // MOV AX, 0xFACE
    let cost = harness.step();
    assert_eq!(harness.cpu.regs[0], 0xFACE);
    assert_eq!(harness.cpu.ip, 3);
    assert_eq!(cost, 4);
}

#[test]
fn aaa_from_al_0a() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0x0A); // AL
    harness.cpu.write_reg8(4, 0x00); // AH
    harness.load_program(&[0x37], 0); // AAA
    let cost = harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x00); // AL
    assert_eq!(harness.cpu.read_reg8(4), 0x01); // AH
    assert!(harness.cpu.get_flag(Cpu::AF));
    assert!(harness.cpu.get_flag(Cpu::CF));
    assert_eq!(harness.cpu.ip, 1);
    assert_eq!(cost, 8);
}

#[test]
fn aad_with_ib_0a() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[0] = 0x0201; // AX
    harness.load_program(&[0xD5, 0x0A], 0); // AAD 0x0A
    let cost = harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x15); // AL
    assert_eq!(harness.cpu.read_reg8(4), 0x00); // AH
    assert!(!harness.cpu.get_flag(Cpu::SF));
    assert!(!harness.cpu.get_flag(Cpu::ZF));
    assert!(!harness.cpu.get_flag(Cpu::PF));
    assert_eq!(harness.cpu.ip, 2);
    assert_eq!(cost, 60);
}

#[test]
fn aam_with_ib_0a() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[0] = 0xFFFF; // AX
    harness.load_program(&[0xD4, 0x0A], 0); // AAM 0x0A
    let cost = harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x05); // AL
    assert_eq!(harness.cpu.read_reg8(4), 0x19); // AH
    assert!(harness.cpu.get_flag(Cpu::PF));
    assert!(!harness.cpu.get_flag(Cpu::ZF));
    assert!(!harness.cpu.get_flag(Cpu::SF));
    assert_eq!(harness.cpu.ip, 2);
    assert_eq!(cost, 83);
}

#[test]
fn push_ax_then_pop_bx() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[0] = 0xABCD; // AX
    harness.cpu.regs[4] = 0xFFF0; // SP
    harness.cpu.segments[2] = 0; // SS
    harness.load_program(&[0x50, 0x5B], 0); // PUSH AX; POP BX
    harness.step();
    harness.step();
    assert_eq!(harness.cpu.regs[3], 0xABCD); // BX
    assert_eq!(harness.cpu.regs[4], 0xFFF0); // SP restored
    assert_eq!(harness.bus.read8(0xFFEE), 0xCD);
    assert_eq!(harness.bus.read8(0xFFEF), 0xAB);
}

#[test]
fn segment_override_mov_with_cs_prefix() {
    let mut harness = CpuHarness::new();
    harness.cpu.jump_to_bios(0x2000, 0); // CS=0x2000, IP=0
    // 2E 8B 06 20 10 -> CS: MOV AX, [0x1020]
    harness.bus.write_span(0x20000, &[0x2E, 0x8B, 0x06, 0x20, 0x10]);
    let physical = Cpu::physical(0x2000, 0x1020);
    harness.bus.write_span(physical, &[0x34, 0x12]);
    let cost = harness.step();
    assert_eq!(harness.cpu.regs[0], 0x1234);
    assert!(harness.cpu.segment_override.is_none());
    // base MOV r,r/m (2) + EA(mod=00,r/m=6 direct address: 6) + 2 prefix
    assert_eq!(cost, 10);
}

#[test]
fn adc_al_imm8_carrying() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0xFF); // AL
    harness.cpu.set_flag(Cpu::CF, true);
    harness.load_program(&[0x14, 0x00], 0); // ADC AL, 0
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x00);
    assert!(harness.cpu.get_flag(Cpu::CF));
    assert!(harness.cpu.get_flag(Cpu::ZF));
    assert!(harness.cpu.get_flag(Cpu::AF));
    assert!(harness.cpu.get_flag(Cpu::PF));
    assert!(!harness.cpu.get_flag(Cpu::OF));
    assert_eq!(harness.cpu.ip, 2);
}
