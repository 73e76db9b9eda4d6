//! Shift/rotate group tests: by-1 forms (0xD0/0xD1) and by-CL forms
//! (0xD2/0xD3), dispatched through the ModR/M `reg` field as sub-operation
//! selector.

use i8086_core::cpu::{Cpu, CpuHarness};

#[test]
fn shl_by_one_sets_carry_from_vacated_msb() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0b1000_0001); // AL
    harness.load_program(&[0xD0, 0xE0], 0); // SHL AL, 1 (reg=100)
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0b0000_0010);
    assert!(harness.cpu.get_flag(Cpu::CF));
}

#[test]
fn sar_preserves_sign_bit() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0x80); // AL = -128
    harness.load_program(&[0xD0, 0xF8], 0); // SAR AL, 1 (reg=111)
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0xC0);
    assert!(!harness.cpu.get_flag(Cpu::CF));
}

#[test]
fn rol_by_one_wraps_msb_into_lsb_and_carry() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0b1000_0000); // AL
    harness.load_program(&[0xD0, 0xC0], 0); // ROL AL, 1 (reg=000)
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0b0000_0001);
    assert!(harness.cpu.get_flag(Cpu::CF));
}

#[test]
fn shift_by_cl_reads_count_from_cl_register() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0x01); // AL
    harness.cpu.write_reg8(1, 3); // CL
    harness.load_program(&[0xD2, 0xE0], 0); // SHL AL, CL (reg=100)
    harness.step();
    assert_eq!(harness.cpu.read_reg8(0), 0x08);
}
