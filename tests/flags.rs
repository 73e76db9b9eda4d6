//! Flag-instruction tests: CLC/STC/CLI/STI/CLD/STD/CMC, SAHF/LAHF, and
//! CBW/CWD sign extension.

use i8086_core::cpu::{Cpu, CpuHarness};

#[test]
fn clc_stc_toggle_carry() {
    let mut harness = CpuHarness::new();
    harness.load_program(&[0xF9, 0xF8], 0); // STC; CLC
    harness.step();
    assert!(harness.cpu.get_flag(Cpu::CF));
    harness.step();
    assert!(!harness.cpu.get_flag(Cpu::CF));
}

#[test]
fn cmc_complements_carry() {
    let mut harness = CpuHarness::new();
    harness.load_program(&[0xF5, 0xF5], 0); // CMC; CMC
    harness.step();
    assert!(harness.cpu.get_flag(Cpu::CF));
    harness.step();
    assert!(!harness.cpu.get_flag(Cpu::CF));
}

#[test]
fn lahf_then_sahf_round_trips_status_byte() {
    let mut harness = CpuHarness::new();
    harness.cpu.set_flag(Cpu::CF, true);
    harness.cpu.set_flag(Cpu::ZF, true);
    let before = harness.cpu.get_flags();
    harness.load_program(&[0x9F, 0xB0, 0x00, 0x9E], 0); // LAHF; MOV AL,0; SAHF
    harness.step(); // LAHF
    harness.step(); // MOV AL, 0 (clears AH's copy by overwriting AL, not AH)
    harness.step(); // SAHF
    assert_eq!(harness.cpu.get_flags() & 0xD5, before & 0xD5); // SF/ZF/AF/PF/CF
}

#[test]
fn cbw_sign_extends_negative_al() {
    let mut harness = CpuHarness::new();
    harness.cpu.write_reg8(0, 0xFF); // AL = -1
    harness.load_program(&[0x98], 0); // CBW
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0xFFFF);
}

#[test]
fn cwd_sign_extends_negative_ax_into_dx() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[0] = 0x8000; // AX negative
    harness.load_program(&[0x99], 0); // CWD
    harness.step();
    assert_eq!(harness.cpu.regs[2], 0xFFFF); // DX
}
