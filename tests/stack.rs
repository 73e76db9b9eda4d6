//! Stack instruction tests: PUSH/POP r16, segment registers, and the
//! PUSH-SP quirk (the 8086 stores SP's *post-decrement* value).

use i8086_core::cpu::CpuHarness;

#[test]
fn push_pop_round_trip_restores_register_and_sp() {
    let mut harness = CpuHarness::new();
    harness.load_program(
        &[
            0xBC, 0x00, 0x10, // MOV SP, 0x1000
            0xB8, 0x34, 0x12, // MOV AX, 0x1234
            0x50, // PUSH AX
            0xB8, 0x00, 0x00, // MOV AX, 0
            0x58, // POP AX
        ],
        0,
    );
    harness.step();
    assert_eq!(harness.cpu.regs[4], 0x1000);
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0x1234);
    harness.step();
    assert_eq!(harness.cpu.regs[4], 0x0FFE);
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0);
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0x1234);
    assert_eq!(harness.cpu.regs[4], 0x1000);
}

#[test]
fn push_sp_stores_post_decrement_value() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[4] = 0x1000; // SP
    harness.load_program(&[0x54], 0); // PUSH SP
    harness.step();
    assert_eq!(harness.cpu.regs[4], 0x0FFE);
    assert_eq!(harness.bus.read16(0x0FFE), 0x0FFE);
}

#[test]
fn push_pop_segment_registers() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[4] = 0x1000; // SP
    harness.cpu.segments[3] = 0xBEEF; // DS
    harness.load_program(&[0x1E, 0x07], 0); // PUSH DS; POP ES
    harness.step();
    harness.step();
    assert_eq!(harness.cpu.segments[0], 0xBEEF); // ES
}

#[test]
fn pushf_popf_round_trip_flags() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[4] = 0x1000; // SP
    harness.cpu.set_flag(i8086_core::cpu::Cpu::CF, true);
    let before = harness.cpu.get_flags();
    harness.load_program(&[0x9C, 0x9D], 0); // PUSHF; POPF
    harness.step();
    harness.step();
    assert_eq!(harness.cpu.get_flags(), before);
}
