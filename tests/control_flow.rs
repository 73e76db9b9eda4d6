//! Control-flow instruction tests: unconditional/conditional jumps, LOOP,
//! CALL/RET, and software interrupts.

use i8086_core::cpu::CpuHarness;
use i8086_core::cpu::Cpu;

#[test]
fn jmp_short_skips_forward() {
    let mut harness = CpuHarness::new();
    harness.load_program(
        &[
            0xEB, 0x05, // JMP +5
            0x90, 0x90, 0x90, 0x90, 0x90, // 5 bytes skipped
            0xB8, 0x34, 0x12, // MOV AX, 0x1234
        ],
        0,
    );
    harness.step();
    assert_eq!(harness.cpu.ip, 7);
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0x1234);
}

#[test]
fn jz_taken_when_zero_flag_set() {
    let mut harness = CpuHarness::new();
    harness.load_program(
        &[
            0xB8, 0x00, 0x00, // MOV AX, 0
            0x04, 0x00, // ADD AL, 0 (sets ZF)
            0x74, 0x02, // JZ +2
            0x90, 0x90, // skipped
            0xB8, 0x34, 0x12, // MOV AX, 0x1234
        ],
        0,
    );
    harness.step();
    harness.step();
    assert!(harness.cpu.get_flag(Cpu::ZF));
    harness.step();
    assert_eq!(harness.cpu.ip, 9);
    harness.step();
    assert_eq!(harness.cpu.regs[0], 0x1234);
}

#[test]
fn loop_decrements_cx_and_stops_at_zero() {
    let mut harness = CpuHarness::new();
    // MOV CX,2; loop: NOP; LOOP loop
    harness.load_program(
        &[
            0xB9, 0x02, 0x00, // MOV CX, 2
            0x90, // loop: NOP
            0xE2, 0xFD, // LOOP loop (back 3 bytes)
        ],
        0,
    );
    harness.step(); // MOV CX, 2
    harness.step(); // NOP
    harness.step(); // LOOP (CX=2->1, taken)
    assert_eq!(harness.cpu.regs[1], 1);
    assert_eq!(harness.cpu.ip, 3);
    harness.step(); // NOP
    harness.step(); // LOOP (CX=1->0, not taken)
    assert_eq!(harness.cpu.regs[1], 0);
    assert_eq!(harness.cpu.ip, 6);
}

#[test]
fn call_near_pushes_return_address_and_jumps() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[4] = 0x1000; // SP
    harness.load_program(
        &[
            0xE8, 0x02, 0x00, // CALL +2
            0x90, 0x90, // skipped
            0xB8, 0x34, 0x12, // MOV AX, 0x1234 (target)
        ],
        0,
    );
    harness.step();
    assert_eq!(harness.cpu.ip, 5);
    assert_eq!(harness.cpu.regs[4], 0x0FFE);
    assert_eq!(harness.bus.read16(0x0FFE), 3); // return address pushed
}

#[test]
fn ret_near_pops_ip() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[4] = 0x0FFE; // SP
    harness.bus.write16(0x0FFE, 0x1234);
    harness.load_program(&[0xC3], 0); // RET
    harness.step();
    assert_eq!(harness.cpu.ip, 0x1234);
    assert_eq!(harness.cpu.regs[4], 0x1000);
}

#[test]
fn int_n_pushes_frame_clears_if_and_vectors_through_ivt() {
    let mut harness = CpuHarness::new();
    harness.cpu.regs[4] = 0x1000; // SP
    harness.cpu.set_flag(Cpu::IF, true);
    // IVT slot for vector 0x21: CS:IP at physical 0x21*4 = 0x84
    harness.bus.write16(0x84, 0x9000); // handler IP
    harness.bus.write16(0x86, 0x0050); // handler CS
    harness.load_program(&[0xCD, 0x21], 0); // INT 0x21
    harness.step();
    assert_eq!(harness.cpu.ip, 0x9000);
    assert_eq!(harness.cpu.segments[1], 0x0050); // CS
    assert!(!harness.cpu.get_flag(Cpu::IF));
}
