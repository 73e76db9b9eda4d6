//! Minimal disassembler: the optional external collaborator `spec.md` §6
//! and `SPEC_FULL.md` §6.2 describe. Read-only — it borrows the `Bus` and a
//! snapshot of the segment-override/registers it needs to render an
//! operand, and never mutates CPU state. No functional dependency from
//! `Cpu::step`; it exists purely for debugging/test-failure output, the
//! role `andrewimm-ezpc`'s (out-of-scope, dropped) TUI disassembly served
//! before this crate reduced it to a plain string function.
//!
//! Grounded in `andrewimm-ezpc/src/cpu/tier1/decode.rs`'s mnemonic-name
//! table and in `Cpu::decode_instruction`'s own opcode grouping, reusing
//! both rather than re-deriving instruction shapes a third time.

use crate::bus::Bus;
use crate::cpu::decode::{AddressingMode, ModRM};

const REG8: [&str; 8] = ["AL", "CL", "DL", "BL", "AH", "CH", "DH", "BH"];
const REG16: [&str; 8] = ["AX", "CX", "DX", "BX", "SP", "BP", "SI", "DI"];
const SEGREG: [&str; 4] = ["ES", "CS", "SS", "DS"];

fn base_index_name(base_index: u8) -> &'static str {
    match base_index {
        0b000 => "BX+SI",
        0b001 => "BX+DI",
        0b010 => "BP+SI",
        0b011 => "BP+DI",
        0b100 => "SI",
        0b101 => "DI",
        0b110 => "BP",
        0b111 => "BX",
        _ => unreachable!("r/m base-index is always 3 bits"),
    }
}

/// Render a ModR/M memory operand as `[seg:base+index+disp]`, honoring an
/// explicit segment-override prefix name when one was decoded.
fn render_memory_operand(modrm: &ModRM, override_seg: Option<&str>) -> String {
    let (default_seg, body) = match modrm.mode {
        AddressingMode::DirectAddress { addr } => ("DS", format!("{:04X}", addr)),
        AddressingMode::MemoryIndirect { base_index } => {
            // mod=00 never encodes BP alone (r/m=110 means DirectAddress there),
            // so every MemoryIndirect base/index pair defaults to DS.
            ("DS", base_index_name(base_index).to_string())
        }
        AddressingMode::MemoryDisp8 { base_index, disp } => {
            let seg = if base_index == 0b110 { "SS" } else { "DS" };
            let sign = if disp < 0 { "-" } else { "+" };
            (seg, format!("{}{}{:#x}", base_index_name(base_index), sign, disp.unsigned_abs()))
        }
        AddressingMode::MemoryDisp16 { base_index, disp } => {
            let seg = if base_index == 0b110 { "SS" } else { "DS" };
            let sign = if disp < 0 { "-" } else { "+" };
            (seg, format!("{}{}{:#x}", base_index_name(base_index), sign, disp.unsigned_abs()))
        }
        AddressingMode::RegisterDirect { .. } => {
            unreachable!("render_memory_operand called on a register-direct ModRM")
        }
    };
    let seg = override_seg.unwrap_or(default_seg);
    format!("[{}:{}]", seg, body)
}

/// Disassemble one instruction at `cs:ip`.
///
/// Covers the opcode families named in `spec.md` §4.D's "must be supported"
/// set plus the common reg/mem forms; anything else renders as `DB 0xNN`,
/// matching the spirit of `spec.md` §9's "decoder length values are
/// authoritative for the disassembler even where execution semantics are
/// absent".
pub fn disassemble_one(bus: &Bus, cs: u16, ip: u16) -> String {
    let start = crate::cpu::Cpu::physical(cs, ip);
    let opcode = bus.read8(start);
    let mut cursor = 1u32;

    let (prefix, opcode, cursor_after_prefix) = match opcode {
        0x26 => ("ES: ", bus.read8(start + 1), 2u32),
        0x2E => ("CS: ", bus.read8(start + 1), 2u32),
        0x36 => ("SS: ", bus.read8(start + 1), 2u32),
        0x3E => ("DS: ", bus.read8(start + 1), 2u32),
        other => ("", other, 1u32),
    };
    cursor = cursor_after_prefix.max(cursor);
    let override_seg = match prefix {
        "ES: " => Some("ES"),
        "CS: " => Some("CS"),
        "SS: " => Some("SS"),
        "DS: " => Some("DS"),
        _ => None,
    };

    let read_u8 = |off: u32| bus.read8(start + off);
    let read_u16 = |off: u32| bus.read16(start + off);

    let (mnemonic, operands, _extra) = match opcode {
        0xB0..=0xB7 => {
            let reg = opcode & 0x07;
            let imm = read_u8(cursor);
            (
                "MOV".to_string(),
                format!("{}, {:#04x}", REG8[reg as usize], imm),
                1u32,
            )
        }
        0xB8..=0xBF => {
            let reg = opcode & 0x07;
            let imm = read_u16(cursor);
            (
                "MOV".to_string(),
                format!("{}, {:#06x}", REG16[reg as usize], imm),
                2u32,
            )
        }
        0x88 | 0x89 | 0x8A | 0x8B => {
            let is_byte = opcode & 1 == 0;
            let to_reg = opcode & 2 != 0;
            let modrm_byte = read_u8(cursor);
            let modrm = ModRM::decode(modrm_byte);
            let (extra, rm_text) = rm_text(&modrm, bus, start, cursor + 1, override_seg, is_byte);
            let reg_name = if is_byte {
                REG8[modrm.reg as usize]
            } else {
                REG16[modrm.reg as usize]
            };
            let operands = if to_reg {
                format!("{}, {}", reg_name, rm_text)
            } else {
                format!("{}, {}", rm_text, reg_name)
            };
            ("MOV".to_string(), operands, extra + 1)
        }
        0x8C | 0x8E => {
            let modrm_byte = read_u8(cursor);
            let modrm = ModRM::decode(modrm_byte);
            let (extra, rm_text) = rm_text(&modrm, bus, start, cursor + 1, override_seg, false);
            let seg_name = SEGREG[(modrm.reg & 0b11) as usize];
            let operands = if opcode == 0x8C {
                format!("{}, {}", rm_text, seg_name)
            } else {
                format!("{}, {}", seg_name, rm_text)
            };
            ("MOV".to_string(), operands, extra + 1)
        }
        0x50..=0x57 => ("PUSH".to_string(), REG16[(opcode & 7) as usize].to_string(), 0),
        0x58..=0x5F => ("POP".to_string(), REG16[(opcode & 7) as usize].to_string(), 0),
        0x06 => ("PUSH".to_string(), "ES".to_string(), 0),
        0x0E => ("PUSH".to_string(), "CS".to_string(), 0),
        0x16 => ("PUSH".to_string(), "SS".to_string(), 0),
        0x1E => ("PUSH".to_string(), "DS".to_string(), 0),
        0x07 => ("POP".to_string(), "ES".to_string(), 0),
        0x17 => ("POP".to_string(), "SS".to_string(), 0),
        0x1F => ("POP".to_string(), "DS".to_string(), 0),
        0x12 | 0x13 | 0x14 | 0x15 => {
            if opcode < 0x14 {
                let is_byte = opcode == 0x12;
                let modrm_byte = read_u8(cursor);
                let modrm = ModRM::decode(modrm_byte);
                let (extra, rm_text) = rm_text(&modrm, bus, start, cursor + 1, override_seg, is_byte);
                let reg_name = if is_byte {
                    REG8[modrm.reg as usize]
                } else {
                    REG16[modrm.reg as usize]
                };
                ("ADC".to_string(), format!("{}, {}", reg_name, rm_text), extra + 1)
            } else if opcode == 0x14 {
                let imm = read_u8(cursor);
                ("ADC".to_string(), format!("AL, {:#04x}", imm), 1)
            } else {
                let imm = read_u16(cursor);
                ("ADC".to_string(), format!("AX, {:#06x}", imm), 2)
            }
        }
        0x31 => {
            let modrm_byte = read_u8(cursor);
            let modrm = ModRM::decode(modrm_byte);
            let (extra, rm_text) = rm_text(&modrm, bus, start, cursor + 1, override_seg, false);
            ("XOR".to_string(), format!("{}, {}", rm_text, REG16[modrm.reg as usize]), extra + 1)
        }
        0x48..=0x4F => ("DEC".to_string(), REG16[(opcode & 7) as usize].to_string(), 0),
        0x37 => ("AAA".to_string(), String::new(), 0),
        0x3F => ("AAS".to_string(), String::new(), 0),
        0xD4 => {
            let imm = read_u8(cursor);
            ("AAM".to_string(), format!("{:#04x}", imm), 1)
        }
        0xD5 => {
            let imm = read_u8(cursor);
            ("AAD".to_string(), format!("{:#04x}", imm), 1)
        }
        0xEB => {
            let rel = read_u8(cursor) as i8;
            let target = (ip.wrapping_add(2) as i16).wrapping_add(rel as i16) as u16;
            ("JMP".to_string(), format!("{:#06x}", target), 1)
        }
        0xCC => ("INT".to_string(), "3".to_string(), 0),
        0xCD => {
            let imm = read_u8(cursor);
            ("INT".to_string(), format!("{:#04x}", imm), 1)
        }
        0xAA => ("STOSB".to_string(), String::new(), 0),
        0xAB => ("STOSW".to_string(), String::new(), 0),
        0xFC => ("CLD".to_string(), String::new(), 0),
        0xC3 => ("RET".to_string(), String::new(), 0),
        0x90 => ("NOP".to_string(), String::new(), 0),
        0xF4 => ("HLT".to_string(), String::new(), 0),
        other => ("DB".to_string(), format!("{:#04x}", other), 0),
    };

    if operands.is_empty() {
        format!("{}{}", prefix, mnemonic)
    } else {
        format!("{}{} {}", prefix, mnemonic, operands)
    }
}

/// Render a decoded ModR/M's r/m field, returning the extra instruction
/// bytes it consumed (displacement bytes beyond the ModR/M byte itself)
/// alongside the text.
fn rm_text(
    modrm: &ModRM,
    bus: &Bus,
    start: u32,
    disp_offset: u32,
    override_seg: Option<&str>,
    is_byte: bool,
) -> (u32, String) {
    match modrm.mode {
        AddressingMode::RegisterDirect { rm_reg } => {
            let name = if is_byte {
                REG8[rm_reg as usize]
            } else {
                REG16[rm_reg as usize]
            };
            (0, name.to_string())
        }
        AddressingMode::MemoryIndirect { .. } => (0, render_memory_operand(modrm, override_seg)),
        AddressingMode::MemoryDisp8 { base_index, .. } => {
            let disp = bus.read8(start + disp_offset) as i8;
            let m = ModRM { mode: AddressingMode::MemoryDisp8 { base_index, disp }, ..*modrm };
            (1, render_memory_operand(&m, override_seg))
        }
        AddressingMode::MemoryDisp16 { base_index, .. } => {
            let disp = bus.read16(start + disp_offset) as i16;
            let m = ModRM { mode: AddressingMode::MemoryDisp16 { base_index, disp }, ..*modrm };
            (2, render_memory_operand(&m, override_seg))
        }
        AddressingMode::DirectAddress { .. } => {
            let addr = bus.read16(start + disp_offset);
            let m = ModRM { mode: AddressingMode::DirectAddress { addr }, ..*modrm };
            (2, render_memory_operand(&m, override_seg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mov_r8_imm8_renders_with_hex_immediate() {
        let mut bus = Bus::flat_1mb();
        bus.write_span(0, &[0xB0, 0x10]);
        let line = disassemble_one(&bus, 0, 0);
        assert_eq!(line, "MOV AL, 0x10");
    }

    #[test]
    fn mov_r16_imm16_renders_little_endian_immediate() {
        let mut bus = Bus::flat_1mb();
        bus.write_span(0, &[0xB8, 0xCE, 0xFA]);
        let line = disassemble_one(&bus, 0, 0);
        assert_eq!(line, "MOV AX, 0xface");
    }

    #[test]
    fn segment_override_prefix_renders_before_mnemonic() {
        let mut bus = Bus::flat_1mb();
        // ES: MOV AX, [BX+SI] -> 26 8B 00
        bus.write_span(0, &[0x26, 0x8B, 0x00]);
        let line = disassemble_one(&bus, 0, 0);
        assert_eq!(line, "ES: MOV AX, [ES:BX+SI]");
    }

    #[test]
    fn direct_address_renders_as_bracketed_hex() {
        let mut bus = Bus::flat_1mb();
        // MOV AX, [0x1020] -> 8B 06 20 10
        bus.write_span(0, &[0x8B, 0x06, 0x20, 0x10]);
        let line = disassemble_one(&bus, 0, 0);
        assert_eq!(line, "MOV AX, [DS:1020]");
    }

    #[test]
    fn unimplemented_family_falls_back_to_db() {
        let mut bus = Bus::flat_1mb();
        bus.write8(0, 0x0F); // two-byte escape, out of scope
        let line = disassemble_one(&bus, 0, 0);
        assert_eq!(line, "DB 0x0f");
    }
}
