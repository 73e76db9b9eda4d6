//! Operand type definitions for decoded instructions

/// Types of operands that can appear in 8086 instructions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperandType {
    /// No operand
    None,
    /// 8-bit register (value is register index 0-7)
    Reg8,
    /// 16-bit register (value is register index 0-7)
    Reg16,
    /// Segment register (value is segment index 0-3)
    SegReg,
    /// 8-bit immediate value
    Imm8,
    /// 16-bit immediate value
    Imm16,
    /// 8-bit memory operand (requires addressing mode calculation)
    Mem8,
    /// 16-bit memory operand (requires addressing mode calculation)
    Mem16,
    /// Direct memory address (segment:offset), used by MOV AL/AX, moffs
    Direct,
    /// Relative offset for jumps (8-bit)
    Rel8,
    /// Relative offset for jumps (16-bit)
    Rel16,
}

/// Decoded operand with type and value.
///
/// For `Mem8`/`Mem16`, `value` holds the ModR/M r/m base-index encoding
/// (0-7), or the sentinel `0xFF` for direct addressing (`mod=00, r/m=110`),
/// in which case the address lives in `disp` instead. Group-opcode handlers
/// (e.g. `0x80`-`0x83`, `0xF6`/`0xF7`, `0xFE`/`0xFF`) get their sub-operation
/// selector from `DecodedInstruction::aux`, not from this struct.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub op_type: OperandType,
    pub value: u16,
    /// For memory operands: segment override, or 0xFF for "use default".
    pub segment: u8,
    /// For memory operands: displacement, sign-extended to i16.
    pub disp: i16,
}

impl Operand {
    pub fn new(op_type: OperandType, value: u16) -> Self {
        Self {
            op_type,
            value,
            segment: 0xFF,
            disp: 0,
        }
    }

    pub fn with_segment(mut self, segment: u8) -> Self {
        self.segment = segment;
        self
    }

    pub fn with_disp(mut self, disp: i16) -> Self {
        self.disp = disp;
        self
    }

    pub fn none() -> Self {
        Self::new(OperandType::None, 0)
    }

    pub fn reg8(reg: u8) -> Self {
        Self::new(OperandType::Reg8, reg as u16)
    }

    pub fn reg16(reg: u8) -> Self {
        Self::new(OperandType::Reg16, reg as u16)
    }

    pub fn seg(seg: u8) -> Self {
        Self::new(OperandType::SegReg, seg as u16)
    }

    pub fn imm8(value: u8) -> Self {
        Self::new(OperandType::Imm8, value as u16)
    }

    pub fn imm16(value: u16) -> Self {
        Self::new(OperandType::Imm16, value)
    }

    pub fn mem8(base_index: u8) -> Self {
        Self::new(OperandType::Mem8, base_index as u16)
    }

    pub fn mem8_disp8(base_index: u8, disp: i8) -> Self {
        Self::new(OperandType::Mem8, base_index as u16).with_disp(disp as i16)
    }

    pub fn mem8_disp16(base_index: u8, disp: i16) -> Self {
        Self::new(OperandType::Mem8, base_index as u16).with_disp(disp)
    }

    pub fn mem16(base_index: u8) -> Self {
        Self::new(OperandType::Mem16, base_index as u16)
    }

    pub fn mem16_disp8(base_index: u8, disp: i8) -> Self {
        Self::new(OperandType::Mem16, base_index as u16).with_disp(disp as i16)
    }

    pub fn mem16_disp16(base_index: u8, disp: i16) -> Self {
        Self::new(OperandType::Mem16, base_index as u16).with_disp(disp)
    }

    pub fn direct(addr: u16) -> Self {
        Self::new(OperandType::Direct, addr)
    }

    pub fn rel8(offset: i8) -> Self {
        Self::new(OperandType::Rel8, offset as i16 as u16)
    }

    pub fn rel16(offset: i16) -> Self {
        Self::new(OperandType::Rel16, offset as u16)
    }
}
