//! Instruction decoding: ModR/M parsing, operand representation, and the
//! opcode-to-[`DecodedInstruction`] decoder (the AddressingUnit plus the
//! decode half of the ExecutionUnit).

pub mod decode;
pub mod instruction;
pub mod modrm;
pub mod operands;

pub use decode::DISPATCH_TABLE;
pub use instruction::{DecodedInstruction, InstructionHandler};
pub use modrm::{AddressingMode, ModRM};
pub use operands::{Operand, OperandType};
