use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::instruction::{
    Condition, FlagEffect, Instruction, InterpHint, Mnemonic, OperandConst, OperandRegister,
    RegisterId,
};

/// First byte of the two-byte opcode space.
pub const PREFIX_OPCODE: u8 = 0xCB;

/// The opcode table: a static mapping from 8/16-bit opcode values to
/// instruction prototypes. Built once at startup and read-only for the
/// rest of the process; the decoder and CPU take it by shared reference.
///
/// Prefixed opcodes are plain 16-bit keys (0xCBxx); the table does no
/// prefix handling of its own.
pub struct InstructionSet {
    table: HashMap<u16, Instruction>,
}

impl InstructionSet {
    pub fn new() -> Self {
        let mut table = HashMap::new();
        for instruction in INSTRUCTIONS {
            table.insert(instruction.opcode, *instruction);
        }
        Self { table }
    }

    /// Looks up the prototype for `opcode`.
    pub fn get_by_opcode(&self, opcode: u16) -> Result<&Instruction> {
        self.table.get(&opcode).ok_or(Error::InvalidOpcode(opcode))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::new()
    }
}

const HL_JUMP: &[OperandRegister] = &[OperandRegister::address(RegisterId::Hl, 0)];
const DE_TARGET: &[OperandRegister] = &[OperandRegister::plain(RegisterId::De, 0)];
const A_TARGET: &[OperandRegister] = &[OperandRegister::plain(RegisterId::A, 0)];
const A_SOURCE: &[OperandRegister] = &[OperandRegister::plain(RegisterId::A, 1)];
const C_TARGET: &[OperandRegister] = &[OperandRegister::plain(RegisterId::C, 0)];
const H_SOURCE: &[OperandRegister] = &[OperandRegister::plain(RegisterId::H, 1)];
const BIT_SEVEN: &[OperandConst] = &[OperandConst { value: 7, position: 0 }];

/// Instruction prototypes, cycle costs and flag effects per the published
/// LR35902 tables. The control-flow families are complete; the rest of the
/// entries exercise every decoder path (no immediate, 8/16-bit immediates,
/// constant operands, the 0xCB page).
static INSTRUCTIONS: &[Instruction] = &[
    // Misc, no immediate.
    Instruction::new(0x0000, 1, Mnemonic::Nop, "NOP", &[4]),
    Instruction::new(0x0076, 1, Mnemonic::Halt, "HALT", &[4]),
    Instruction::new(0x00F3, 1, Mnemonic::Di, "DI", &[4]),
    Instruction::new(0x00FB, 1, Mnemonic::Ei, "EI", &[4]),
    // Absolute jumps.
    Instruction::new(0x00C3, 3, Mnemonic::Jp, "JP a16", &[16])
        .with_read_value(2, 1, InterpHint::Address),
    Instruction::new(0x00C2, 3, Mnemonic::Jp, "JP NZ, a16", &[16, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::ZeroNotSet),
    Instruction::new(0x00CA, 3, Mnemonic::Jp, "JP Z, a16", &[16, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::ZeroSet),
    Instruction::new(0x00D2, 3, Mnemonic::Jp, "JP NC, a16", &[16, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::CarryNotSet),
    Instruction::new(0x00DA, 3, Mnemonic::Jp, "JP C, a16", &[16, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::CarrySet),
    Instruction::new(0x00E9, 1, Mnemonic::Jp, "JP HL", &[4]).with_registers(HL_JUMP),
    // Relative jumps.
    Instruction::new(0x0018, 2, Mnemonic::Jr, "JR e8", &[12])
        .with_read_value(1, 1, InterpHint::Signed),
    Instruction::new(0x0020, 2, Mnemonic::Jr, "JR NZ, e8", &[12, 8])
        .with_read_value(1, 1, InterpHint::Signed)
        .with_condition(Condition::ZeroNotSet),
    Instruction::new(0x0028, 2, Mnemonic::Jr, "JR Z, e8", &[12, 8])
        .with_read_value(1, 1, InterpHint::Signed)
        .with_condition(Condition::ZeroSet),
    Instruction::new(0x0030, 2, Mnemonic::Jr, "JR NC, e8", &[12, 8])
        .with_read_value(1, 1, InterpHint::Signed)
        .with_condition(Condition::CarryNotSet),
    Instruction::new(0x0038, 2, Mnemonic::Jr, "JR C, e8", &[12, 8])
        .with_read_value(1, 1, InterpHint::Signed)
        .with_condition(Condition::CarrySet),
    // Subroutine calls.
    Instruction::new(0x00CD, 3, Mnemonic::Call, "CALL a16", &[24])
        .with_read_value(2, 1, InterpHint::Address),
    Instruction::new(0x00C4, 3, Mnemonic::Call, "CALL NZ, a16", &[24, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::ZeroNotSet),
    Instruction::new(0x00CC, 3, Mnemonic::Call, "CALL Z, a16", &[24, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::ZeroSet),
    Instruction::new(0x00D4, 3, Mnemonic::Call, "CALL NC, a16", &[24, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::CarryNotSet),
    Instruction::new(0x00DC, 3, Mnemonic::Call, "CALL C, a16", &[24, 12])
        .with_read_value(2, 1, InterpHint::Address)
        .with_condition(Condition::CarrySet),
    // Subroutine returns.
    Instruction::new(0x00C9, 1, Mnemonic::Ret, "RET", &[16]),
    Instruction::new(0x00C0, 1, Mnemonic::Ret, "RET NZ", &[20, 8])
        .with_condition(Condition::ZeroNotSet),
    Instruction::new(0x00C8, 1, Mnemonic::Ret, "RET Z", &[20, 8])
        .with_condition(Condition::ZeroSet),
    Instruction::new(0x00D0, 1, Mnemonic::Ret, "RET NC", &[20, 8])
        .with_condition(Condition::CarryNotSet),
    Instruction::new(0x00D8, 1, Mnemonic::Ret, "RET C", &[20, 8])
        .with_condition(Condition::CarrySet),
    Instruction::new(0x00D9, 1, Mnemonic::Reti, "RETI", &[16]),
    // Loads.
    Instruction::new(0x0011, 3, Mnemonic::Ld, "LD DE, n16", &[12])
        .with_read_value(2, 1, InterpHint::Value)
        .with_registers(DE_TARGET),
    Instruction::new(0x003E, 2, Mnemonic::Ld, "LD A, n8", &[8])
        .with_read_value(1, 1, InterpHint::Value)
        .with_registers(A_TARGET),
    Instruction::new(0x00EA, 3, Mnemonic::Ld, "LD [a16], A", &[16])
        .with_read_value(2, 0, InterpHint::Address)
        .with_registers(A_SOURCE),
    // 0xCB page.
    Instruction::new(0xCB11, 2, Mnemonic::Rl, "RL C", &[8])
        .with_registers(C_TARGET)
        .with_flags(
            FlagEffect::Dictate,
            FlagEffect::Reset,
            FlagEffect::Reset,
            FlagEffect::Dictate,
        ),
    Instruction::new(0xCB37, 2, Mnemonic::Swap, "SWAP A", &[8])
        .with_registers(A_TARGET)
        .with_flags(
            FlagEffect::Dictate,
            FlagEffect::Reset,
            FlagEffect::Reset,
            FlagEffect::Reset,
        ),
    Instruction::new(0xCB7C, 2, Mnemonic::Bit, "BIT 7, H", &[8])
        .with_registers(H_SOURCE)
        .with_consts(BIT_SEVEN)
        .with_flags(
            FlagEffect::Dictate,
            FlagEffect::Reset,
            FlagEffect::Set,
            FlagEffect::NoChange,
        ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_the_prototype() {
        let set = InstructionSet::new();
        let jp = set.get_by_opcode(0x00C3).unwrap();
        assert_eq!(jp.mnemonic, Mnemonic::Jp);
        assert_eq!(jp.size_in_bytes, 3);
        assert_eq!(jp.cycle_costs, &[16]);
        assert!(jp.has_read_value);
    }

    #[test]
    fn prefixed_opcodes_are_distinct_keys() {
        let set = InstructionSet::new();
        let bit = set.get_by_opcode(0xCB7C).unwrap();
        assert_eq!(bit.mnemonic, Mnemonic::Bit);
        assert_eq!(bit.operand_const_values[0].value, 7);
        // The bare prefix byte itself is not an instruction.
        assert!(matches!(
            set.get_by_opcode(0x00CB),
            Err(Error::InvalidOpcode(0x00CB))
        ));
    }

    #[test]
    fn absent_opcodes_fail() {
        let set = InstructionSet::new();
        assert!(matches!(
            set.get_by_opcode(0x00E3),
            Err(Error::InvalidOpcode(0x00E3))
        ));
        assert!(matches!(
            set.get_by_opcode(0x00ED),
            Err(Error::InvalidOpcode(0x00ED))
        ));
    }

    #[test]
    fn no_immediate_entries_carry_no_interp_hint() {
        let set = InstructionSet::new();
        for instruction in INSTRUCTIONS {
            if !instruction.has_read_value {
                assert_eq!(
                    instruction.interp_hint,
                    InterpHint::None,
                    "{} declares a hint without an immediate",
                    instruction.full_mnemonic
                );
            }
        }
        assert!(!set.is_empty());
    }

    #[test]
    fn conditional_entries_declare_a_not_taken_cost() {
        for instruction in INSTRUCTIONS {
            if instruction.condition != Condition::None {
                assert_eq!(
                    instruction.cycle_costs.len(),
                    2,
                    "{} is conditional but lacks a second cost",
                    instruction.full_mnemonic
                );
            }
        }
    }
}
