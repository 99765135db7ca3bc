use std::fmt;

/// Dispatch key for execution routines. Closed set: every mnemonic the
/// opcode table can produce has a variant, so dispatch is a direct match
/// instead of a string lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Nop,
    Halt,
    Ld,
    Jp,
    Jr,
    Call,
    Ret,
    Reti,
    Di,
    Ei,
    Rl,
    Bit,
    Swap,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Mnemonic::Nop => "NOP",
            Mnemonic::Halt => "HALT",
            Mnemonic::Ld => "LD",
            Mnemonic::Jp => "JP",
            Mnemonic::Jr => "JR",
            Mnemonic::Call => "CALL",
            Mnemonic::Ret => "RET",
            Mnemonic::Reti => "RETI",
            Mnemonic::Di => "DI",
            Mnemonic::Ei => "EI",
            Mnemonic::Rl => "RL",
            Mnemonic::Bit => "BIT",
            Mnemonic::Swap => "SWAP",
        };
        f.write_str(text)
    }
}

/// Assembly-level register identifiers. Single letters name one half of a
/// pair, two letters the whole pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterId {
    A,
    F,
    Af,
    B,
    C,
    Bc,
    D,
    E,
    De,
    H,
    L,
    Hl,
    Pc,
    Sp,
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RegisterId::A => "A",
            RegisterId::F => "F",
            RegisterId::Af => "AF",
            RegisterId::B => "B",
            RegisterId::C => "C",
            RegisterId::Bc => "BC",
            RegisterId::D => "D",
            RegisterId::E => "E",
            RegisterId::De => "DE",
            RegisterId::H => "H",
            RegisterId::L => "L",
            RegisterId::Hl => "HL",
            RegisterId::Pc => "PC",
            RegisterId::Sp => "SP",
        };
        f.write_str(text)
    }
}

/// What an instruction does to one status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagEffect {
    /// Forced to 1.
    Set,
    /// Forced to 0.
    Reset,
    /// Computed by the operation.
    Dictate,
    NoChange,
}

/// How executors interpret the immediate that follows the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpHint {
    None,
    /// Unsigned data value.
    Value,
    /// Absolute address.
    Address,
    /// Signed displacement.
    Signed,
}

/// Gate on a control-flow instruction's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    None,
    CarrySet,
    CarryNotSet,
    ZeroSet,
    ZeroNotSet,
}

/// A register operand with its addressing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandRegister {
    pub id: RegisterId,
    /// Order of appearance in the assembly form.
    pub position: u8,
    /// The register holds an address, not a value.
    pub address_mode: bool,
    /// Register is decremented after its value is used.
    pub decrement: bool,
    /// Register is incremented after its value is used.
    pub increment: bool,
    /// Register value is adjusted by the read value before use.
    pub value_modified: bool,
}

impl OperandRegister {
    pub const fn plain(id: RegisterId, position: u8) -> Self {
        Self {
            id,
            position,
            address_mode: false,
            decrement: false,
            increment: false,
            value_modified: false,
        }
    }

    pub const fn address(id: RegisterId, position: u8) -> Self {
        Self {
            address_mode: true,
            ..Self::plain(id, position)
        }
    }
}

/// A literal operand baked into the opcode itself (e.g. the bit number of
/// a BIT instruction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandConst {
    pub value: u8,
    pub position: u8,
}

/// One entry of the LR35902 instruction set.
///
/// Prototypes live in the opcode table and are immutable; the decoder
/// copies a prototype per decode and fills in `read_value`. The copy is
/// transient and discarded after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// 16-bit key; values above 0xFF are 0xCB-prefixed.
    pub opcode: u16,
    /// Total length including any immediate.
    pub size_in_bytes: u8,
    pub operand_registers: &'static [OperandRegister],
    pub operand_const_values: &'static [OperandConst],
    /// Whether an immediate follows the opcode in the instruction stream.
    pub has_read_value: bool,
    pub read_value_size_in_bytes: u8,
    pub read_value_position: u8,
    /// Filled in by the decoder.
    pub read_value: u16,
    pub interp_hint: InterpHint,
    pub condition: Condition,
    pub mnemonic: Mnemonic,
    /// Diagnostic form, e.g. "JR NC, e8".
    pub full_mnemonic: &'static str,
    /// Index 0 is the taken/executed cost; index 1, when present, the cost
    /// of a condition that was not satisfied.
    pub cycle_costs: &'static [u8],
    pub flag_z: FlagEffect,
    pub flag_n: FlagEffect,
    pub flag_h: FlagEffect,
    pub flag_c: FlagEffect,
}

impl Instruction {
    /// Prototype with no operands, no immediate, no condition, and no flag
    /// effects; the table builders below layer the rest on.
    pub const fn new(
        opcode: u16,
        size_in_bytes: u8,
        mnemonic: Mnemonic,
        full_mnemonic: &'static str,
        cycle_costs: &'static [u8],
    ) -> Self {
        Self {
            opcode,
            size_in_bytes,
            operand_registers: &[],
            operand_const_values: &[],
            has_read_value: false,
            read_value_size_in_bytes: 0,
            read_value_position: 0,
            read_value: 0,
            interp_hint: InterpHint::None,
            condition: Condition::None,
            mnemonic,
            full_mnemonic,
            cycle_costs,
            flag_z: FlagEffect::NoChange,
            flag_n: FlagEffect::NoChange,
            flag_h: FlagEffect::NoChange,
            flag_c: FlagEffect::NoChange,
        }
    }

    pub const fn with_read_value(mut self, size_in_bytes: u8, position: u8, hint: InterpHint) -> Self {
        self.has_read_value = true;
        self.read_value_size_in_bytes = size_in_bytes;
        self.read_value_position = position;
        self.interp_hint = hint;
        self
    }

    pub const fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub const fn with_registers(mut self, registers: &'static [OperandRegister]) -> Self {
        self.operand_registers = registers;
        self
    }

    pub const fn with_consts(mut self, consts: &'static [OperandConst]) -> Self {
        self.operand_const_values = consts;
        self
    }

    pub const fn with_flags(
        mut self,
        z: FlagEffect,
        n: FlagEffect,
        h: FlagEffect,
        c: FlagEffect,
    ) -> Self {
        self.flag_z = z;
        self.flag_n = n;
        self.flag_h = h;
        self.flag_c = c;
        self
    }

    /// Read value as unsigned 8-bit data.
    pub fn unsigned_8(&self) -> u8 {
        self.read_value as u8
    }

    /// Read value as a signed 8-bit displacement.
    pub fn signed_8(&self) -> i8 {
        self.read_value as u8 as i8
    }

    /// Read value as an unsigned 16-bit value or address.
    pub fn unsigned_16(&self) -> u16 {
        self.read_value
    }
}
