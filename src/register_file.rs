use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::instruction::RegisterId;
use crate::register::Register16;

/// Byte index of the low half of a pair (F within AF).
const LOW_BYTE: u8 = 1;

const ZERO_FLAG_BIT: u8 = 7;
const SUB_FLAG_BIT: u8 = 6;
const HALF_CARRY_FLAG_BIT: u8 = 5;
const CARRY_FLAG_BIT: u8 = 4;

/// Storage pair an assembly identifier resolves to. Single-letter names
/// alias one half of a pair; the selector only picks the storage, views
/// into it are the operand's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    Af,
    Bc,
    De,
    Hl,
    Pc,
    Sp,
}

/// Registers of the LR35902: four general pairs, program counter, stack
/// pointer, the interrupt enable/flag pair, and the interrupt master
/// enable flag.
///
/// The low byte of AF holds the status flags at fixed bit positions
/// (Z=7, N=6, H=5, C=4); bits 0-3 are unused and stay zero.
#[derive(Debug, Default)]
pub struct RegisterFile {
    pub ime: AtomicBool,
    /// IE in the high byte, IF in the low byte.
    pub ie_if: Register16,
    pub af: Register16,
    pub bc: Register16,
    pub de: Register16,
    pub hl: Register16,
    pub pc: Register16,
    pub sp: Register16,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage for a pair selector.
    pub fn pair(&self, pair: Pair) -> &Register16 {
        match pair {
            Pair::Af => &self.af,
            Pair::Bc => &self.bc,
            Pair::De => &self.de,
            Pair::Hl => &self.hl,
            Pair::Pc => &self.pc,
            Pair::Sp => &self.sp,
        }
    }

    /// Resolves an operand register identifier to its storage pair.
    pub fn register(&self, id: RegisterId) -> &Register16 {
        self.pair(pair_for(id))
    }

    /// Resolves an assembly-level identifier ("A", "HL", "SP", ...) to its
    /// storage pair. Unknown identifiers fail with invalid-register-id.
    pub fn get_register_by_id(&self, id: &str) -> Result<&Register16> {
        let pair = match id {
            "A" | "F" | "AF" => Pair::Af,
            "B" | "C" | "BC" => Pair::Bc,
            "D" | "E" | "DE" => Pair::De,
            "H" | "L" | "HL" => Pair::Hl,
            "PC" => Pair::Pc,
            "SP" => Pair::Sp,
            _ => {
                return Err(Error::InvalidRegisterId(format!(
                    "{id} is not an LR35902 register"
                )));
            }
        };
        Ok(self.pair(pair))
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.ime.load(Ordering::SeqCst)
    }

    pub fn set_interrupts_enabled(&self, enabled: bool) {
        self.ime.store(enabled, Ordering::SeqCst);
    }

    pub fn zero_flag(&self) -> Result<bool> {
        self.af.get_bit(LOW_BYTE, ZERO_FLAG_BIT)
    }

    pub fn set_zero_flag(&self, value: bool) -> Result<()> {
        self.af.set_bit(LOW_BYTE, ZERO_FLAG_BIT, value)
    }

    pub fn sub_flag(&self) -> Result<bool> {
        self.af.get_bit(LOW_BYTE, SUB_FLAG_BIT)
    }

    pub fn set_sub_flag(&self, value: bool) -> Result<()> {
        self.af.set_bit(LOW_BYTE, SUB_FLAG_BIT, value)
    }

    pub fn half_carry_flag(&self) -> Result<bool> {
        self.af.get_bit(LOW_BYTE, HALF_CARRY_FLAG_BIT)
    }

    pub fn set_half_carry_flag(&self, value: bool) -> Result<()> {
        self.af.set_bit(LOW_BYTE, HALF_CARRY_FLAG_BIT, value)
    }

    pub fn carry_flag(&self) -> Result<bool> {
        self.af.get_bit(LOW_BYTE, CARRY_FLAG_BIT)
    }

    pub fn set_carry_flag(&self, value: bool) -> Result<()> {
        self.af.set_bit(LOW_BYTE, CARRY_FLAG_BIT, value)
    }
}

fn pair_for(id: RegisterId) -> Pair {
    match id {
        RegisterId::A | RegisterId::F | RegisterId::Af => Pair::Af,
        RegisterId::B | RegisterId::C | RegisterId::Bc => Pair::Bc,
        RegisterId::D | RegisterId::E | RegisterId::De => Pair::De,
        RegisterId::H | RegisterId::L | RegisterId::Hl => Pair::Hl,
        RegisterId::Pc => Pair::Pc,
        RegisterId::Sp => Pair::Sp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_zeroed() {
        let regs = RegisterFile::new();
        assert_eq!(regs.pc.get_word(), 0x0000);
        assert_eq!(regs.af.get_word(), 0x0000);
        assert!(!regs.interrupts_enabled());
        // Unused F bits read as zero.
        assert_eq!(regs.af.get_word() & 0x000F, 0);
    }

    #[test]
    fn flags_sit_at_their_documented_bits() {
        let regs = RegisterFile::new();
        regs.set_zero_flag(true).unwrap();
        assert_eq!(regs.af.get_word(), 0x0080);
        regs.set_sub_flag(true).unwrap();
        assert_eq!(regs.af.get_word(), 0x00C0);
        regs.set_half_carry_flag(true).unwrap();
        assert_eq!(regs.af.get_word(), 0x00E0);
        regs.set_carry_flag(true).unwrap();
        assert_eq!(regs.af.get_word(), 0x00F0);

        // H and N are distinct bits.
        regs.set_sub_flag(false).unwrap();
        assert!(regs.half_carry_flag().unwrap());
        assert!(!regs.sub_flag().unwrap());
    }

    #[test]
    fn flag_writes_do_not_touch_the_accumulator() {
        let regs = RegisterFile::new();
        regs.af.set_word(0x5600);
        regs.set_carry_flag(true).unwrap();
        assert_eq!(regs.af.get_word(), 0x5610);
    }

    #[test]
    fn id_lookup_aliases_pair_halves() {
        let regs = RegisterFile::new();
        regs.af.set_word(0x1230);
        assert_eq!(regs.get_register_by_id("A").unwrap().get_word(), 0x1230);
        assert_eq!(regs.get_register_by_id("F").unwrap().get_word(), 0x1230);
        assert_eq!(regs.get_register_by_id("AF").unwrap().get_word(), 0x1230);
        regs.get_register_by_id("SP").unwrap().set_word(0xFFFE);
        assert_eq!(regs.sp.get_word(), 0xFFFE);
    }

    #[test]
    fn unknown_id_fails() {
        let regs = RegisterFile::new();
        assert!(matches!(
            regs.get_register_by_id("IX"),
            Err(Error::InvalidRegisterId(_))
        ));
    }

    #[test]
    fn ime_round_trips() {
        let regs = RegisterFile::new();
        regs.set_interrupts_enabled(true);
        assert!(regs.interrupts_enabled());
        regs.set_interrupts_enabled(false);
        assert!(!regs.interrupts_enabled());
    }
}
