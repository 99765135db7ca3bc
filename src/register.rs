use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::memory::{MemoryBlock, MemorySource};

const REGISTER_BYTES: usize = 2;
const MAX_BIT_INDEX: u8 = 7;

/// A 16-bit CPU register pair: a two-byte addressable block with word and
/// bit-level access on top of the byte interface. Byte 0 is the high half
/// of the pair, byte 1 the low half.
#[derive(Debug, Default)]
pub struct Register16 {
    bytes: RwLock<[u8; REGISTER_BYTES]>,
}

impl Register16 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole pair as a 16-bit value.
    pub fn get_word(&self) -> u16 {
        let bytes = self.bytes.read().unwrap_or_else(PoisonError::into_inner);
        u16::from_be_bytes(*bytes)
    }

    /// Sets the whole pair.
    pub fn set_word(&self, value: u16) {
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        *bytes = value.to_be_bytes();
    }

    /// Adds `value` to the pair, wrapping at 16 bits.
    pub fn increment(&self, value: u16) {
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        *bytes = u16::from_be_bytes(*bytes).wrapping_add(value).to_be_bytes();
    }

    /// Subtracts `value` from the pair, wrapping at 16 bits.
    pub fn decrement(&self, value: u16) {
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        *bytes = u16::from_be_bytes(*bytes).wrapping_sub(value).to_be_bytes();
    }

    /// Reads one bit. `byte_index` selects the half (0 = high, 1 = low),
    /// `bit_index` counts from the least significant bit.
    pub fn get_bit(&self, byte_index: u8, bit_index: u8) -> Result<bool> {
        Self::check_indices(byte_index, bit_index)?;
        let bytes = self.bytes.read().unwrap_or_else(PoisonError::into_inner);
        Ok((bytes[usize::from(byte_index)] >> bit_index) & 0x01 != 0)
    }

    /// Writes one bit, leaving the rest of the pair untouched.
    pub fn set_bit(&self, byte_index: u8, bit_index: u8, value: bool) -> Result<()> {
        Self::check_indices(byte_index, bit_index)?;
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        let byte = &mut bytes[usize::from(byte_index)];
        if value {
            *byte |= 1 << bit_index;
        } else {
            *byte &= !(1 << bit_index);
        }
        Ok(())
    }

    fn check_indices(byte_index: u8, bit_index: u8) -> Result<()> {
        if usize::from(byte_index) >= REGISTER_BYTES || bit_index > MAX_BIT_INDEX {
            return Err(Error::InvalidIndex(format!(
                "bit access out of range (byte {byte_index}/{REGISTER_BYTES}, bit {bit_index}/{MAX_BIT_INDEX})"
            )));
        }
        Ok(())
    }
}

impl MemorySource for Register16 {
    fn get_byte(&self, addr: u16) -> Result<u8> {
        let bytes = self.bytes.read().unwrap_or_else(PoisonError::into_inner);
        bytes
            .get(usize::from(addr))
            .copied()
            .ok_or_else(|| register_out_of_range(addr))
    }

    fn get_word(&self, addr: u16) -> Result<u16> {
        if addr != 0 {
            return Err(register_out_of_range(addr));
        }
        Ok(self.get_word())
    }
}

// Registers are mountable so memory-mapped I/O can live in the address
// space alongside ROM and RAM banks.
impl MemoryBlock for Register16 {
    fn set_byte(&self, addr: u16, value: u8) -> Result<()> {
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        match bytes.get_mut(usize::from(addr)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(register_out_of_range(addr)),
        }
    }

    fn set_word(&self, addr: u16, value: u16) -> Result<()> {
        if addr != 0 {
            return Err(register_out_of_range(addr));
        }
        self.set_word(value);
        Ok(())
    }

    fn size(&self) -> usize {
        REGISTER_BYTES
    }
}

fn register_out_of_range(addr: u16) -> Error {
    Error::InvalidIndex(format!(
        "address {addr:#06x} is outside the register pair"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_round_trips() {
        let reg = Register16::new();
        reg.set_word(0xF0A0);
        assert_eq!(reg.get_word(), 0xF0A0);
        // High half sits at byte 0.
        assert_eq!(MemorySource::get_byte(&reg, 0).unwrap(), 0xF0);
        assert_eq!(MemorySource::get_byte(&reg, 1).unwrap(), 0xA0);
    }

    #[test]
    fn increment_and_decrement_wrap() {
        let reg = Register16::new();
        reg.set_word(0xFFFF);
        reg.increment(1);
        assert_eq!(reg.get_word(), 0x0000);
        reg.decrement(2);
        assert_eq!(reg.get_word(), 0xFFFE);
    }

    #[test]
    fn bit_accessors() {
        let reg = Register16::new();
        reg.set_bit(1, 7, true).unwrap();
        assert!(reg.get_bit(1, 7).unwrap());
        assert_eq!(reg.get_word(), 0x0080);
        reg.set_bit(1, 7, false).unwrap();
        assert_eq!(reg.get_word(), 0x0000);
    }

    #[test]
    fn bit_writes_leave_other_bits_alone() {
        let reg = Register16::new();
        reg.set_word(0xA5C3);
        reg.set_bit(0, 1, true).unwrap();
        assert_eq!(reg.get_word(), 0xA7C3);
        reg.set_bit(1, 0, false).unwrap();
        assert_eq!(reg.get_word(), 0xA7C2);
    }

    #[test]
    fn out_of_range_bit_indices_fail() {
        let reg = Register16::new();
        assert!(matches!(reg.get_bit(2, 0), Err(Error::InvalidIndex(_))));
        assert!(matches!(reg.get_bit(0, 8), Err(Error::InvalidIndex(_))));
        assert!(matches!(
            reg.set_bit(2, 0, true),
            Err(Error::InvalidIndex(_))
        ));
        assert!(matches!(
            reg.set_bit(0, 8, true),
            Err(Error::InvalidIndex(_))
        ));
    }
}
