use crate::error::{Error, Result};
use crate::instruction::Instruction;
use crate::memory::MemorySource;
use crate::opcodes::{InstructionSet, PREFIX_OPCODE};

/// Decodes the instruction at `address`.
///
/// Reads the opcode byte (extending to the 16-bit prefixed form when the
/// first byte is 0xCB), looks it up in the instruction set, and when the
/// prototype declares an immediate, fetches it from the bytes after the
/// opcode into a copy of the prototype. Pure read-and-lookup: the memory
/// source is never written, and any read failure aborts the decode
/// unwrapped.
pub fn decode(
    memory: &impl MemorySource,
    address: u16,
    instruction_set: &InstructionSet,
) -> Result<Instruction> {
    let mut instruction = *fetch_prototype(memory, address, instruction_set)?;
    if instruction.has_read_value {
        // The immediate sits after the opcode bytes: total size minus the
        // immediate's own width. An opcode this close to 0xFFFF cannot
        // carry its immediate at all.
        let offset = u16::from(instruction.size_in_bytes - instruction.read_value_size_in_bytes);
        let value_address = address.checked_add(offset).ok_or_else(|| {
            Error::InvalidIndex(format!(
                "instruction at {address:#06x} extends past the top of the address space"
            ))
        })?;
        instruction.read_value =
            read_value(memory, value_address, instruction.read_value_size_in_bytes)?;
    }
    Ok(instruction)
}

fn fetch_prototype<'a>(
    memory: &impl MemorySource,
    address: u16,
    instruction_set: &'a InstructionSet,
) -> Result<&'a Instruction> {
    let first_byte = memory.get_byte(address)?;
    let opcode = if first_byte == PREFIX_OPCODE {
        // Prefix byte and the byte after it form the full opcode key.
        memory.get_word(address)?
    } else {
        u16::from(first_byte)
    };
    instruction_set.get_by_opcode(opcode)
}

fn read_value(memory: &impl MemorySource, address: u16, size_in_bytes: u8) -> Result<u16> {
    if size_in_bytes > 1 {
        memory.get_word(address)
    } else {
        memory.get_byte(address).map(u16::from)
    }
}
