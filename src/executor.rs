use crate::error::{Error, Result};
use crate::instruction::{Condition, Instruction, InterpHint, Mnemonic, RegisterId};
use crate::memory::MemorySource;
use crate::mmu::MemoryController;
use crate::register_file::RegisterFile;

/// Executes decoded instructions against the register file and memory.
///
/// Dispatch is a direct match on the instruction's mnemonic. Mnemonics in
/// the opcode table whose families are not implemented yet resolve to the
/// invalid-index "no executor" failure, which marks a table/dispatch
/// mismatch rather than bad input data.
#[derive(Debug, Default)]
pub struct InstructionExecutor;

impl InstructionExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Runs the instruction's architectural effect and returns its elapsed
    /// cycle cost. On failure the register file is left exactly as it was.
    pub fn execute_instruction(
        &self,
        instruction: &Instruction,
        register_file: &RegisterFile,
        memory_controller: &MemoryController,
    ) -> Result<u8> {
        match instruction.mnemonic {
            Mnemonic::Jp => exec_jp(instruction, register_file),
            Mnemonic::Jr => exec_jr(instruction, register_file),
            Mnemonic::Call => exec_call(instruction, register_file, memory_controller),
            Mnemonic::Ret => exec_ret(instruction, register_file, memory_controller),
            Mnemonic::Reti => exec_reti(instruction, register_file, memory_controller),
            other => Err(Error::InvalidIndex(format!(
                "no executor registered for {other} ({})",
                instruction.full_mnemonic
            ))),
        }
    }
}

/// Evaluates the Z/C/NZ/NC gate. Reaching this with an unconditional
/// instruction is a table construction defect, not a runtime condition.
fn condition_satisfied(instruction: &Instruction, register_file: &RegisterFile) -> Result<bool> {
    let (flag, wanted) = match instruction.condition {
        Condition::ZeroSet => (register_file.zero_flag()?, true),
        Condition::ZeroNotSet => (register_file.zero_flag()?, false),
        Condition::CarrySet => (register_file.carry_flag()?, true),
        Condition::CarryNotSet => (register_file.carry_flag()?, false),
        Condition::None => unreachable!(
            "unconditional instruction {} reached the flag check",
            instruction.full_mnemonic
        ),
    };
    Ok(flag == wanted)
}

/// Checks the instruction's gate, if it has one.
fn gate_open(instruction: &Instruction, register_file: &RegisterFile) -> Result<bool> {
    if instruction.condition == Condition::None {
        return Ok(true);
    }
    condition_satisfied(instruction, register_file)
}

/// Cost of a conditional instruction whose gate was closed: the second
/// declared cost when present, the first otherwise.
fn not_taken(instruction: &Instruction, register_file: &RegisterFile) -> u8 {
    register_file.pc.increment(1);
    instruction
        .cycle_costs
        .get(1)
        .copied()
        .unwrap_or(instruction.cycle_costs[0])
}

fn missing_operands(instruction: &Instruction) -> Error {
    Error::Contract(format!(
        "{} ({:#06x}) lacks the operands its executor needs",
        instruction.full_mnemonic, instruction.opcode
    ))
}

/// JP: absolute jump to the immediate address, or to HL for `JP HL`.
fn exec_jp(instruction: &Instruction, register_file: &RegisterFile) -> Result<u8> {
    if !gate_open(instruction, register_file)? {
        return Ok(not_taken(instruction, register_file));
    }
    if instruction.has_read_value && instruction.interp_hint == InterpHint::Address {
        register_file.pc.set_word(instruction.unsigned_16());
    } else if instruction
        .operand_registers
        .first()
        .is_some_and(|operand| operand.id == RegisterId::Hl)
    {
        register_file.pc.set_word(register_file.hl.get_word());
    } else {
        return Err(missing_operands(instruction));
    }
    Ok(instruction.cycle_costs[0])
}

/// JR: jump relative by a signed 8-bit displacement.
fn exec_jr(instruction: &Instruction, register_file: &RegisterFile) -> Result<u8> {
    if !gate_open(instruction, register_file)? {
        return Ok(not_taken(instruction, register_file));
    }
    if !(instruction.has_read_value && instruction.interp_hint == InterpHint::Signed) {
        return Err(missing_operands(instruction));
    }
    let pc = register_file.pc.get_word();
    register_file
        .pc
        .set_word(pc.wrapping_add_signed(i16::from(instruction.signed_8())));
    Ok(instruction.cycle_costs[0])
}

/// CALL: push the address of the next instruction, then jump to the
/// immediate address. The stack grows downward; the push is committed only
/// after the memory write succeeds.
fn exec_call(
    instruction: &Instruction,
    register_file: &RegisterFile,
    memory_controller: &MemoryController,
) -> Result<u8> {
    if !gate_open(instruction, register_file)? {
        return Ok(not_taken(instruction, register_file));
    }
    if !(instruction.has_read_value && instruction.interp_hint == InterpHint::Address) {
        return Err(missing_operands(instruction));
    }
    let return_address = register_file
        .pc
        .get_word()
        .wrapping_add(u16::from(instruction.size_in_bytes));
    let new_sp = register_file.sp.get_word().wrapping_sub(2);
    memory_controller.set_word(new_sp, return_address)?;
    register_file.sp.set_word(new_sp);
    register_file.pc.set_word(instruction.unsigned_16());
    Ok(instruction.cycle_costs[0])
}

/// Pops the return address off the stack into the program counter. Shared
/// by RET and RETI; registers are only touched once the stack read has
/// succeeded.
fn pop_program_counter(
    register_file: &RegisterFile,
    memory_controller: &MemoryController,
) -> Result<()> {
    let sp = register_file.sp.get_word();
    let return_address = memory_controller.get_word(sp)?;
    register_file.pc.set_word(return_address);
    register_file.sp.set_word(sp.wrapping_add(2));
    Ok(())
}

/// RET: return from subroutine, optionally gated on a flag.
fn exec_ret(
    instruction: &Instruction,
    register_file: &RegisterFile,
    memory_controller: &MemoryController,
) -> Result<u8> {
    if !gate_open(instruction, register_file)? {
        return Ok(not_taken(instruction, register_file));
    }
    pop_program_counter(register_file, memory_controller)?;
    Ok(instruction.cycle_costs[0])
}

/// RETI: unconditional return that also sets the interrupt master enable.
fn exec_reti(
    instruction: &Instruction,
    register_file: &RegisterFile,
    memory_controller: &MemoryController,
) -> Result<u8> {
    pop_program_counter(register_file, memory_controller)?;
    register_file.set_interrupts_enabled(true);
    Ok(instruction.cycle_costs[0])
}
