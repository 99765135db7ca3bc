use std::sync::Arc;

use crate::decoder;
use crate::error::Result;
use crate::executor::InstructionExecutor;
use crate::mmu::MemoryController;
use crate::opcodes::InstructionSet;
use crate::register_file::RegisterFile;

/// The LR35902 processor: register file plus executor, stepped one
/// fetch-decode-execute cycle at a time against a memory controller.
pub struct Cpu {
    register_file: RegisterFile,
    instruction_set: Arc<InstructionSet>,
    executor: InstructionExecutor,
}

impl Cpu {
    /// CPU with the program counter at 0x0000 (boot ROM start). The
    /// instruction set is built by the host and shared in, so table
    /// construction stays testable on its own.
    pub fn new(instruction_set: Arc<InstructionSet>) -> Self {
        Self {
            register_file: RegisterFile::new(),
            instruction_set,
            executor: InstructionExecutor::new(),
        }
    }

    /// One emulation step: decode at the current program counter, execute,
    /// and return the elapsed cycle count. The first failure from either
    /// phase surfaces verbatim.
    pub fn fetch_decode_execute(&mut self, memory_controller: &MemoryController) -> Result<u8> {
        let pc = self.register_file.pc.get_word();
        let instruction = decoder::decode(memory_controller, pc, &self.instruction_set)?;
        self.executor
            .execute_instruction(&instruction, &self.register_file, memory_controller)
    }

    /// Register and flag access for debuggers and diagnostics.
    pub fn register_file(&self) -> &RegisterFile {
        &self.register_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::AddressableMemory;

    fn cpu_with(program: Vec<u8>) -> (Cpu, MemoryController) {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0000, Arc::new(AddressableMemory::new(program, false)))
            .unwrap();
        (Cpu::new(Arc::new(InstructionSet::new())), mmu)
    }

    #[test]
    fn step_decodes_at_the_current_pc() {
        let mut program = vec![0xC3, 0x00, 0x04];
        program.resize(0x08, 0);
        program[0x04] = 0x18; // JR e8
        program[0x05] = 0xFE;
        let (mut cpu, mmu) = cpu_with(program);

        assert_eq!(cpu.fetch_decode_execute(&mmu).unwrap(), 16);
        assert_eq!(cpu.register_file().pc.get_word(), 0x0004);

        assert_eq!(cpu.fetch_decode_execute(&mmu).unwrap(), 12);
        assert_eq!(cpu.register_file().pc.get_word(), 0x0002);
    }

    #[test]
    fn decode_failure_surfaces_verbatim() {
        let (mut cpu, mmu) = cpu_with(vec![0xE3]);
        assert!(matches!(
            cpu.fetch_decode_execute(&mmu),
            Err(Error::InvalidOpcode(0x00E3))
        ));
    }

    #[test]
    fn execute_failure_surfaces_verbatim() {
        // RET with the stack pointer outside every mounted bank.
        let (mut cpu, mmu) = cpu_with(vec![0xC9]);
        cpu.register_file().sp.set_word(0x8000);
        assert!(matches!(
            cpu.fetch_decode_execute(&mmu),
            Err(Error::InvalidMemoryRange(_))
        ));
    }
}
