use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::cpu::Cpu;
use crate::error::Result;
use crate::memory::MemoryBlock;
use crate::mmu::MemoryController;
use crate::opcodes::InstructionSet;
use crate::register_file::RegisterFile;

/// High-level facade wiring the CPU and the banked address space into one
/// machine. The host mounts ROM/RAM banks, then drives the emulation loop;
/// other threads may read or write the shared address space while it runs.
pub struct Gbc {
    cpu: Cpu,
    memory_controller: MemoryController,
    run_flag: Arc<AtomicBool>,
}

impl Gbc {
    pub fn new() -> Self {
        let instruction_set = Arc::new(InstructionSet::new());
        Self {
            cpu: Cpu::new(instruction_set),
            memory_controller: MemoryController::new(),
            run_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mounts a block into the machine's address space.
    pub fn mount_memory(&self, start_addr: u16, memory: Arc<dyn MemoryBlock>) -> Result<()> {
        self.memory_controller.mount_memory(start_addr, memory)
    }

    pub fn unmount_range(&self, range_start: u16) -> Result<()> {
        self.memory_controller.unmount_range(range_start)
    }

    pub fn memory(&self) -> &MemoryController {
        &self.memory_controller
    }

    /// Register and flag access for debuggers and diagnostics.
    pub fn register_file(&self) -> &RegisterFile {
        self.cpu.register_file()
    }

    /// One fetch-decode-execute step.
    pub fn step(&mut self) -> Result<u8> {
        self.cpu.fetch_decode_execute(&self.memory_controller)
    }

    /// Handle for stopping the loop from another thread. Clearing it is
    /// observed before the next iteration; the in-flight instruction
    /// always completes.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.run_flag.clone()
    }

    pub fn stop(&self) {
        self.run_flag.store(false, Ordering::SeqCst);
    }

    /// Runs until the stop flag clears or a step fails; returns the total
    /// cycle count on a clean stop and the first failure otherwise. No
    /// retry semantics: any retry policy belongs to the caller.
    pub fn main_loop(&mut self) -> Result<u64> {
        info!(
            "starting emulation loop, pc={:#06x}",
            self.register_file().pc.get_word()
        );
        self.run_flag.store(true, Ordering::SeqCst);
        let mut total_cycles = 0u64;
        while self.run_flag.load(Ordering::SeqCst) {
            match self.step() {
                Ok(cycles) => total_cycles += u64::from(cycles),
                Err(err) => {
                    warn!(
                        "emulation halted at pc={:#06x}: {err}",
                        self.register_file().pc.get_word()
                    );
                    return Err(err);
                }
            }
        }
        info!("emulation loop stopped after {total_cycles} cycles");
        Ok(total_cycles)
    }
}

impl Default for Gbc {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::AddressableMemory;

    #[test]
    fn main_loop_halts_on_first_failure() {
        let mut gbc = Gbc::new();
        // 0xE3 has no table entry.
        gbc.mount_memory(0x0000, Arc::new(AddressableMemory::new(vec![0xE3], false)))
            .unwrap();
        assert!(matches!(
            gbc.main_loop(),
            Err(Error::InvalidOpcode(0x00E3))
        ));
    }

    #[test]
    fn stop_flag_breaks_the_loop() {
        let mut gbc = Gbc::new();
        // JR +0 re-decodes itself forever: pc moves by the displacement
        // alone, so a zero displacement is a tight self-loop.
        gbc.mount_memory(
            0x0000,
            Arc::new(AddressableMemory::new(vec![0x18, 0x00], false)),
        )
        .unwrap();

        let stop = gbc.stop_handle();
        let watchdog = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            stop.store(false, std::sync::atomic::Ordering::SeqCst);
        });
        let cycles = gbc.main_loop().unwrap();
        watchdog.join().unwrap();
        assert!(cycles > 0);
    }

    #[test]
    fn mounts_are_visible_through_the_facade() {
        let gbc = Gbc::new();
        gbc.mount_memory(0xC000, Arc::new(AddressableMemory::zeroed(0x2000)))
            .unwrap();
        assert_eq!(gbc.memory().get_memory_size(), 0x2000);
        gbc.unmount_range(0xC000).unwrap();
        assert_eq!(gbc.memory().get_memory_size(), 0);
    }
}
