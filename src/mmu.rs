use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::memory::{MemoryBlock, MemorySource};

/// One mounted stretch of the address space, backed by a storage block.
/// `range_end` is inclusive.
struct MemoryBank {
    range_start: u16,
    range_end: u16,
    mount_enabled: bool,
    memory: Arc<dyn MemoryBlock>,
}

impl MemoryBank {
    fn contains(&self, address: u16) -> bool {
        address >= self.range_start && address <= self.range_end
    }

    fn translate_address(&self, external_address: u16) -> u16 {
        external_address - self.range_start
    }
}

/// Banked virtual address space. ROM, RAM, and memory-mapped registers are
/// mounted as non-overlapping banks keyed by start address; every access
/// resolves the owning bank and delegates to its backing store with the
/// address translated into bank-local coordinates.
#[derive(Default)]
pub struct MemoryController {
    banks: RwLock<BTreeMap<u16, MemoryBank>>,
}

impl MemoryController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `memory` so that its first byte answers at `start_addr`.
    /// Fails with an invalid-memory-range error when the range would
    /// overlap an existing bank.
    pub fn mount_memory(&self, start_addr: u16, memory: Arc<dyn MemoryBlock>) -> Result<()> {
        let size = memory.size();
        if size == 0 {
            return Err(Error::InvalidMemoryRange(
                "cannot mount an empty memory block".into(),
            ));
        }
        // Bound check in usize: a block may fill the whole 64 KiB space,
        // so the last address cannot be derived in u16 arithmetic.
        let last_addr = usize::from(start_addr) + size - 1;
        if last_addr > usize::from(u16::MAX) {
            return Err(Error::InvalidMemoryRange(format!(
                "block of {size:#07x} bytes at {start_addr:#06x} exceeds the address space"
            )));
        }
        let end_addr = last_addr as u16;

        let mut banks = self.banks.write().unwrap_or_else(PoisonError::into_inner);
        if !range_is_free(&banks, start_addr, end_addr) {
            return Err(Error::InvalidMemoryRange(format!(
                "memory range {start_addr:#06x}-{end_addr:#06x} is occupied"
            )));
        }
        banks.insert(
            start_addr,
            MemoryBank {
                range_start: start_addr,
                range_end: end_addr,
                mount_enabled: true,
                memory,
            },
        );
        Ok(())
    }

    /// Unmounts the bank whose range begins at `range_start`.
    pub fn unmount_range(&self, range_start: u16) -> Result<()> {
        let mut banks = self.banks.write().unwrap_or_else(PoisonError::into_inner);
        match banks.remove(&range_start) {
            Some(_) => Ok(()),
            None => Err(Error::InvalidMemoryRange(format!(
                "no memory range starts at {range_start:#06x}"
            ))),
        }
    }

    /// Total size of all mounted banks in bytes.
    pub fn get_memory_size(&self) -> usize {
        let banks = self.banks.read().unwrap_or_else(PoisonError::into_inner);
        banks.values().map(|bank| bank.memory.size()).sum()
    }

    /// Unmounts every bank.
    pub fn free(&self) {
        self.banks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn set_byte(&self, addr: u16, value: u8) -> Result<()> {
        let banks = self.banks.read().unwrap_or_else(PoisonError::into_inner);
        let bank = bank_for(&banks, addr)?;
        bank.memory.set_byte(bank.translate_address(addr), value)
    }

    pub fn set_word(&self, addr: u16, value: u16) -> Result<()> {
        let banks = self.banks.read().unwrap_or_else(PoisonError::into_inner);
        let bank = bank_for(&banks, addr)?;
        bank.memory.set_word(bank.translate_address(addr), value)
    }
}

impl MemorySource for MemoryController {
    fn get_byte(&self, addr: u16) -> Result<u8> {
        let banks = self.banks.read().unwrap_or_else(PoisonError::into_inner);
        let bank = bank_for(&banks, addr)?;
        bank.memory.get_byte(bank.translate_address(addr))
    }

    fn get_word(&self, addr: u16) -> Result<u16> {
        let banks = self.banks.read().unwrap_or_else(PoisonError::into_inner);
        let bank = bank_for(&banks, addr)?;
        bank.memory.get_word(bank.translate_address(addr))
    }
}

/// Finds the bank owning `addr`: the bank with the greatest start address
/// at or below `addr` whose inclusive range still contains it.
fn bank_for(banks: &BTreeMap<u16, MemoryBank>, addr: u16) -> Result<&MemoryBank> {
    banks
        .range(..=addr)
        .next_back()
        .map(|(_, bank)| bank)
        .filter(|bank| bank.mount_enabled && bank.contains(addr))
        .ok_or_else(|| {
            Error::InvalidMemoryRange(format!(
                "address {addr:#06x} falls outside every mounted memory range"
            ))
        })
}

/// Overlap test against the sorted bank map: the first bank starting at or
/// above the request must not begin inside it, and the preceding bank must
/// not reach into its start.
fn range_is_free(banks: &BTreeMap<u16, MemoryBank>, start: u16, end: u16) -> bool {
    if let Some((_, next)) = banks.range(start..).next()
        && next.range_start <= end
    {
        return false;
    }
    if let Some((_, prev)) = banks.range(..start).next_back()
        && prev.contains(start)
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::AddressableMemory;

    fn block(len: usize) -> Arc<dyn MemoryBlock> {
        Arc::new(AddressableMemory::zeroed(len))
    }

    #[test]
    fn mounted_range_round_trips_with_translation() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0100, block(0x10)).unwrap();

        mmu.set_byte(0x0100, 0xAA).unwrap();
        mmu.set_byte(0x010F, 0xBB).unwrap();
        assert_eq!(mmu.get_byte(0x0100).unwrap(), 0xAA);
        assert_eq!(mmu.get_byte(0x010F).unwrap(), 0xBB);

        mmu.set_word(0x0104, 0x1234).unwrap();
        assert_eq!(mmu.get_word(0x0104).unwrap(), 0x1234);
    }

    #[test]
    fn unowned_addresses_fail() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0100, block(0x10)).unwrap();

        for addr in [0x0000, 0x00FF, 0x0110, 0xFFFF] {
            assert!(matches!(
                mmu.get_byte(addr),
                Err(Error::InvalidMemoryRange(_))
            ));
            assert!(matches!(
                mmu.set_byte(addr, 0),
                Err(Error::InvalidMemoryRange(_))
            ));
        }
    }

    #[test]
    fn resolution_picks_nearest_bank_below() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0000, block(0x10)).unwrap();
        mmu.mount_memory(0x8000, block(0x10)).unwrap();

        // 0x8005 is owned by the high bank even though the low bank also
        // starts below it.
        mmu.set_byte(0x8005, 0x42).unwrap();
        assert_eq!(mmu.get_byte(0x8005).unwrap(), 0x42);
        assert_eq!(mmu.get_byte(0x0005).unwrap(), 0x00);
    }

    #[test]
    fn overlapping_mounts_fail_in_either_order() {
        // Front overlap.
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0000, block(0x100)).unwrap();
        assert!(matches!(
            mmu.mount_memory(0x0050, block(0x10)),
            Err(Error::InvalidMemoryRange(_))
        ));

        // Back overlap: new range swallows an existing bank's start.
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0050, block(0x10)).unwrap();
        assert!(matches!(
            mmu.mount_memory(0x0000, block(0x100)),
            Err(Error::InvalidMemoryRange(_))
        ));
    }

    #[test]
    fn disjoint_mounts_succeed_in_either_order() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x1000, block(0x100)).unwrap();
        mmu.mount_memory(0x0000, block(0x100)).unwrap();

        // Back-to-back ranges do not collide.
        mmu.mount_memory(0x0100, block(0x100)).unwrap();
        assert_eq!(mmu.get_memory_size(), 0x300);
    }

    #[test]
    fn unmount_frees_the_range_for_remounting() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0000, block(0x100)).unwrap();
        assert!(matches!(
            mmu.mount_memory(0x0050, block(0x10)),
            Err(Error::InvalidMemoryRange(_))
        ));

        mmu.unmount_range(0x0000).unwrap();
        mmu.mount_memory(0x0050, block(0x10)).unwrap();
    }

    #[test]
    fn full_address_space_block_mounts() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0000, block(0x1_0000)).unwrap();
        mmu.set_byte(0xFFFF, 0x42).unwrap();
        assert_eq!(mmu.get_byte(0xFFFF).unwrap(), 0x42);
        assert_eq!(mmu.get_memory_size(), 0x1_0000);
    }

    #[test]
    fn block_past_the_top_of_the_address_space_fails() {
        let mmu = MemoryController::new();
        // One byte too many, both by size alone and by start offset.
        assert!(matches!(
            mmu.mount_memory(0x0000, block(0x1_0001)),
            Err(Error::InvalidMemoryRange(_))
        ));
        assert!(matches!(
            mmu.mount_memory(0xFF00, block(0x101)),
            Err(Error::InvalidMemoryRange(_))
        ));
        // The same block fits once the start leaves room for it.
        mmu.mount_memory(0xFF00, block(0x100)).unwrap();
    }

    #[test]
    fn unmount_of_unknown_range_fails() {
        let mmu = MemoryController::new();
        assert!(matches!(
            mmu.unmount_range(0x0000),
            Err(Error::InvalidMemoryRange(_))
        ));
    }

    #[test]
    fn free_clears_all_banks() {
        let mmu = MemoryController::new();
        mmu.mount_memory(0x0000, block(0x10)).unwrap();
        mmu.mount_memory(0x0100, block(0x10)).unwrap();
        mmu.free();
        assert_eq!(mmu.get_memory_size(), 0);
        assert!(mmu.get_byte(0x0000).is_err());
    }

    #[test]
    fn read_only_bank_propagates_protected_write() {
        let mmu = MemoryController::new();
        let rom = Arc::new(AddressableMemory::new(vec![0xC3, 0x50, 0x01], true));
        mmu.mount_memory(0x0000, rom).unwrap();
        assert_eq!(mmu.get_byte(0x0000).unwrap(), 0xC3);
        assert!(matches!(
            mmu.set_byte(0x0000, 0x00),
            Err(Error::ProtectedMemory(_))
        ));
    }
}
