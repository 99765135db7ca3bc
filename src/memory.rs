use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};

/// Read access to a byte-addressable source, used by the instruction
/// decoder. Implemented by [`AddressableMemory`], by registers, and by the
/// banked [`crate::mmu::MemoryController`].
pub trait MemorySource {
    fn get_byte(&self, addr: u16) -> Result<u8>;
    fn get_word(&self, addr: u16) -> Result<u16>;
}

/// Full contract for a storage block that can be mounted into the memory
/// controller. All access goes through `&self`; implementations guard
/// their bytes with a reader/writer lock so multiple readers may proceed
/// concurrently while a writer excludes all others.
pub trait MemoryBlock: MemorySource + Send + Sync {
    fn set_byte(&self, addr: u16, value: u8) -> Result<()>;
    fn set_word(&self, addr: u16, value: u16) -> Result<()>;
    fn size(&self) -> usize;
}

/// A byte-addressable, optionally read-only storage block.
///
/// Words are stored high byte first and combined in software, so the value
/// read back is independent of host endianness.
#[derive(Debug, Default)]
pub struct AddressableMemory {
    bytes: RwLock<Vec<u8>>,
    read_only: bool,
}

impl AddressableMemory {
    pub fn new(bytes: Vec<u8>, read_only: bool) -> Self {
        Self {
            bytes: RwLock::new(bytes),
            read_only,
        }
    }

    /// Zero-filled read/write block of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len], false)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Copy of the whole contents.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the whole contents. Observes the read-only flag.
    pub fn set_contents(&self, contents: Vec<u8>) -> Result<()> {
        if self.read_only {
            return Err(Error::ProtectedMemory(
                "cannot replace contents of a read-only block".into(),
            ));
        }
        *self.bytes.write().unwrap_or_else(PoisonError::into_inner) = contents;
        Ok(())
    }

    /// Drops the backing storage.
    pub fn free(&self) {
        self.bytes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn out_of_range(addr: u16, len: usize) -> Error {
        Error::InvalidIndex(format!(
            "address {addr:#06x} is outside the block (size {len:#06x})"
        ))
    }
}

impl MemorySource for AddressableMemory {
    fn get_byte(&self, addr: u16) -> Result<u8> {
        let bytes = self.bytes.read().unwrap_or_else(PoisonError::into_inner);
        bytes
            .get(usize::from(addr))
            .copied()
            .ok_or_else(|| Self::out_of_range(addr, bytes.len()))
    }

    fn get_word(&self, addr: u16) -> Result<u16> {
        let bytes = self.bytes.read().unwrap_or_else(PoisonError::into_inner);
        let lo_addr = usize::from(addr) + 1;
        if lo_addr >= bytes.len() {
            return Err(Self::out_of_range(addr, bytes.len()));
        }
        Ok(u16::from_be_bytes([bytes[usize::from(addr)], bytes[lo_addr]]))
    }
}

impl MemoryBlock for AddressableMemory {
    fn set_byte(&self, addr: u16, value: u8) -> Result<()> {
        if self.read_only {
            return Err(Error::ProtectedMemory(format!(
                "write of {value:#04x} to read-only block at {addr:#06x}"
            )));
        }
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        let len = bytes.len();
        match bytes.get_mut(usize::from(addr)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Self::out_of_range(addr, len)),
        }
    }

    fn set_word(&self, addr: u16, value: u16) -> Result<()> {
        if self.read_only {
            return Err(Error::ProtectedMemory(format!(
                "write of {value:#06x} to read-only block at {addr:#06x}"
            )));
        }
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        let lo_addr = usize::from(addr) + 1;
        if lo_addr >= bytes.len() {
            return Err(Self::out_of_range(addr, bytes.len()));
        }
        let [hi, lo] = value.to_be_bytes();
        bytes[usize::from(addr)] = hi;
        bytes[lo_addr] = lo;
        Ok(())
    }

    fn size(&self) -> usize {
        self.bytes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
