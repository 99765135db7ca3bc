use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::memory::{AddressableMemory, MemoryBlock};

/// Address the CPU starts executing cartridge code from.
pub const ENTRY_POINT: u16 = 0x0100;

const LOGO_START: usize = 0x104;
const LOGO_END: usize = 0x134;
const TITLE_START: usize = 0x134;
const TITLE_END: usize = 0x143;
const GB_TYPE_ADDR: usize = 0x143;
const NEW_LICENSEE_ADDR: usize = 0x144;
const SGB_ADDR: usize = 0x146;
const CART_TYPE_ADDR: usize = 0x147;
const ROM_SIZE_ADDR: usize = 0x148;
const RAM_SIZE_ADDR: usize = 0x149;
const DESTINATION_ADDR: usize = 0x14A;
const OLD_LICENSEE_ADDR: usize = 0x14B;
const MASK_ROM_VERSION_ADDR: usize = 0x14C;
const HEADER_CHECKSUM_ADDR: usize = 0x14D;
const GLOBAL_CHECKSUM_ADDR: usize = 0x14E;
const HEADER_END: usize = 0x150;

/// Boot ROM logo bitmap every licensed cartridge carries at 0x104-0x133.
const BOOT_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00,
    0x0D, 0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD,
    0xD9, 0x99, 0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB,
    0xB9, 0x33, 0x3E,
];

/// Header fields at 0x134-0x14F of a cartridge image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartridgeHeader {
    pub title: String,
    /// 0x143: 0x80/0xC0 marks Game Boy Color support.
    pub gameboy_type: u8,
    /// 0x144-0x145, two ASCII characters.
    pub new_licensee: [u8; 2],
    pub sgb_support: u8,
    pub cartridge_type: u8,
    /// ROM size code, not a byte count.
    pub rom_size: u8,
    /// RAM size code, not a byte count.
    pub ram_size: u8,
    pub destination: u8,
    pub old_licensee: u8,
    pub mask_rom_version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl CartridgeHeader {
    pub fn cgb(&self) -> bool {
        self.gameboy_type & 0x80 != 0
    }
}

impl fmt::Display for CartridgeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "title:            {}", self.title)?;
        writeln!(
            f,
            "hardware:         {}",
            if self.cgb() { "CGB" } else { "DMG" }
        )?;
        writeln!(f, "cartridge type:   {:#04x}", self.cartridge_type)?;
        writeln!(f, "rom size code:    {:#04x}", self.rom_size)?;
        writeln!(f, "ram size code:    {:#04x}", self.ram_size)?;
        writeln!(f, "header checksum:  {:#04x}", self.header_checksum)?;
        write!(f, "global checksum:  {:#06x}", self.global_checksum)
    }
}

/// A parsed cartridge image: extracted header plus the ROM bytes exposed
/// as a read-only block ready to mount into the memory controller.
pub struct Cartridge {
    pub header: CartridgeHeader,
    /// Bytes at 0x104-0x133 match the boot logo.
    pub logo_valid: bool,
    /// Additive checksum over 0x134-0x14C matches the byte at 0x14D.
    pub header_valid: bool,
    rom: Arc<AddressableMemory>,
}

impl Cartridge {
    /// Parses a raw byte buffer as a cartridge image. The buffer must at
    /// least cover the header; logo and checksum mismatches are reported
    /// in the flags, not as failures.
    pub fn parse_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < HEADER_END {
            return Err(Error::InvalidBinary(format!(
                "image is {} bytes, smaller than the {HEADER_END}-byte cartridge header",
                bytes.len()
            )));
        }
        let header = extract_header(&bytes);
        let logo_valid = bytes[LOGO_START..LOGO_END] == BOOT_LOGO;
        let header_valid = compute_header_checksum(&bytes) == header.header_checksum;
        Ok(Self {
            header,
            logo_valid,
            header_valid,
            rom: Arc::new(AddressableMemory::new(bytes, true)),
        })
    }

    /// Reads and parses a cartridge image from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse_bytes(fs::read(path)?)
    }

    /// The ROM as a mountable read-only block.
    pub fn rom(&self) -> Arc<dyn MemoryBlock> {
        self.rom.clone()
    }

    pub fn rom_size(&self) -> usize {
        self.rom.size()
    }
}

fn extract_header(bytes: &[u8]) -> CartridgeHeader {
    let title_bytes = &bytes[TITLE_START..TITLE_END];
    let title_len = title_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(title_bytes.len());
    let title = String::from_utf8_lossy(&title_bytes[..title_len])
        .trim()
        .to_string();

    CartridgeHeader {
        title,
        gameboy_type: bytes[GB_TYPE_ADDR],
        new_licensee: [bytes[NEW_LICENSEE_ADDR], bytes[NEW_LICENSEE_ADDR + 1]],
        sgb_support: bytes[SGB_ADDR],
        cartridge_type: bytes[CART_TYPE_ADDR],
        rom_size: bytes[ROM_SIZE_ADDR],
        ram_size: bytes[RAM_SIZE_ADDR],
        destination: bytes[DESTINATION_ADDR],
        old_licensee: bytes[OLD_LICENSEE_ADDR],
        mask_rom_version: bytes[MASK_ROM_VERSION_ADDR],
        header_checksum: bytes[HEADER_CHECKSUM_ADDR],
        global_checksum: u16::from_be_bytes([
            bytes[GLOBAL_CHECKSUM_ADDR],
            bytes[GLOBAL_CHECKSUM_ADDR + 1],
        ]),
    }
}

/// x = x - byte - 1 over 0x134-0x14C, compared against 0x14D.
fn compute_header_checksum(bytes: &[u8]) -> u8 {
    bytes[TITLE_START..HEADER_CHECKSUM_ADDR]
        .iter()
        .fold(0u8, |sum, &byte| sum.wrapping_sub(byte).wrapping_sub(1))
}
