use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use gbc_core::cartridge::{Cartridge, ENTRY_POINT};
use gbc_core::gameboy::Gbc;
use gbc_core::memory::AddressableMemory;

const WRAM_BASE: u16 = 0xC000;
const WRAM_SIZE: usize = 0x2000;
const HRAM_BASE: u16 = 0xFF80;
const HRAM_SIZE: usize = 0x7F;

#[derive(Parser)]
struct Args {
    /// Path to ROM file
    rom: std::path::PathBuf,

    /// Number of instructions to execute before stopping
    #[arg(long, default_value_t = 1000)]
    steps: u64,

    /// Start executing at the cartridge entry point instead of 0x0000
    #[arg(long)]
    entry: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let cart = match Cartridge::load(&args.rom) {
        Ok(cart) => cart,
        Err(err) => {
            error!("failed to load {}: {err}", args.rom.display());
            return ExitCode::FAILURE;
        }
    };
    info!(
        "loaded {} ({} bytes)\n{}",
        args.rom.display(),
        cart.rom_size(),
        cart.header
    );
    if !cart.logo_valid {
        warn!("boot logo does not match; a real unit would refuse this image");
    }
    if !cart.header_valid {
        warn!("header checksum mismatch");
    }

    let mut gbc = Gbc::new();
    let mounts = [
        gbc.mount_memory(0x0000, cart.rom()),
        gbc.mount_memory(WRAM_BASE, Arc::new(AddressableMemory::zeroed(WRAM_SIZE))),
        gbc.mount_memory(HRAM_BASE, Arc::new(AddressableMemory::zeroed(HRAM_SIZE))),
    ];
    if let Some(err) = mounts.into_iter().find_map(Result::err) {
        error!("failed to build the address space: {err}");
        return ExitCode::FAILURE;
    }
    if args.entry {
        gbc.register_file().pc.set_word(ENTRY_POINT);
    }

    let mut total_cycles = 0u64;
    for executed in 0..args.steps {
        match gbc.step() {
            Ok(cycles) => total_cycles += u64::from(cycles),
            Err(err) => {
                error!(
                    "halted after {executed} instructions at pc={:#06x}: {err}",
                    gbc.register_file().pc.get_word()
                );
                return ExitCode::FAILURE;
            }
        }
    }
    info!(
        "executed {} instructions in {total_cycles} cycles, pc={:#06x}",
        args.steps,
        gbc.register_file().pc.get_word()
    );
    ExitCode::SUCCESS
}
