//! Instruction-level LR35902 (Game Boy Color CPU) emulation core.
//!
//! The crate models one executing processor: a banked virtual address
//! space, a static opcode table, an instruction decoder/executor pair, and
//! the register file they mutate. Hosts drive it through the [`gameboy`]
//! facade one fetch-decode-execute step at a time; every fallible
//! operation returns a typed [`error::Error`] instead of panicking the
//! emulation loop.

/// Cartridge image parsing: header fields, logo and checksum validation.
pub mod cartridge;

/// Fetch-decode-execute stepping.
pub mod cpu;

/// Instruction decoding, including the 0xCB prefixed opcode space.
pub mod decoder;

/// Failure taxonomy shared by the whole crate.
pub mod error;

/// Execution routines for the control-flow instruction families.
pub mod executor;

/// High-level facade that wires the CPU and memory into a single machine.
pub mod gameboy;

/// Instruction descriptors and their operand/flag/condition vocabulary.
pub mod instruction;

/// Byte-addressable storage blocks and the traits that mount them.
pub mod memory;

/// Banked memory controller virtualizing the address space.
pub mod mmu;

/// Static opcode table.
pub mod opcodes;

/// 16-bit register pairs with bit-level access.
pub mod register;

/// The CPU register file: pairs, flags, and name lookup.
pub mod register_file;
