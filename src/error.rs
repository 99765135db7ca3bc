use thiserror::Error;

/// Failure taxonomy for every fallible operation in the core.
///
/// Expected failure modes (bad address, bad opcode, protected write, ...)
/// travel through this type; they are returned unmodified up the call
/// chain rather than wrapped layer by layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Write attempted on a block marked read-only.
    #[error("protected memory write: {0}")]
    ProtectedMemory(String),

    /// Out-of-range byte, bit, or executor-table access.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// A byte buffer that does not form a valid cartridge image.
    #[error("invalid binary: {0}")]
    InvalidBinary(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No opcode table entry for the fetched opcode.
    #[error("invalid opcode {0:#06x}")]
    InvalidOpcode(u16),

    /// Unknown assembly register identifier.
    #[error("invalid register id: {0}")]
    InvalidRegisterId(String),

    /// Overlapping mount, unmount of an unknown range, or an address
    /// outside every mounted bank.
    #[error("invalid memory range: {0}")]
    InvalidMemoryRange(String),

    /// An instruction's declared shape does not match what its executor
    /// needs. Indicates a defect in the opcode table, not bad input.
    #[error("{0}")]
    Contract(String),
}

pub type Result<T> = std::result::Result<T, Error>;
