/// Outcome of a single fetch-decode-execute step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip8Result {
    /// The instruction executed; keep going.
    Continue,
    /// Fx0A is blocked until a key is pressed and released. The program
    /// counter still points at the waiting instruction.
    WaitForKey,
    /// The program jumped onto itself, or had already halted before this step.
    Halted,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    /// ROM is too large to fit in available memory
    #[error("ROM of {size} bytes does not fit in {max_size} bytes of program memory")]
    RomLoadError { size: usize, max_size: usize },
    /// Attempted to access memory outside valid range
    #[error("memory access at {address:#06X} is out of bounds")]
    MemoryOutOfBounds { address: usize },
    /// A CALL was made with every stack slot already in use
    #[error("call stack overflow ({depth} return addresses)")]
    StackOverflow { depth: usize },
    /// Attempted to return from a subroutine with empty call stack
    #[error("return with an empty call stack")]
    StackUnderflow,
    /// The fetched word matches no instruction pattern
    #[error("unknown opcode {opcode:#06X} at {address:#06X}")]
    UnknownOpcode { opcode: u16, address: u16 },
}
