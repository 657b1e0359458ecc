//! A CHIP-8 virtual machine core.
//!
//! [`Chip8`] owns the whole machine state and executes one instruction per
//! [`Chip8::step`]. Instructions are decoded against the ordered pattern table
//! in [`INSTRUCTION_TABLE`]. [`Chip8Runner`] runs a program to completion
//! under an explicit instruction budget. Timer decay, key input and rendering
//! of the [`FrameBuffer`] are left to the host.

mod chip8;
mod disasm;
mod execute;
mod font;
mod framebuffer;
mod nibble;
mod opcode;
mod runner;
mod stack;
mod types;

pub use chip8::*;
pub use disasm::*;
pub use font::*;
pub use framebuffer::*;
pub use nibble::u4;
pub use opcode::*;
pub use runner::*;
pub use stack::*;
pub use types::*;
