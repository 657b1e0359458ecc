use std::ops::Range;

use log::trace;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Chip8Error, Chip8Result, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, FrameBuffer, Instruction,
    Stack, u4,
};

pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: FrameBuffer,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: Stack,

    /// Delay timer: decremented by the host at 60Hz
    pub(crate) delay_timer: u8,
    /// Sound timer: decremented by the host at 60Hz, beeps while non-zero
    pub(crate) sound_timer: u8,

    /// Set once the program jumps onto itself
    pub(crate) halted: bool,

    /// Tracks which key is waiting to be released for the FX0A instruction
    pub(crate) wait_release_key: Option<u4>,
    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],

    /// Source for the RND instruction
    pub(crate) rng: StdRng,
}

impl Chip8 {
    /// A blank machine with the font loaded, seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// A blank machine whose RND instruction produces a reproducible sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        Chip8 {
            memory,
            display: FrameBuffer::new(),
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: Stack::new(),
            delay_timer: 0,
            sound_timer: 0,
            halted: false,
            wait_release_key: None,
            keypad: [false; 16],
            rng,
        }
    }

    /// Resets the machine and copies a ROM into program memory.
    ///
    /// Everything except the RND source returns to its power-on state, so a
    /// halted machine can be reused for another program. An oversized ROM
    /// leaves the machine untouched.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            });
        }

        self.reset();
        self.memory[ROM_START_ADDRESS..ROM_START_ADDRESS + rom.len()].copy_from_slice(rom);

        Ok(())
    }

    fn reset(&mut self) {
        self.memory = [0; MEMORY_SIZE];
        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
        self.display = FrameBuffer::new();
        self.pc = ROM_START_ADDRESS as u16;
        self.i = 0;
        self.v = [0; 16];
        self.stack = Stack::new();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.halted = false;
        self.wait_release_key = None;
        self.keypad = [false; 16];
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    ///
    /// Once the machine has halted this is a no-op that keeps returning
    /// [`Chip8Result::Halted`].
    pub fn step(&mut self) -> Result<Chip8Result, Chip8Error> {
        if self.halted {
            return Ok(Chip8Result::Halted);
        }

        let address = self.pc;
        let opcode = self.fetch()?;
        let instruction =
            Instruction::decode(opcode).ok_or(Chip8Error::UnknownOpcode { opcode, address })?;
        trace!("{address:04X}: {opcode:04X}  {instruction}");

        let result = self.execute(instruction)?;
        self.pc = self.pc.wrapping_add(2);

        Ok(result)
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    pub fn timers_cycle(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    pub fn display(&self) -> &FrameBuffer {
        &self.display
    }

    /// Returns whether the display changed since the last call, and resets the flag.
    pub fn take_display_dirty(&mut self) -> bool {
        self.display.take_dirty()
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Fetches the next 16-bit opcode from memory.
    fn fetch(&self) -> Result<u16, Chip8Error> {
        let range = Self::checked_range(self.pc.into(), 2)?;
        let word = &self.memory[range];

        Ok(u16::from_be_bytes([word[0], word[1]]))
    }

    /// Bounds-checks `len` bytes of memory starting at `start`.
    pub(crate) fn checked_range(start: usize, len: usize) -> Result<Range<usize>, Chip8Error> {
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE),
            });
        }

        Ok(start..end)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
