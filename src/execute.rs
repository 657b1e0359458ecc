use log::{debug, warn};
use rand::Rng;

use crate::{
    AluOp, Chip8, Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, FONT_START_ADDRESS, GLYPH_HEIGHT,
    Instruction, Operation, u4,
};

impl Chip8 {
    /// Runs the handler for one decoded instruction.
    ///
    /// The program counter still points at `inst` and is advanced by two
    /// afterwards, so control transfers go through [`Chip8::jump_to`].
    pub(crate) fn execute(&mut self, inst: Instruction) -> Result<Chip8Result, Chip8Error> {
        let (x, y) = (inst.x, inst.y);

        match inst.operation() {
            Operation::ClearDisplay => {
                self.display.clear();
            }
            Operation::Return => {
                let address = self.stack.pop()?;
                self.jump_to(address);
            }
            Operation::MachineCall => {
                warn!(
                    "ignoring machine code routine {:#05X} at {:#05X}",
                    inst.nnn(),
                    self.pc
                );
            }
            Operation::Jump => {
                let target = inst.nnn();
                if self.pc == target {
                    debug!("program halted with a jump to itself at {target:#05X}");
                    self.halted = true;
                    self.jump_to(target);
                    return Ok(Chip8Result::Halted);
                }
                self.jump_to(target);
            }
            Operation::JumpWithOffset => {
                self.jump_to(inst.nnn().wrapping_add(self.v[0].into()));
            }
            Operation::Call => {
                self.stack.push(self.pc.wrapping_add(2))?;
                self.jump_to(inst.nnn());
            }
            Operation::SkipRegEqualImm => {
                if self.v[x] == inst.nn() {
                    self.skip();
                }
            }
            Operation::SkipRegNotEqualImm => {
                if self.v[x] != inst.nn() {
                    self.skip();
                }
            }
            Operation::SkipRegEqualReg => {
                if self.v[x] == self.v[y] {
                    self.skip();
                }
            }
            Operation::SkipRegNotEqualReg => {
                if self.v[x] != self.v[y] {
                    self.skip();
                }
            }
            Operation::SetRegImm => {
                self.v[x] = inst.nn();
            }
            Operation::AddRegImm => {
                self.v[x] = self.v[x].wrapping_add(inst.nn());
            }
            Operation::Alu(op) => {
                self.execute_alu(x, y, op);
            }
            Operation::Random => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & inst.nn();
            }
            Operation::SetIndexImm => {
                self.i = inst.nnn();
            }
            Operation::AddIndexReg => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Operation::Draw => {
                self.execute_draw(x, y, inst.n())?;
            }
            Operation::SkipIfPressed => {
                if self.keypad[u4::truncate(self.v[x])] {
                    self.skip();
                }
            }
            Operation::SkipIfNotPressed => {
                if !self.keypad[u4::truncate(self.v[x])] {
                    self.skip();
                }
            }
            Operation::WaitForKey => {
                return Ok(self.execute_wait_for_key(x));
            }
            Operation::ReadDelayTimer => {
                self.v[x] = self.delay_timer;
            }
            Operation::SetDelayTimer => {
                self.delay_timer = self.v[x];
            }
            Operation::SetSoundTimer => {
                self.sound_timer = self.v[x];
            }
            Operation::FontChar => {
                let digit = usize::from(self.v[x] & 0x0F);
                self.i = (FONT_START_ADDRESS + digit * GLYPH_HEIGHT) as u16;
            }
            Operation::BCD => {
                let value = self.v[x];
                let range = Self::checked_range(self.i.into(), 3)?;
                self.memory[range].copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
            }
            Operation::StoreRegs => {
                let count = usize::from(x) + 1;
                let range = Self::checked_range(self.i.into(), count)?;
                self.memory[range].copy_from_slice(&self.v[..count]);
            }
            Operation::LoadRegs => {
                let count = usize::from(x) + 1;
                let range = Self::checked_range(self.i.into(), count)?;
                self.v[..count].copy_from_slice(&self.memory[range]);
            }
        };

        Ok(Chip8Result::Continue)
    }

    /// Makes the post-execute increment land on `target`.
    fn jump_to(&mut self, target: u16) {
        self.pc = target.wrapping_sub(2);
    }

    /// Skips the following instruction.
    fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Flags are computed from the operands before the result is written and
    /// stored last, so VF as a destination ends up holding the flag.
    fn execute_alu(&mut self, x: u4, y: u4, op: AluOp) {
        let (vx, vy) = (self.v[x], self.v[y]);

        let flag = match op {
            AluOp::Set => {
                self.v[x] = vy;
                return;
            }
            AluOp::Or => {
                self.v[x] = vx | vy;
                return;
            }
            AluOp::And => {
                self.v[x] = vx & vy;
                return;
            }
            AluOp::Xor => {
                self.v[x] = vx ^ vy;
                return;
            }
            AluOp::Add => {
                let (res, overflow) = vx.overflowing_add(vy);
                self.v[x] = res;
                overflow
            }
            AluOp::Sub => {
                self.v[x] = vx.wrapping_sub(vy);
                vx > vy
            }
            AluOp::SubReverse => {
                self.v[x] = vy.wrapping_sub(vx);
                vy > vx
            }
            AluOp::ShiftRight => {
                self.v[x] = vx >> 1;
                vx & 0x01 != 0
            }
            AluOp::ShiftLeft => {
                self.v[x] = vx << 1;
                vx & 0x80 != 0
            }
        };

        self.v[0xF] = u8::from(flag);
    }

    /// XORs an 8-pixel-wide sprite of `height` rows from memory at I onto the
    /// display. Rows wrap vertically; an origin too close to the right edge
    /// for the whole sprite moves it to column 0.
    fn execute_draw(&mut self, x: u4, y: u4, height: u8) -> Result<(), Chip8Error> {
        let rows = Self::checked_range(self.i.into(), height.into())?;

        let mut x_pos = usize::from(self.v[x]);
        if x_pos + 8 > DISPLAY_X {
            x_pos = 0;
        }
        let y_pos = usize::from(self.v[y]);

        let mut any_erased = false;
        for (row, &sprite_byte) in self.memory[rows].iter().enumerate() {
            let dest_y = (y_pos + row) % DISPLAY_Y;

            for col in 0..8 {
                // If current sprite bit is non-zero
                if sprite_byte & (0x80 >> col) != 0 {
                    any_erased |= self.display.toggle(x_pos + col, dest_y);
                }
            }
        }

        self.v[0xF] = u8::from(any_erased);
        self.display.mark_dirty();
        Ok(())
    }

    fn execute_wait_for_key(&mut self, x: u4) -> Chip8Result {
        match self.wait_release_key {
            Some(key) if !self.keypad[key] => {
                // The key we were waiting for has been released
                self.v[x] = key.get();
                self.wait_release_key = None;
                return Chip8Result::Continue;
            }
            Some(_) => {}
            None => {
                // Not waiting for a key release yet, check all keys
                self.wait_release_key = (0..16).map(u4::new).find(|&key| self.keypad[key]);
            }
        }

        // Repeat this instruction until a key is released
        self.pc = self.pc.wrapping_sub(2);
        Chip8Result::WaitForKey
    }
}
