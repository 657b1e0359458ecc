use crate::Chip8Error;

/// Number of return addresses the call stack can hold.
pub const STACK_DEPTH: usize = 76;

/// Fixed-capacity call stack of return addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack {
    slots: [u16; STACK_DEPTH],
    len: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_DEPTH],
            len: 0,
        }
    }

    pub fn push(&mut self, address: u16) -> Result<(), Chip8Error> {
        let slot = self
            .slots
            .get_mut(self.len)
            .ok_or(Chip8Error::StackOverflow { depth: STACK_DEPTH })?;
        *slot = address;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        self.len = self.len.checked_sub(1).ok_or(Chip8Error::StackUnderflow)?;
        Ok(self.slots[self.len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live return addresses, oldest first.
    pub fn as_slice(&self) -> &[u16] {
        &self.slots[..self.len]
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
