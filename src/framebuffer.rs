pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

/// Bytes in one display row.
pub const ROW_BYTES: usize = DISPLAY_X / 8;
pub const FRAMEBUFFER_BYTES: usize = ROW_BYTES * DISPLAY_Y;

/// Packed 1-bit-per-pixel display memory.
///
/// Rows are stored top to bottom, eight pixels per byte with the leftmost
/// pixel in the most significant bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    bytes: [u8; FRAMEBUFFER_BYTES],
    dirty: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; FRAMEBUFFER_BYTES],
            dirty: true,
        }
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
        self.dirty = true;
    }

    /// Flips the pixel at (`x`, `y`). Returns true if the pixel was lit and
    /// has now been erased.
    ///
    /// Panics if the coordinates are off screen.
    pub(crate) fn toggle(&mut self, x: usize, y: usize) -> bool {
        let (index, mask) =
            Self::locate(x, y).unwrap_or_else(|| panic!("pixel ({x}, {y}) is off screen"));
        let byte = &mut self.bytes[index];
        let erased = *byte & mask != 0;
        *byte ^= mask;
        erased
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    /// Off-screen coordinates read as off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        Self::locate(x, y).is_some_and(|(index, mask)| self.bytes[index] & mask != 0)
    }

    pub fn as_bytes(&self) -> &[u8; FRAMEBUFFER_BYTES] {
        &self.bytes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns the dirty flag and resets it, for a renderer acknowledging
    /// a frame.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Byte index and bit mask of an on-screen pixel.
    fn locate(x: usize, y: usize) -> Option<(usize, u8)> {
        (x < DISPLAY_X && y < DISPLAY_Y).then(|| (y * ROW_BYTES + x / 8, 0x80 >> (x % 8)))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
