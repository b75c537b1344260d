//! The live-state address space shared by the host game and the injected
//! routines.

pub mod live;
pub mod map;

pub use live::LiveState;
pub use map::{HookSite, MemoryMap, PieceMap, Profile, DR_MARIO_US};

/// Read/write interface over the console's CPU address space.
///
/// Implemented by the flat [`Ram`] used by the reference engine and by
/// the 6502 bus in [`crate::sim`].
pub trait Memory {
    /// Read the byte at `address`.
    fn peek(&self, address: u16) -> u8;

    /// Write `value` to `address`.
    fn poke(&mut self, address: u16, value: u8);

    /// Copy `out.len()` consecutive bytes starting at `start`.
    fn peek_into(&self, start: u16, out: &mut [u8]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.peek(start.wrapping_add(i as u16));
        }
    }
}

/// 2 KiB of console work RAM, mirrored across the whole address space.
pub struct Ram {
    ram: [u8; 0x800],
}

impl Ram {
    pub fn new() -> Self {
        Self { ram: [0; 0x800] }
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for Ram {
    fn peek(&self, address: u16) -> u8 {
        self.ram[(address & 0x7FF) as usize]
    }

    fn poke(&mut self, address: u16, value: u8) {
        self.ram[(address & 0x7FF) as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_mirrors_every_2k() {
        let mut ram = Ram::new();
        ram.poke(0x0805, 0x42);
        assert_eq!(ram.peek(0x0005), 0x42);
        assert_eq!(ram.peek(0x1805), 0x42);
    }

    #[test]
    fn peek_into_reads_consecutive_bytes() {
        let mut ram = Ram::new();
        for i in 0..4u16 {
            ram.poke(0x0500 + i, i as u8 + 1);
        }
        let mut out = [0u8; 4];
        ram.peek_into(0x0500, &mut out);
        assert_eq!(out, [1, 2, 3, 4]);
    }
}
