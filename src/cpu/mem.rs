// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! The Mem represents the CPU's memory
//!
//! Contains some handy utils for reading and writing

use super::Adr;
use crate::{
    error::{Error, Result},
    traits::{AutoCast, Grab},
};
use std::{
    fmt::{Debug, Formatter},
    slice::SliceIndex,
};

/// Size of the Chip-8's address space
pub const MEMORY_SIZE: usize = 0x1000;
/// Address mask for the low 12 bits, which are all the Chip-8 can address
pub const ADDRESS_MASK: usize = MEMORY_SIZE - 1;
/// Where the 4x5 hex digit font lives
pub const FONT_ADDR: Adr = 0x000;
/// Where the Super-Chip 8x10 decimal digit font lives
pub const BIG_FONT_ADDR: Adr = 0x050;

/// 4x5 sprites for the hex digits `0..=F`, 5 bytes apiece
#[rustfmt::skip]
pub const FONT: [u8; 16 * 5] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// 8x10 Super-Chip sprites for the decimal digits `0..=9`, 10 bytes apiece
#[rustfmt::skip]
pub const BIG_FONT: [u8; 10 * 10] = [
    0xFF, 0xFF, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xFF, 0xFF, // 0
    0x18, 0x78, 0x78, 0x18, 0x18, 0x18, 0x18, 0x18, 0xFF, 0xFF, // 1
    0xFF, 0xFF, 0x03, 0x03, 0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, // 2
    0xFF, 0xFF, 0x03, 0x03, 0xFF, 0xFF, 0x03, 0x03, 0xFF, 0xFF, // 3
    0xC3, 0xC3, 0xC3, 0xC3, 0xFF, 0xFF, 0x03, 0x03, 0x03, 0x03, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0x03, 0x03, 0xFF, 0xFF, // 5
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC3, 0xC3, 0xFF, 0xFF, // 6
    0xFF, 0xFF, 0x03, 0x03, 0x06, 0x0C, 0x18, 0x18, 0x18, 0x18, // 7
    0xFF, 0xFF, 0xC3, 0xC3, 0xFF, 0xFF, 0xC3, 0xC3, 0xFF, 0xFF, // 8
    0xFF, 0xFF, 0xC3, 0xC3, 0xFF, 0xFF, 0x03, 0x03, 0xFF, 0xFF, // 9
];

/// The Chip-8's 4KiB of RAM
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Mem {
    memory: [u8; MEMORY_SIZE],
}

impl Grab for Mem {
    /// Gets a slice of [Mem] memory
    /// # Examples
    /// ```rust
    ///# use chipd::*;
    ///# use chipd::traits::Grab;
    ///     let mem = Mem::default();
    ///     assert!([0;10].as_slice() == mem.grab(0x200..0x20a).unwrap());
    /// ```
    #[inline(always)]
    fn grab<I>(&self, index: I) -> Option<&<I as SliceIndex<[u8]>>::Output>
    where
        I: SliceIndex<[u8]>,
    {
        self.memory.get(index)
    }

    /// Gets a mutable slice of [Mem] memory
    #[inline(always)]
    fn grab_mut<I>(&mut self, index: I) -> Option<&mut <I as SliceIndex<[u8]>>::Output>
    where
        I: SliceIndex<[u8]>,
    {
        self.memory.get_mut(index)
    }
}

impl Default for Mem {
    fn default() -> Self {
        Mem {
            memory: [0; MEMORY_SIZE],
        }
    }
}

impl Debug for Mem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mem")
            .field("len", &self.memory.len())
            .finish_non_exhaustive()
    }
}

impl Mem {
    /// Zeroes all of memory, then loads both fonts
    pub fn clear(&mut self) {
        self.memory = [0; MEMORY_SIZE];
        let font = FONT_ADDR as usize;
        let big_font = BIG_FONT_ADDR as usize;
        self.memory[font..font + FONT.len()].copy_from_slice(&FONT);
        self.memory[big_font..big_font + BIG_FONT.len()].copy_from_slice(&BIG_FONT);
    }

    /// Copies `data` into memory at `addr`.
    ///
    /// Fails without touching memory if `data` doesn't fit.
    /// # Examples
    /// ```rust
    ///# use chipd::*;
    ///# use chipd::traits::Grab;
    ///     let mut mem = Mem::default();
    ///     assert!(mem.load(0x200, &[0x12, 0x00]).is_ok());
    ///     assert!(mem.load(0xfff, &[0x12, 0x00]).is_err());
    /// ```
    pub fn load(&mut self, addr: Adr, data: &[u8]) -> Result<()> {
        let start = addr as usize;
        self.memory
            .get_mut(start..start + data.len())
            .ok_or(Error::RomTooLarge {
                len: data.len(),
                addr,
            })?
            .copy_from_slice(data);
        Ok(())
    }

    /// Reads a byte, wrapping the address to 12 bits
    #[inline(always)]
    pub fn peek(&self, addr: usize) -> u8 {
        self.read(addr & ADDRESS_MASK)
    }

    /// Writes a byte, wrapping the address to 12 bits
    #[inline(always)]
    pub fn poke(&mut self, addr: usize, data: u8) {
        self.write(addr & ADDRESS_MASK, data)
    }

    /// Gets all of memory as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.memory
    }
}
