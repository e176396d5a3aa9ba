// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Stores and displays the Chip-8's screen memory

use std::fmt::{Display, Formatter, Result};

/// Width of the framebuffer, in pixels. Always the Super-Chip size.
pub const WIDTH: usize = 128;
/// Height of the framebuffer, in pixels. Always the Super-Chip size.
pub const HEIGHT: usize = 64;

/// A monochrome framebuffer, where `true` is a lit pixel
pub type Framebuffer = [bool; WIDTH * HEIGHT];

/// Selects how sprite coordinates are interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScreenMode {
    /// 64x32 Chip-8 mode
    #[default]
    Standard,
    /// 128x64 Super-Chip mode
    Extended,
}

impl ScreenMode {
    /// Width of the mode, in pixels
    pub fn width(self) -> usize {
        match self {
            ScreenMode::Standard => 64,
            ScreenMode::Extended => WIDTH,
        }
    }
    /// Height of the mode, in pixels
    pub fn height(self) -> usize {
        match self {
            ScreenMode::Standard => 32,
            ScreenMode::Extended => HEIGHT,
        }
    }
}

impl Display for ScreenMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

/// The Chip-8's display.
///
/// The buffer is always sized for [ScreenMode::Extended]. Pixels are laid out
/// row-major with a stride of the *active* mode's width, so a standard-mode
/// screen only uses the first 64*32 entries and leaves the rest `false`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Screen {
    pixels: Framebuffer,
    mode: ScreenMode,
}

impl Default for Screen {
    fn default() -> Self {
        Screen {
            pixels: [false; WIDTH * HEIGHT],
            mode: ScreenMode::default(),
        }
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Screen")
            .field("mode", &self.mode)
            .field("lit", &self.pixels.iter().filter(|&&p| p).count())
            .finish_non_exhaustive()
    }
}

impl Screen {
    /// Gets the current [ScreenMode]
    pub fn mode(&self) -> ScreenMode {
        self.mode
    }
    /// Width of the active mode
    pub fn width(&self) -> usize {
        self.mode.width()
    }
    /// Height of the active mode
    pub fn height(&self) -> usize {
        self.mode.height()
    }
    /// Switches [ScreenMode], clearing the screen
    pub fn set_mode(&mut self, mode: ScreenMode) {
        self.mode = mode;
        self.clear();
    }
    /// Turns every pixel off
    pub fn clear(&mut self) {
        self.pixels = [false; WIDTH * HEIGHT];
    }
    /// Gets the raw framebuffer
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.pixels
    }
    /// Gets the pixel at (x, y). Anything outside the active mode is off.
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let screen = Screen::default();
    /// assert!(!screen.get(3, 4));
    /// assert!(!screen.get(200, 4));
    /// ```
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width() && y < self.height() && self.pixels[y * self.width() + x]
    }

    /// XORs a sprite onto the screen at (x, y), wrapping at the edges of the active mode.
    ///
    /// Each row of the sprite is `row_bytes` bytes wide, most significant bit leftmost.
    /// Returns whether any lit pixel was turned off.
    pub fn draw(&mut self, x: usize, y: usize, sprite: &[u8], row_bytes: usize) -> bool {
        let (w, h) = (self.width(), self.height());
        let mut collision = false;
        for (line, row) in sprite.chunks(row_bytes.max(1)).enumerate() {
            let py = (y + line) % h;
            for (col, &byte) in row.iter().enumerate() {
                for bit in 0..8 {
                    if byte & (0x80 >> bit) == 0 {
                        continue;
                    }
                    let px = (x + col * 8 + bit) % w;
                    let pixel = &mut self.pixels[py * w + px];
                    collision |= *pixel;
                    *pixel = !*pixel;
                }
            }
        }
        collision
    }

    /// Scrolls the active area down by `n` rows, blanking the top
    pub fn scroll_down(&mut self, n: usize) {
        let (w, h) = (self.width(), self.height());
        let n = n.min(h);
        self.pixels.copy_within(0..(h - n) * w, n * w);
        self.pixels[..n * w].fill(false);
    }

    /// Scrolls the active area right by `n` columns, blanking the left edge
    pub fn scroll_right(&mut self, n: usize) {
        let (w, h) = (self.width(), self.height());
        let n = n.min(w);
        for row in self.pixels[..w * h].chunks_exact_mut(w) {
            row.copy_within(0..w - n, n);
            row[..n].fill(false);
        }
    }

    /// Scrolls the active area left by `n` columns, blanking the right edge
    pub fn scroll_left(&mut self, n: usize) {
        let (w, h) = (self.width(), self.height());
        let n = n.min(w);
        for row in self.pixels[..w * h].chunks_exact_mut(w) {
            row.copy_within(n.., 0);
            row[w - n..].fill(false);
        }
    }
}

impl Display for Screen {
    /// Prints the active area, two pixel rows per line of text
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for y in (0..self.height()).step_by(2) {
            for x in 0..self.width() {
                let glyph = match (self.get(x, y), self.get(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
