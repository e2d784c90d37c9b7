// Console Palette - 16 RGB entries selectable by a 4-bit pixel value
//
// Every device owns its own palette. Index 0 is the conventional
// background/clear color.

use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};

/// Number of entries in a palette (one per 4-bit color index)
pub const PALETTE_SIZE: usize = 16;

/// A 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a packed 0xRRGGBB value
    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    /// RGBA bytes in the layout expected by the pixels crate
    #[inline]
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xFF]
    }
}

/// Palette installed on new devices
///
/// The first four entries are black, red, green and blue; the rest fill out
/// a general-purpose 16 color set.
pub const DEFAULT_PALETTE: [u32; PALETTE_SIZE] = [
    0x000000, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFFFF, 0x5F574F, 0xC2C3C7, 0xFFF1E8,
    0xFFA300, 0xFFEC27, 0x008751, 0x29ADFF, 0x1D2B53, 0x7E2553, 0xAB5236, 0xFF77A8,
];

/// Fixed 16-entry color table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
}

impl Palette {
    /// Create the default palette
    pub fn new() -> Self {
        let mut colors = [Rgb::default(); PALETTE_SIZE];
        for (color, &rgb) in colors.iter_mut().zip(DEFAULT_PALETTE.iter()) {
            *color = Rgb::from_u32(rgb);
        }
        Self { colors }
    }

    /// Create a palette from exactly 16 entries
    pub fn from_colors(colors: [Rgb; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    /// Build a palette from a list of `[r, g, b]` triples
    ///
    /// Returns `None` unless the list holds exactly 16 entries.
    pub fn from_triples(triples: &[[u8; 3]]) -> Option<Self> {
        if triples.len() != PALETTE_SIZE {
            return None;
        }
        let mut colors = [Rgb::default(); PALETTE_SIZE];
        for (color, &[r, g, b]) in colors.iter_mut().zip(triples.iter()) {
            *color = Rgb::new(r, g, b);
        }
        Some(Self { colors })
    }

    /// Replace the entry at `index`
    pub fn set_color(&mut self, index: usize, color: Rgb) -> Result<(), ConsoleError> {
        check_index("setColor", index)?;
        self.colors[index] = color;
        Ok(())
    }

    /// Get the entry at `index`
    pub fn get_color(&self, index: usize) -> Result<Rgb, ConsoleError> {
        check_index("getColor", index)?;
        Ok(self.colors[index])
    }

    /// Look up a 4-bit pixel value; the high bits are ignored
    #[inline]
    pub fn lookup(&self, nibble: u8) -> Rgb {
        self.colors[(nibble & 0x0F) as usize]
    }

    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

fn check_index(op: &'static str, index: usize) -> Result<(), ConsoleError> {
    if index >= PALETTE_SIZE {
        return Err(ConsoleError::out_of_range(
            op,
            "index",
            index as i64,
            0,
            PALETTE_SIZE as i64,
        ));
    }
    Ok(())
}
