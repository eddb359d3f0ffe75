use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type ColorValue = u8; // 8-bit channel value (0-255)
pub type ColorIdx = u8; // Index into a 16-color palette (0-15)

/// Number of entries in a palette. Index 0 is the transparency sentinel.
pub const PALETTE_SIZE: usize = 16;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: ColorValue,
    pub green: ColorValue,
    pub blue: ColorValue,
}

impl Rgb {
    pub const fn new(red: ColorValue, green: ColorValue, blue: ColorValue) -> Self {
        Rgb { red, green, blue }
    }

    /// Builds a color from wider integers, clamping each channel to 0-255.
    pub fn clamped(red: i32, green: i32, blue: i32) -> Self {
        Rgb {
            red: red.clamp(0, 255) as ColorValue,
            green: green.clamp(0, 255) as ColorValue,
            blue: blue.clamp(0, 255) as ColorValue,
        }
    }

    pub fn to_array(self) -> [ColorValue; 3] {
        [self.red, self.green, self.blue]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

// Accepts "RRGGBB" with or without a leading '#'.
impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(Error::Argument(format!("invalid color '{s}'")));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| Error::Argument(format!("invalid color '{s}'")))
        };
        Ok(Rgb {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}
