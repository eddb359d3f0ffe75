// Packed 15-bit color codec and the HSL model used for shade generation.
use crate::common::{ColorValue, Rgb};

/// A packed 15-bit color: bits 0-4 red, 5-9 green, 10-14 blue. The MSB is unused.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color15(u16);

impl Color15 {
    pub const MASK: u16 = 0x7FFF;

    /// Wraps a raw word, dropping the unused MSB.
    pub fn from_raw(word: u16) -> Self {
        Color15(word & Self::MASK)
    }

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self::from_raw(u16::from_le_bytes(bytes))
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// 5-bit channel values (0-31).
    pub fn channels(self) -> (u8, u8, u8) {
        let r = self.0 & 31;
        let g = (self.0 >> 5) & 31;
        let b = (self.0 >> 10) & 31;
        (r as u8, g as u8, b as u8)
    }

    pub fn to_rgb(self) -> Rgb {
        decode(self.0)
    }

    pub fn from_rgb(color: Rgb) -> Self {
        Color15(encode(
            color.red as i32,
            color.green as i32,
            color.blue as i32,
        ))
    }
}

pub fn scale_color(c: u8) -> ColorValue {
    ((c as u16 & 31) * 255 / 31) as ColorValue
}

// Rounds to the nearest 5-bit step so that an already-quantized channel maps
// back onto the same step.
fn quantize_channel(c: i32) -> u16 {
    let c = c.clamp(0, 255) as u16;
    (c * 31 + 127) / 255
}

/// Expands a packed word to 8-bit RGB. The MSB is ignored.
pub fn decode(word: u16) -> Rgb {
    let (r, g, b) = Color15::from_raw(word).channels();
    Rgb::new(scale_color(r), scale_color(g), scale_color(b))
}

/// Packs 8-bit RGB into a 15-bit word. Out-of-range inputs are clamped first.
pub fn encode(r: i32, g: i32, b: i32) -> u16 {
    quantize_channel(r) | quantize_channel(g) << 5 | quantize_channel(b) << 10
}

/// Hue in degrees [0, 360), saturation and lightness in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Hsl { h, s, l }
    }

    pub fn from_rgb(color: Rgb) -> Self {
        let r = color.red as f64 / 255.0;
        let g = color.green as f64 / 255.0;
        let b = color.blue as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let l = (max + min) / 2.0;
        if delta <= 0.0 {
            return Hsl::new(0.0, 0.0, l);
        }

        let s = if l < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        let h = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        Hsl::new(h * 60.0, s, l)
    }

    pub fn to_rgb(self) -> Rgb {
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);
        if s == 0.0 {
            let gray = to_channel(l);
            return Rgb::new(gray, gray, gray);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let h = self.h.rem_euclid(360.0) / 360.0;

        Rgb::new(
            to_channel(hue_to_rgb(p, q, h + 1.0 / 3.0)),
            to_channel(hue_to_rgb(p, q, h)),
            to_channel(hue_to_rgb(p, q, h - 1.0 / 3.0)),
        )
    }
}

fn to_channel(v: f64) -> ColorValue {
    (v * 255.0).round().clamp(0.0, 255.0) as ColorValue
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
