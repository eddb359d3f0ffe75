// Color look-up table entries of the character color-table binary.
use std::{fmt, str::FromStr};

use itertools::Itertools;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{
    color::Color15,
    common::{Rgb, PALETTE_SIZE},
    error::{Error, Result},
    palette::PALETTE_BYTES,
};

pub mod patcher;
pub mod store;

/// 16 colors x 3 channels.
pub const CLUT_LEN: usize = PALETTE_SIZE * 3;
pub const MAGIC: &[u8; 4] = b"NXDF";

pub type ClutData = [u8; CLUT_LEN];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClutKey {
    pub primary: i64,
    pub secondary: i64,
}

impl ClutKey {
    pub const fn new(primary: i64, secondary: i64) -> Self {
        ClutKey { primary, secondary }
    }
}

impl fmt::Display for ClutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.secondary)
    }
}

// Regions are consecutive, 48 bytes apart, in this key order.
const CLUT_OFFSETS: [(i64, i64, usize); 16] = [
    (1, 0, 0x379),
    (1, 1, 0x3A9),
    (1, 2, 0x3D9),
    (1, 3, 0x409),
    (2, 0, 0x439),
    (2, 1, 0x469),
    (2, 2, 0x499),
    (2, 3, 0x4C9),
    (3, 0, 0x4F9),
    (3, 1, 0x529),
    (3, 2, 0x559),
    (3, 3, 0x589),
    (254, 0, 0x5B9),
    (254, 1, 0x5E9),
    (255, 0, 0x619),
    (255, 1, 0x649),
];

/// Byte offset of the key's region, or `None` if the table has no such key.
pub fn clut_offset(key: ClutKey) -> Option<usize> {
    CLUT_OFFSETS
        .iter()
        .find(|&&(k, k2, _)| k == key.primary && k2 == key.secondary)
        .map(|&(_, _, offset)| offset)
}

pub fn mapped_keys() -> impl Iterator<Item = ClutKey> {
    CLUT_OFFSETS.iter().map(|&(k, k2, _)| ClutKey::new(k, k2))
}

pub fn check_magic(template: &[u8]) -> Result<()> {
    if template.len() < MAGIC.len() || &template[..MAGIC.len()] != MAGIC {
        return Err(Error::Format(
            "color table binary is missing its NXDF marker".to_string(),
        ));
    }
    Ok(())
}

/// Reads the region stored for `key` back out of a color table binary.
pub fn read_clut(template: &[u8], key: ClutKey) -> Result<ClutData> {
    check_magic(template)?;
    let offset =
        clut_offset(key).ok_or_else(|| Error::NotFound(format!("color table key {key}")))?;
    let region = template.get(offset..offset + CLUT_LEN).ok_or_else(|| {
        Error::Format(format!(
            "color table binary is {} bytes, region {key} ends at {}",
            template.len(),
            offset + CLUT_LEN
        ))
    })?;
    let mut out = [0; CLUT_LEN];
    out.copy_from_slice(region);
    Ok(out)
}

/// Clamps raw integers into a CLUT entry. The length must be exactly 48.
pub fn clamp_values(values: &[i32]) -> Result<ClutData> {
    if values.len() != CLUT_LEN {
        return Err(Error::Argument(format!(
            "color table entry needs {} values, got {}",
            CLUT_LEN,
            values.len()
        )));
    }
    let mut out = [0; CLUT_LEN];
    for (dst, &v) in out.iter_mut().zip(values) {
        *dst = v.clamp(0, 255) as u8;
    }
    Ok(out)
}

/// Expands the 32-byte packed palette region into RGB triples.
pub fn palette_to_clut(palette: &[u8]) -> Result<ClutData> {
    if palette.len() < PALETTE_BYTES {
        return Err(Error::Format(format!(
            "palette region is {} bytes, need {}",
            palette.len(),
            PALETTE_BYTES
        )));
    }
    let mut out = [0; CLUT_LEN];
    for (i, (lo, hi)) in palette[..PALETTE_BYTES].iter().tuples().enumerate() {
        let rgb = Color15::from_le_bytes([*lo, *hi]).to_rgb();
        out[i * 3..i * 3 + 3].copy_from_slice(&rgb.to_array());
    }
    Ok(out)
}

/// Packs RGB triples back into the 32-byte palette region.
pub fn clut_to_palette(clut: &ClutData) -> [u8; PALETTE_BYTES] {
    let mut out = [0; PALETTE_BYTES];
    for (i, (r, g, b)) in clut.iter().tuples().enumerate() {
        let word = Color15::from_rgb(Rgb::new(*r, *g, *b));
        out[i * 2..i * 2 + 2].copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Story chapters that own a color table entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Chapter {
    One = 1,
    TwoThree = 2,
    Four = 4,
}

impl Chapter {
    pub const ALL: [Chapter; 3] = [Chapter::One, Chapter::TwoThree, Chapter::Four];

    pub fn from_number(n: i64) -> Result<Self> {
        match n {
            1 => Ok(Chapter::One),
            2 | 23 => Ok(Chapter::TwoThree),
            4 => Ok(Chapter::Four),
            _ => Err(Error::Argument(format!(
                "invalid chapter {n}, expected 1, 2 (or 23) or 4"
            ))),
        }
    }

    pub fn key(self) -> ClutKey {
        let primary = match self {
            Chapter::One => 1,
            Chapter::TwoThree => 2,
            Chapter::Four => 3,
        };
        ClutKey::new(primary, 0)
    }

    pub fn from_job_name(job: &str) -> Result<Self> {
        match job {
            "RamzaCh1" | "RamzaChapter1" => Ok(Chapter::One),
            "RamzaCh23" | "RamzaChapter23" => Ok(Chapter::TwoThree),
            "RamzaCh4" | "RamzaChapter4" => Ok(Chapter::Four),
            _ => Err(Error::Argument(format!("job '{job}' has no chapter"))),
        }
    }
}

impl FromStr for Chapter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "2/3" => Ok(Chapter::TwoThree),
            other => match other.parse::<i64>() {
                Ok(n) => Chapter::from_number(n),
                Err(_) => Chapter::from_job_name(other),
            },
        }
    }
}
