// In-place codec for the 16-color palette at the head of a sprite/theme blob.
use std::{fs, path::Path};

use log::{debug, info, warn};

use crate::{
    color::Color15,
    common::{ColorIdx, Rgb, PALETTE_SIZE},
    error::{Error, Result},
    sprite::{self, Bitmap, SpriteLayout},
};

/// Size of the editable palette region in bytes.
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 2;
/// Size of the palette bank (16 palettes) that precedes the pixel data.
pub const PALETTE_BANK_BYTES: usize = PALETTE_BYTES * 16;

pub type Palette = [Rgb; PALETTE_SIZE];

/// A loaded sprite/theme blob: a mutable working buffer and the pristine
/// bytes as first loaded. The pristine copy is never written after `load`.
#[derive(Clone, Debug)]
pub struct PaletteBlob {
    working: Vec<u8>,
    pristine: Vec<u8>,
}

fn check_index(index: ColorIdx) -> Result<usize> {
    if (index as usize) < PALETTE_SIZE {
        Ok(index as usize)
    } else {
        Err(Error::NotFound(format!("palette index {index}")))
    }
}

fn read_word(data: &[u8], offset: usize) -> Color15 {
    Color15::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_palette(data: &[u8], offset: usize) -> Palette {
    let mut colors = [Rgb::default(); PALETTE_SIZE];
    for (i, c) in colors.iter_mut().enumerate() {
        *c = read_word(data, offset + i * 2).to_rgb();
    }
    colors
}

impl PaletteBlob {
    pub fn load(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < PALETTE_BYTES {
            return Err(Error::Format(format!(
                "blob is {} bytes, palette needs {}",
                bytes.len(),
                PALETTE_BYTES
            )));
        }
        Ok(PaletteBlob {
            pristine: bytes.clone(),
            working: bytes,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading {}", path.display());
        Self::load(fs::read(path)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        info!("Saving {}", path.display());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.working)?;
        Ok(())
    }

    /// Current working palette.
    pub fn palette(&self) -> Palette {
        read_palette(&self.working, 0)
    }

    /// Palette as it was at load time.
    pub fn original_palette(&self) -> Palette {
        read_palette(&self.pristine, 0)
    }

    pub fn color(&self, index: ColorIdx) -> Result<Rgb> {
        let i = check_index(index)?;
        Ok(read_word(&self.working, i * 2).to_rgb())
    }

    pub fn original_color(&self, index: ColorIdx) -> Result<Rgb> {
        let i = check_index(index)?;
        Ok(read_word(&self.pristine, i * 2).to_rgb())
    }

    /// Re-encodes `color` into the entry's two bytes. Nothing else changes.
    pub fn set_color(&mut self, index: ColorIdx, color: Rgb) -> Result<()> {
        let i = check_index(index)?;
        let bytes = Color15::from_rgb(color).to_le_bytes();
        self.working[i * 2..i * 2 + 2].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn raw_word(&self, index: ColorIdx) -> Result<Color15> {
        let i = check_index(index)?;
        Ok(read_word(&self.working, i * 2))
    }

    /// Copies one entry's raw bytes from another blob, with no RGB round-trip.
    pub fn copy_index_from(&mut self, index: ColorIdx, source: &PaletteBlob) -> Result<()> {
        let i = check_index(index)?;
        self.working[i * 2..i * 2 + 2].copy_from_slice(&source.working[i * 2..i * 2 + 2]);
        Ok(())
    }

    /// Restores one entry from the pristine bytes.
    pub fn reset_index(&mut self, index: ColorIdx) -> Result<()> {
        let i = check_index(index)?;
        self.working[i * 2..i * 2 + 2].copy_from_slice(&self.pristine[i * 2..i * 2 + 2]);
        Ok(())
    }

    /// Restores the palette region only; pixel data is left as is.
    pub fn reset(&mut self) {
        self.working[..PALETTE_BYTES].copy_from_slice(&self.pristine[..PALETTE_BYTES]);
    }

    pub fn palette_bytes(&self) -> &[u8] {
        &self.working[..PALETTE_BYTES]
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.working.clone()
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.working != self.pristine
    }

    // Palette 0 is the working palette; other bank entries fall back to it
    // when they are out of range or entirely black.
    fn preview_palette(&self, palette_index: u8) -> Palette {
        if palette_index == 0 {
            return self.palette();
        }
        let offset = palette_index as usize * PALETTE_BYTES;
        let end = offset + PALETTE_BYTES;
        if end > PALETTE_BANK_BYTES || end > self.working.len() {
            debug!("palette {} out of bounds, using palette 0", palette_index);
            return self.palette();
        }
        let all_black =
            (1..PALETTE_SIZE).all(|i| read_word(&self.working, offset + i * 2).raw() == 0);
        if all_black {
            warn!("palette {} is all black, using palette 0", palette_index);
            return self.palette();
        }
        read_palette(&self.working, offset)
    }

    /// Renders one frame of the blob's pixel data with the current colors.
    pub fn decode_sprite(
        &self,
        layout: &SpriteLayout,
        palette_index: u8,
        frame_index: u32,
    ) -> Result<Bitmap> {
        let palette = self.preview_palette(palette_index);
        sprite::decode_frame(&self.working, &palette, layout, frame_index)
    }
}
