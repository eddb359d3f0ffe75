// 4bpp sprite-sheet decoding for palette previews.
use std::{fs, io, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    common::{Rgb, PALETTE_SIZE},
    error::{Error, Result},
};

/// Geometry of the pixel data that follows the palette bank.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteLayout {
    /// Byte offset of the first pixel.
    pub pixel_offset: usize,
    /// Width of the whole sheet in pixels.
    pub sheet_width: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Integer nearest-neighbour upscale factor.
    pub scale: u32,
}

impl Default for SpriteLayout {
    fn default() -> Self {
        SpriteLayout {
            pixel_offset: 512,
            sheet_width: 256,
            frame_width: 32,
            frame_height: 40,
            scale: 2,
        }
    }
}

/// Largest decoded frame, after upscaling, in pixels.
const MAX_FRAME_PIXELS: u64 = 1 << 24;

impl SpriteLayout {
    /// Rejects geometry that cannot be decoded into a frame of sane size.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Error::Argument(format!("sprite layout: {msg}"));
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(bad(format!(
                "{}x{} frame has no pixels",
                self.frame_width, self.frame_height
            )));
        }
        let scale = u64::from(self.scale.max(1));
        let frame = u64::from(self.frame_width) * u64::from(self.frame_height);
        let fits = frame
            .checked_mul(scale * scale)
            .is_some_and(|n| n <= MAX_FRAME_PIXELS);
        if !fits {
            return Err(bad(format!(
                "{}x{} frame at scale {} is too large",
                self.frame_width, self.frame_height, self.scale
            )));
        }
        if u64::from(self.sheet_width) * u64::from(self.frame_height) > u64::from(u32::MAX) {
            return Err(bad(format!("sheet width {} is too large", self.sheet_width)));
        }
        Ok(())
    }

    pub fn frames_per_row(&self) -> u32 {
        if self.frame_width == 0 {
            0
        } else {
            self.sheet_width / self.frame_width
        }
    }
}

/// An RGBA8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Bitmap {
            width,
            height,
            pixels: vec![TRANSPARENT; width as usize * height as usize],
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// RGBA at (x, y), or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.offset(x, y)).copied()
    }

    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = self.offset(x, y);
        self.pixels[idx] = rgba;
    }

    // Callers validate the layout first, so the scaled size fits.
    fn upscale(&self, factor: u32) -> Bitmap {
        let factor = factor.max(1);
        let mut out = Bitmap::new(self.width * factor, self.height * factor);
        for y in 0..out.height {
            for x in 0..out.width {
                let src = self.pixels[self.offset(x / factor, y / factor)];
                out.set_pixel(x, y, src);
            }
        }
        out
    }

    pub fn write_png(&self, path: &Path) -> Result<()> {
        info!("Saving {}", path.display());
        let file = fs::File::create(path)?;
        let w = io::BufWriter::new(file);

        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let data: Vec<u8> = self.pixels.iter().flatten().copied().collect();
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
        Ok(())
    }
}

/// Decodes one frame of 4bpp pixel data (two pixels per byte, low nibble
/// first). Index 0 is transparent; every other index goes through `palette`.
pub fn decode_frame(
    buffer: &[u8],
    palette: &[Rgb; PALETTE_SIZE],
    layout: &SpriteLayout,
    frame_index: u32,
) -> Result<Bitmap> {
    layout.validate()?;
    if frame_index >= layout.frames_per_row() {
        return Err(Error::NotFound(format!(
            "frame {} (sheet holds {} frames)",
            frame_index,
            layout.frames_per_row()
        )));
    }

    let mut bitmap = Bitmap::new(layout.frame_width, layout.frame_height);
    let x_offset = frame_index as usize * layout.frame_width as usize;
    for y in 0..layout.frame_height {
        for x in 0..layout.frame_width {
            let pixel_idx = y as usize * layout.sheet_width as usize + x_offset + x as usize;
            let Some(&byte) = layout
                .pixel_offset
                .checked_add(pixel_idx / 2)
                .and_then(|i| buffer.get(i))
            else {
                continue;
            };
            let color_idx = if pixel_idx % 2 == 0 {
                byte & 0x0F
            } else {
                byte >> 4
            };
            if color_idx != 0 {
                let c = palette[color_idx as usize];
                bitmap.set_pixel(x, y, [c.red, c.green, c.blue, 0xFF]);
            }
        }
    }
    Ok(bitmap.upscale(layout.scale))
}
