use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, RgbaImage};

/// Bytes per RGBA8 pixel.
const CHANNELS: usize = 4;

/// Row-major RGBA8 raster with its origin at the top-left.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrameImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameImage {
    /// Wraps a tightly packed RGBA8 buffer, top row first.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        ensure!(
            pixels.len() == expected,
            "frame {width}x{height} needs {expected} bytes, got {}",
            pixels.len()
        );
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at column `x` of row `y` (row 0 is the top).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let start = x as usize * CHANNELS;
        let mut px = [0; 4];
        px.copy_from_slice(&row[start..start + CHANNELS]);
        Some(px)
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * CHANNELS;
        let start = y as usize * stride;
        Some(&self.pixels[start..start + stride])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length was validated in `from_rgba`.
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(self.pixel(x, y).unwrap_or_default())
        })
    }

    /// Lossless PNG encoding of the frame.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_png(&mut bytes)?;
        Ok(bytes)
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create output PNG at {}", path.display()))?;
        self.write_png(BufWriter::new(file))
    }

    fn write_png<W: std::io::Write>(&self, out: W) -> Result<()> {
        ensure!(self.width > 0 && self.height > 0, "cannot encode an empty frame");
        PngEncoder::new_with_quality(out, CompressionType::Default, FilterType::Adaptive)
            .write_image(&self.pixels, self.width, self.height, ColorType::Rgba8.into())
            .context("failed to encode RGBA8 PNG")
    }
}

fn buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(CHANNELS))
        .context("frame dimensions overflow")
}
