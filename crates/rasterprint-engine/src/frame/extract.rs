use anyhow::{Context, Result, ensure};

use crate::surface::Current;

use super::FrameImage;

/// Reads the current surface back into a top-left-origin `FrameImage`.
pub struct PixelExtractor;

impl PixelExtractor {
    /// Readback arrives bottom row first; rows are reversed, columns and
    /// channel bytes pass through untouched.
    pub fn extract(current: &mut Current<'_>, width: u32, height: u32) -> Result<FrameImage> {
        let raw = current
            .read_pixels(width, height)
            .context("framebuffer readback failed")?;

        let row_bytes = width as usize * 4;
        ensure!(
            raw.len() == row_bytes * height as usize,
            "readback returned {} bytes for {width}x{height}",
            raw.len()
        );

        FrameImage::from_rgba(width, height, flip_rows(&raw, row_bytes))
    }
}

/// Reverses the row order of a packed buffer.
pub fn flip_rows(raw: &[u8], row_bytes: usize) -> Vec<u8> {
    if row_bytes == 0 {
        return Vec::new();
    }
    raw.chunks_exact(row_bytes).rev().flatten().copied().collect()
}
