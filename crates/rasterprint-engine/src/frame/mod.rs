//! Captured frames: readback orientation and the raster image handed to
//! fingerprint consumers.

mod extract;
mod raster;

pub use extract::{PixelExtractor, flip_rows};
pub use raster::FrameImage;
