//! Off-screen rendering surface.
//!
//! This module is responsible for:
//! - the display → context → pbuffer lifecycle and its ordered teardown
//! - the `Current` token that proves a context is bound
//! - driving an installed `Renderer` and reading frames back

mod current;
mod pixel_buffer;

pub use current::Current;
pub use pixel_buffer::PixelBuffer;
