//! Rasterprint engine crate.
//!
//! Renders a fixed 3-D scene off-screen and reads it back as an RGBA raster.
//! Hardware, driver and rasterizer differences show up as pixel differences,
//! which callers hash into a device fingerprint.

pub mod config;
pub mod coords;
pub mod device;
pub mod frame;
pub mod render;
pub mod surface;

pub mod logging;
pub mod probe;
