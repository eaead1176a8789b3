//! One-shot capture: build the surface, render the scene, read it back and
//! tear everything down.

mod config;

pub use config::ProbeConfig;

use anyhow::{Context, Result, ensure};

use crate::config::CapabilityRequest;
use crate::device::{ConfigDesc, DeviceInfo, Driver, WgpuDriver};
use crate::frame::FrameImage;
use crate::render::ScenePainter;
use crate::surface::PixelBuffer;

/// Result of one probe run.
#[derive(Debug, Clone)]
pub struct Capture {
    pub image: FrameImage,
    pub device: DeviceInfo,
    /// Configuration the surface was negotiated with.
    pub config: ConfigDesc,
}

/// Captures the scene with the wgpu driver.
pub fn capture(config: &ProbeConfig) -> Result<Capture> {
    let driver = WgpuDriver::new(config.gpu.clone());
    capture_with(driver, config.width, config.height, config.request)
}

/// Captures the scene with an arbitrary driver.
///
/// The surface is always destroyed before returning.
pub fn capture_with<D: Driver>(
    driver: D,
    width: u32,
    height: u32,
    request: CapabilityRequest,
) -> Result<Capture> {
    let mut buffer = PixelBuffer::new(driver, width, height, request);
    let result = render(&mut buffer);
    buffer.destroy();
    result
}

fn render<D: Driver>(buffer: &mut PixelBuffer<D>) -> Result<Capture> {
    let (width, height) = buffer.size();
    ensure!(
        buffer.is_valid(),
        "no usable {width}x{height} off-screen surface"
    );

    buffer.set_renderer(ScenePainter::new());

    let device = buffer.device_info().context("device info unavailable")?;
    let config = buffer.config().context("negotiated configuration unavailable")?;
    let image = buffer.get_bitmap().context("frame readback failed")?;

    log::info!(
        "captured {}x{} frame on {} ({})",
        image.width(),
        image.height(),
        device.renderer,
        device.vendor
    );
    Ok(Capture {
        image,
        device,
        config,
    })
}
