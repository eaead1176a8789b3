//! Framebuffer readback into tight RGBA8 rows, bottom row first.

use anyhow::{Context, Result, bail, ensure};

/// Align number to WebGPU's copy row alignment (256 bytes).
fn align_bpr(value: usize) -> usize {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    value.div_ceil(align) * align
}

/// Reads the `width` x `height` region anchored at the bottom-left corner of
/// `src`, returning rows in GL order (bottom first) as RGBA8.
pub(crate) fn read_pixels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    ensure!(width > 0 && height > 0, "readback size must be positive");
    ensure!(
        width <= src.width() && height <= src.height(),
        "readback {width}x{height} exceeds surface {}x{}",
        src.width(),
        src.height()
    );
    ensure!(
        src.sample_count() == 1,
        "readback requires a single-sample texture, got {}",
        src.sample_count()
    );

    let format = src.format();
    if !matches!(
        format,
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgb10a2Unorm
    ) {
        bail!("unsupported readback format {format:?}");
    }

    // Both supported formats are 4 bytes per texel.
    let tight_bpr = 4 * width as usize;
    let padded_bpr = align_bpr(tight_bpr);
    let buffer_size = (padded_bpr * height as usize) as wgpu::BufferAddress;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("rasterprint readback staging"),
        size: buffer_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("rasterprint readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: src,
            mip_level: 0,
            // GL's origin is the bottom-left corner; texture rows run top-down.
            origin: wgpu::Origin3d {
                x: 0,
                y: src.height() - height,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr as u32),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed during readback")?;
    receiver
        .recv()
        .context("map_async callback channel dropped")?
        .context("failed to map readback buffer")?;

    let data = slice.get_mapped_range();
    let mut out = Vec::with_capacity(tight_bpr * height as usize);
    for row in (0..height as usize).rev() {
        let start = row * padded_bpr;
        let texels = &data[start..start + tight_bpr];
        match format {
            wgpu::TextureFormat::Rgb10a2Unorm => expand_rgb10a2(texels, &mut out),
            _ => out.extend_from_slice(texels),
        }
    }
    drop(data);
    staging.unmap();

    Ok(out)
}

/// Converts packed 10:10:10:2 texels to RGBA8 with GL's rounding.
fn expand_rgb10a2(texels: &[u8], out: &mut Vec<u8>) {
    for texel in texels.chunks_exact(4) {
        let v = u32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]]);
        let ten = |shift: u32| (((v >> shift) & 0x3ff) * 255 + 511) / 1023;
        out.extend_from_slice(&[
            ten(0) as u8,
            ten(10) as u8,
            ten(20) as u8,
            ((v >> 30) * 85) as u8,
        ]);
    }
}
