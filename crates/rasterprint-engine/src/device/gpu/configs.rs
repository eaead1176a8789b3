//! Surface configurations advertised by a wgpu adapter.
//!
//! wgpu has no config list of its own, so one is synthesized from the color
//! and depth formats the adapter can render to and the sample counts it
//! reports for each pair.

use std::cmp::Reverse;

use crate::device::{ConfigAttribs, ConfigDesc};

/// A concrete format combination behind one `ConfigId`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct GpuConfig {
    pub desc: ConfigDesc,
    pub color: wgpu::TextureFormat,
    pub depth: Option<wgpu::TextureFormat>,
    /// wgpu sample count (1 for single-sampled).
    pub sample_count: u32,
}

impl GpuConfig {
    #[inline]
    pub fn has_stencil(&self) -> bool {
        self.desc.stencil > 0
    }
}

const COLOR_FORMATS: [(wgpu::TextureFormat, [u32; 4]); 2] = [
    (wgpu::TextureFormat::Rgba8Unorm, [8, 8, 8, 8]),
    (wgpu::TextureFormat::Rgb10a2Unorm, [10, 10, 10, 2]),
];

const DEPTH_FORMATS: [(Option<wgpu::TextureFormat>, u32, u32); 5] = [
    (None, 0, 0),
    (Some(wgpu::TextureFormat::Depth16Unorm), 16, 0),
    (Some(wgpu::TextureFormat::Depth24Plus), 24, 0),
    (Some(wgpu::TextureFormat::Depth24PlusStencil8), 24, 8),
    (Some(wgpu::TextureFormat::Depth32Float), 32, 0),
];

const SAMPLE_COUNTS: [u32; 4] = [1, 2, 4, 8];

/// Lists every renderable combination in a fixed order.
pub(crate) fn enumerate(adapter: &wgpu::Adapter) -> Vec<GpuConfig> {
    let adapter_specific = adapter
        .features()
        .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);

    let mut out = Vec::new();

    for (color, [red, green, blue, alpha]) in COLOR_FORMATS {
        let color_features = adapter.get_texture_format_features(color);
        if !color_features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            continue;
        }

        for (depth, depth_bits, stencil_bits) in DEPTH_FORMATS {
            let depth_features = depth.map(|f| adapter.get_texture_format_features(f));
            if depth_features.is_some_and(|f| {
                !f.allowed_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
            }) {
                continue;
            }

            for sample_count in SAMPLE_COUNTS {
                if sample_count > 1 {
                    // 4x is the only count core WebGPU guarantees; the rest need
                    // the adapter-specific feature to be usable on the device.
                    let baseline = sample_count == 4 || adapter_specific;
                    let color_ok = color_features.flags.sample_count_supported(sample_count)
                        && color_features
                            .flags
                            .contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE);
                    let depth_ok = depth_features
                        .is_none_or(|f| f.flags.sample_count_supported(sample_count));
                    if !(baseline && color_ok && depth_ok) {
                        continue;
                    }
                }

                out.push(GpuConfig {
                    desc: ConfigDesc {
                        red,
                        green,
                        blue,
                        alpha,
                        depth: depth_bits,
                        stencil: stencil_bits,
                        samples: if sample_count > 1 { sample_count } else { 0 },
                        programmable: true,
                    },
                    color,
                    depth,
                    sample_count,
                });
            }
        }
    }

    log::debug!("adapter advertises {} surface configurations", out.len());
    out
}

/// EGL result ordering: more requested color bits first, then smaller buffer
/// size, fewer sample buffers, fewer samples, smaller depth, smaller stencil.
pub(crate) fn sort_key(
    desc: &ConfigDesc,
    attribs: &ConfigAttribs,
) -> (Reverse<u32>, u32, u32, u32, u32, u32) {
    let requested_color = [
        (attribs.red_size, desc.red),
        (attribs.green_size, desc.green),
        (attribs.blue_size, desc.blue),
    ]
    .iter()
    .filter(|(requested, _)| *requested > 0)
    .map(|(_, bits)| bits)
    .sum();

    (
        Reverse(requested_color),
        desc.buffer_size(),
        desc.sample_buffers(),
        desc.samples,
        desc.depth,
        desc.stencil,
    )
}

/// Indices of `configs` matching `attribs`, in EGL order.
pub(crate) fn select(configs: &[GpuConfig], attribs: &ConfigAttribs) -> Vec<usize> {
    let mut matching: Vec<usize> = configs
        .iter()
        .enumerate()
        .filter(|(_, c)| attribs.matches(&c.desc))
        .map(|(i, _)| i)
        .collect();
    matching.sort_by_key(|&i| sort_key(&configs[i].desc, attribs));
    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rgba: [u32; 4], depth: u32, stencil: u32, samples: u32) -> GpuConfig {
        GpuConfig {
            desc: ConfigDesc {
                red: rgba[0],
                green: rgba[1],
                blue: rgba[2],
                alpha: rgba[3],
                depth,
                stencil,
                samples,
                programmable: true,
            },
            color: wgpu::TextureFormat::Rgba8Unorm,
            depth: None,
            sample_count: samples.max(1),
        }
    }

    #[test]
    fn deeper_color_sorts_first() {
        let configs = [config([8, 8, 8, 8], 0, 0, 0), config([10, 10, 10, 2], 0, 0, 0)];
        let order = select(&configs, &ConfigAttribs::with_channel_floor(4));
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn single_sample_sorts_before_multisample() {
        let configs = [config([8, 8, 8, 8], 0, 0, 4), config([8, 8, 8, 8], 0, 0, 0)];
        let order = select(&configs, &ConfigAttribs::with_channel_floor(4));
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn smaller_depth_then_stencil_sorts_first() {
        let configs = [
            config([8, 8, 8, 8], 24, 8, 0),
            config([8, 8, 8, 8], 24, 0, 0),
            config([8, 8, 8, 8], 16, 0, 0),
        ];
        let order = select(&configs, &ConfigAttribs::with_channel_floor(4));
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn multisample_query_drops_single_sample() {
        let configs = [config([8, 8, 8, 8], 0, 0, 0), config([8, 8, 8, 8], 0, 0, 4)];
        let order = select(&configs, &ConfigAttribs::with_channel_floor(4).with_samples(4));
        assert_eq!(order, vec![1]);
    }
}
