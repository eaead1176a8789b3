use crate::device::ContextId;

use super::configs::GpuConfig;

/// Off-screen render target backing one pbuffer surface.
///
/// Multisampled configurations render into `color` and resolve into
/// a single-sampled copy; readback always reads the single-sampled texture.
pub(crate) struct OffscreenTarget {
    pub context: ContextId,

    color_view: wgpu::TextureView,
    /// Kept alive for its views.
    _color: wgpu::Texture,

    resolve_view: Option<wgpu::TextureView>,
    /// Single-sampled texture holding the final pixels.
    readback: wgpu::Texture,

    depth: Option<DepthAttachment>,
}

pub(crate) struct DepthAttachment {
    pub view: wgpu::TextureView,
    pub has_stencil: bool,
    _texture: wgpu::Texture,
}

impl OffscreenTarget {
    pub fn new(
        device: &wgpu::Device,
        context: ContextId,
        config: &GpuConfig,
        width: u32,
        height: u32,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let multisampled = config.sample_count > 1;

        let color_usage = if multisampled {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rasterprint pbuffer color"),
            size,
            mip_level_count: 1,
            sample_count: config.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: config.color,
            usage: color_usage,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let (resolve_view, readback) = if multisampled {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("rasterprint pbuffer resolve"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: config.color,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (Some(view), texture)
        } else {
            (None, color.clone())
        };

        let depth = config.depth.map(|format| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("rasterprint pbuffer depth"),
                size,
                mip_level_count: 1,
                sample_count: config.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            DepthAttachment {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                has_stencil: config.has_stencil(),
                _texture: texture,
            }
        });

        Self {
            context,
            color_view,
            _color: color,
            resolve_view,
            readback,
            depth,
        }
    }

    #[inline]
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    #[inline]
    pub fn resolve_view(&self) -> Option<&wgpu::TextureView> {
        self.resolve_view.as_ref()
    }

    #[inline]
    pub fn depth(&self) -> Option<&DepthAttachment> {
        self.depth.as_ref()
    }

    #[inline]
    pub fn readback_texture(&self) -> &wgpu::Texture {
        &self.readback
    }
}
