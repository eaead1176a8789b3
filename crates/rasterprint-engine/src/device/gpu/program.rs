use anyhow::{Result, bail, ensure};

use crate::coords::Mat4;
use crate::device::{AttribLocation, ProgramSource, UniformLocation};

use super::configs::GpuConfig;

const MAT4_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;

/// A linked program: a depth-tested render pipeline plus the current value of
/// every matrix uniform (GL keeps uniforms per program).
pub(crate) struct GpuProgram {
    attributes: Vec<(String, u32)>,
    uniform_names: Vec<String>,
    uniform_values: Vec<Mat4>,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl GpuProgram {
    /// Compiles both stages and builds the pipelines inside a validation
    /// error scope; any captured error is reported as a link failure.
    pub fn link(
        device: &wgpu::Device,
        config: &GpuConfig,
        source: &ProgramSource<'_>,
    ) -> Result<Self> {
        ensure!(
            !source.uniforms.is_empty(),
            "program {} declares no uniforms",
            source.label
        );
        for attr in source.attributes {
            ensure!(
                (1..=4).contains(&attr.components),
                "attribute {} has {} components",
                attr.name,
                attr.components
            );
        }

        // The scope stays open until `pop`; dropping the guard early would hand
        // validation errors to the uncaptured-error handler, which panics.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });

        let uniform_block_size = MAT4_SIZE * source.uniforms.len() as u64;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rasterprint program bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(uniform_block_size),
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rasterprint program layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        // One buffer slot per attribute, tightly packed floats.
        let attribute_arrays: Vec<[wgpu::VertexAttribute; 1]> = source
            .attributes
            .iter()
            .enumerate()
            .map(|(location, attr)| {
                [wgpu::VertexAttribute {
                    format: float_format(attr.components),
                    offset: 0,
                    shader_location: location as u32,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = source
            .attributes
            .iter()
            .zip(attribute_arrays.iter())
            .map(|(attr, attributes)| wgpu::VertexBufferLayout {
                array_stride: u64::from(attr.components) * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(source.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.color,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            // Triangle list, CCW front faces, no culling: the GL defaults.
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: config.depth.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: config.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            bail!("program {} failed to link: {err}", source.label);
        }

        Ok(Self {
            attributes: source
                .attributes
                .iter()
                .map(|a| (a.name.to_owned(), a.components))
                .collect(),
            uniform_names: source.uniforms.iter().map(|u| (*u).to_owned()).collect(),
            uniform_values: vec![Mat4::ZERO; source.uniforms.len()],
            bind_group_layout,
            pipeline,
        })
    }

    pub fn attrib_location(&self, name: &str) -> Option<AttribLocation> {
        self.attributes
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| AttribLocation::from_raw(i as u32))
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniform_names
            .iter()
            .position(|n| n == name)
            .map(|i| UniformLocation::from_raw(i as u32))
    }

    /// Component count per attribute, by location.
    pub fn attribute_components(&self) -> impl Iterator<Item = u32> + '_ {
        self.attributes.iter().map(|(_, c)| *c)
    }

    pub fn set_uniform(&mut self, location: UniformLocation, value: Mat4) -> bool {
        match self.uniform_values.get_mut(location.raw() as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn uniform_values(&self) -> &[Mat4] {
        &self.uniform_values
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}
