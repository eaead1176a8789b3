use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};

use crate::coords::Mat4;
use crate::device::{BufferId, BufferTarget, ConfigId, ProgramId};

use super::configs::GpuConfig;
use super::program::GpuProgram;

pub(crate) struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub target: BufferTarget,
}

/// Server-side state GL keeps per context.
#[derive(Debug, Default)]
pub(crate) struct GlState {
    pub program: Option<ProgramId>,
    pub clear_color: [f32; 4],
    pub depth_test: bool,
    pub enabled_attribs: HashSet<u32>,
    /// Attribute location → (source buffer, component count).
    pub pointers: HashMap<u32, (BufferId, u32)>,
}

/// Recorded command awaiting submission.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Clear { color: Option<wgpu::Color>, depth: bool },
    Draw(DrawCall),
}

/// Everything a draw needs, captured at issue time so later state changes do
/// not leak into it.
#[derive(Debug, Clone)]
pub(crate) struct DrawCall {
    pub program: ProgramId,
    /// Vertex buffer per attribute location.
    pub vertex_buffers: Vec<BufferId>,
    pub indices: Option<BufferId>,
    pub first: u32,
    pub count: u32,
    pub uniforms: Vec<Mat4>,
}

/// wgpu device + queue standing in for one rendering context.
pub(crate) struct GpuContext {
    pub config_id: ConfigId,
    pub config: GpuConfig,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    pub programs: HashMap<ProgramId, GpuProgram>,
    pub buffers: HashMap<BufferId, GpuBuffer>,
    pub state: GlState,
    pub pending: Vec<Command>,
}

impl GpuContext {
    pub fn new(adapter: &wgpu::Adapter, config_id: ConfigId, config: GpuConfig) -> Result<Self> {
        let mut required_features = wgpu::Features::empty();
        if !matches!(config.sample_count, 1 | 4) {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("rasterprint context"),
            required_features,
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        Ok(Self {
            config_id,
            config,
            device,
            queue,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            state: GlState::default(),
            pending: Vec::new(),
        })
    }

    /// Captures a draw from the current state, or explains why GL would
    /// reject it.
    pub fn snapshot_draw(
        &self,
        indices: Option<BufferId>,
        first: u32,
        count: u32,
    ) -> std::result::Result<DrawCall, &'static str> {
        let program_id = self.state.program.ok_or("no program in use")?;
        let program = self.programs.get(&program_id).ok_or("program was deleted")?;
        // Pipelines are linked depth-tested whenever the surface has a depth buffer.
        if self.config.depth.is_some() && !self.state.depth_test {
            return Err("depth test must be enabled on surfaces with a depth buffer");
        }

        let mut vertex_buffers = Vec::new();
        for (location, components) in program.attribute_components().enumerate() {
            let location = location as u32;
            if !self.state.enabled_attribs.contains(&location) {
                return Err("vertex attribute array not enabled");
            }
            let &(buffer, bound_components) = self
                .state
                .pointers
                .get(&location)
                .ok_or("vertex attribute has no buffer")?;
            if bound_components != components {
                return Err("vertex attribute component count mismatch");
            }
            vertex_buffers.push(buffer);
        }

        if let Some(indices) = indices {
            match self.buffers.get(&indices) {
                Some(b) if b.target == BufferTarget::ElementArray => {}
                _ => return Err("index buffer missing or not an element array"),
            }
        }

        Ok(DrawCall {
            program: program_id,
            vertex_buffers,
            indices,
            first,
            count,
            uniforms: program.uniform_values().to_vec(),
        })
    }
}
