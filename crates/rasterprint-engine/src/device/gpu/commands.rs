//! `Gl` implementation: state tracking, command recording and submission.

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::coords::Mat4;
use crate::device::{
    AttribLocation, BufferId, BufferTarget, Capability, ClearMask, Gl, ProgramId, ProgramSource,
    StringName, UniformLocation,
};

use super::WgpuDriver;
use super::context::{Command, DrawCall, GpuBuffer, GpuContext};
use super::program::GpuProgram;
use super::readback;
use super::target::OffscreenTarget;

impl WgpuDriver {
    fn bound_context(&mut self) -> Option<&mut GpuContext> {
        let binding = self.current?;
        self.contexts.get_mut(&binding.context)
    }

    fn bound_context_ref(&self) -> Option<&GpuContext> {
        let binding = self.current?;
        self.contexts.get(&binding.context)
    }

    /// Runs `f` against the current context; GL silently ignores commands
    /// without one, we log them.
    fn with_bound(&mut self, command: &str, f: impl FnOnce(&mut GpuContext)) {
        match self.bound_context() {
            Some(ctx) => f(ctx),
            None => log::warn!("{command} issued with no current context"),
        }
    }

    fn record_draw(&mut self, indices: Option<BufferId>, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        self.with_bound("draw", |ctx| match ctx.snapshot_draw(indices, first, count) {
            Ok(draw) => ctx.pending.push(Command::Draw(draw)),
            Err(reason) => log::warn!("draw dropped: {reason}"),
        });
    }

    /// Submits everything recorded against the current binding.
    pub(super) fn flush(&mut self) -> Result<()> {
        let Some(binding) = self.current else {
            return Ok(());
        };
        let Some(ctx) = self.contexts.get_mut(&binding.context) else {
            return Ok(());
        };
        if ctx.pending.is_empty() {
            return Ok(());
        }

        let commands = std::mem::take(&mut ctx.pending);
        let target = self
            .surfaces
            .get(&binding.surface)
            .context("current surface no longer exists")?;

        submit(ctx, target, &commands);
        Ok(())
    }
}

/// One render pass: an optional clear followed by the draws recorded after it.
struct Pass<'c> {
    clear_color: Option<wgpu::Color>,
    clear_depth: bool,
    draws: Vec<&'c DrawCall>,
}

fn plan(commands: &[Command]) -> Vec<Pass<'_>> {
    let mut passes: Vec<Pass<'_>> = Vec::new();
    for command in commands {
        match command {
            Command::Clear { color, depth } => passes.push(Pass {
                clear_color: *color,
                clear_depth: *depth,
                draws: Vec::new(),
            }),
            Command::Draw(draw) => {
                if passes.is_empty() {
                    passes.push(Pass {
                        clear_color: None,
                        clear_depth: false,
                        draws: Vec::new(),
                    });
                }
                if let Some(pass) = passes.last_mut() {
                    pass.draws.push(draw);
                }
            }
        }
    }
    passes
}

fn submit(ctx: &GpuContext, target: &OffscreenTarget, commands: &[Command]) {
    let passes = plan(commands);

    // Uniform blocks are snapshotted per draw, so every draw gets its own
    // buffer; they must exist before any pass borrows the encoder.
    let bind_groups: Vec<Option<wgpu::BindGroup>> = passes
        .iter()
        .flat_map(|pass| pass.draws.iter())
        .map(|draw| {
            let program = ctx.programs.get(&draw.program)?;
            let ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("rasterprint draw uniforms"),
                contents: bytemuck::cast_slice(&draw.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("rasterprint draw bind group"),
                layout: program.bind_group_layout(),
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                }],
            }))
        })
        .collect();
    let mut bind_groups = bind_groups.iter();

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("rasterprint frame encoder"),
        });

    for pass in &passes {
        let color_load = match pass.clear_color {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let depth_stencil_attachment =
            target
                .depth()
                .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: if pass.clear_depth {
                            wgpu::LoadOp::Clear(1.0)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: depth.has_stencil.then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("rasterprint pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view(),
                resolve_target: target.resolve_view(),
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &pass.draws {
            let group = bind_groups.next().and_then(Option::as_ref);
            let (Some(program), Some(group)) = (ctx.programs.get(&draw.program), group) else {
                log::warn!("draw skipped: program {:?} is gone", draw.program);
                continue;
            };
            encode_draw(&mut rpass, ctx, program, group, draw);
        }
    }

    ctx.queue.submit(std::iter::once(encoder.finish()));
}

fn encode_draw(
    rpass: &mut wgpu::RenderPass<'_>,
    ctx: &GpuContext,
    program: &GpuProgram,
    group: &wgpu::BindGroup,
    draw: &DrawCall,
) {
    let vertex_buffers: Option<Vec<&GpuBuffer>> = draw
        .vertex_buffers
        .iter()
        .map(|id| ctx.buffers.get(id))
        .collect();
    let Some(vertex_buffers) = vertex_buffers else {
        log::warn!("draw skipped: vertex buffer is gone");
        return;
    };

    rpass.set_pipeline(program.pipeline());
    rpass.set_bind_group(0, group, &[]);
    for (slot, buffer) in vertex_buffers.iter().enumerate() {
        rpass.set_vertex_buffer(slot as u32, buffer.buffer.slice(..));
    }

    match draw.indices {
        Some(indices) => {
            let Some(index_buffer) = ctx.buffers.get(&indices) else {
                log::warn!("draw skipped: index buffer is gone");
                return;
            };
            rpass.set_index_buffer(index_buffer.buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..draw.count, 0, 0..1);
        }
        None => rpass.draw(draw.first..draw.first + draw.count, 0..1),
    }
}

fn to_wgpu_color([r, g, b, a]: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(r.clamp(0.0, 1.0)),
        g: f64::from(g.clamp(0.0, 1.0)),
        b: f64::from(b.clamp(0.0, 1.0)),
        a: f64::from(a.clamp(0.0, 1.0)),
    }
}

/// PCI vendor ids of common GPU vendors.
fn vendor_name(id: u32) -> Option<&'static str> {
    match id {
        0x1002 => Some("AMD"),
        0x106b => Some("Apple"),
        0x10de => Some("NVIDIA"),
        0x13b5 => Some("ARM"),
        0x1010 => Some("Imagination Technologies"),
        0x5143 => Some("Qualcomm"),
        0x8086 => Some("Intel"),
        0x10005 => Some("Mesa"),
        _ => None,
    }
}

impl Gl for WgpuDriver {
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId> {
        let id = ProgramId::from_raw(self.alloc_handle());
        let ctx = self
            .bound_context()
            .context("create_program issued with no current context")?;
        let program = GpuProgram::link(&ctx.device, &ctx.config, source)?;
        ctx.programs.insert(id, program);
        log::debug!("linked program {} as {id:?}", source.label);
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.with_bound("use_program", |ctx| {
            if ctx.programs.contains_key(&program) {
                ctx.state.program = Some(program);
            } else {
                log::warn!("use_program: unknown program {program:?}");
            }
        });
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        self.bound_context_ref()?
            .programs
            .get(&program)?
            .attrib_location(name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.bound_context_ref()?
            .programs
            .get(&program)?
            .uniform_location(name)
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.with_bound("enable_vertex_attrib_array", |ctx| {
            ctx.state.enabled_attribs.insert(location.raw());
        });
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
        let id = BufferId::from_raw(self.alloc_handle());
        let ctx = self
            .bound_context()
            .context("create_buffer issued with no current context")?;

        let usage = match target {
            BufferTarget::Array => wgpu::BufferUsages::VERTEX,
            BufferTarget::ElementArray => wgpu::BufferUsages::INDEX,
        };
        let buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rasterprint geometry"),
            contents: data,
            usage,
        });
        ctx.buffers.insert(id, GpuBuffer { buffer, target });
        Ok(id)
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        buffer: BufferId,
        components: u32,
    ) {
        self.with_bound("vertex_attrib_pointer", |ctx| {
            match ctx.buffers.get(&buffer) {
                Some(b) if b.target == BufferTarget::Array => {
                    ctx.state.pointers.insert(location.raw(), (buffer, components));
                }
                _ => log::warn!("vertex_attrib_pointer: {buffer:?} is not an array buffer"),
            }
        });
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &Mat4) {
        self.with_bound("uniform_matrix4", |ctx| {
            let program = ctx.state.program.and_then(|p| ctx.programs.get_mut(&p));
            match program {
                Some(program) => {
                    if !program.set_uniform(location, *value) {
                        log::warn!("uniform_matrix4: no uniform at {location:?}");
                    }
                }
                None => log::warn!("uniform_matrix4: no program in use"),
            }
        });
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.with_bound("clear_color", |ctx| ctx.state.clear_color = rgba);
    }

    fn enable(&mut self, capability: Capability) {
        self.with_bound("enable", |ctx| match capability {
            Capability::DepthTest => ctx.state.depth_test = true,
        });
    }

    fn clear(&mut self, mask: ClearMask) {
        if !mask.color && !mask.depth {
            return;
        }
        self.with_bound("clear", |ctx| {
            let color = mask.color.then(|| to_wgpu_color(ctx.state.clear_color));
            ctx.pending.push(Command::Clear {
                color,
                depth: mask.depth,
            });
        });
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        self.record_draw(None, first, count);
    }

    fn draw_elements(&mut self, indices: BufferId, count: u32) {
        self.record_draw(Some(indices), 0, count);
    }

    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>> {
        self.flush()?;
        let binding = self
            .current
            .context("read_pixels issued with no current context")?;
        let ctx = self
            .contexts
            .get(&binding.context)
            .context("current context no longer exists")?;
        let target = self
            .surfaces
            .get(&binding.surface)
            .context("current surface no longer exists")?;

        readback::read_pixels(
            &ctx.device,
            &ctx.queue,
            target.readback_texture(),
            width,
            height,
        )
    }

    fn get_string(&self, name: StringName) -> Option<String> {
        let info = self.adapter_info()?;
        let s = match name {
            StringName::Renderer => info.name,
            StringName::Vendor => match vendor_name(info.vendor) {
                Some(vendor) => format!("{vendor} ({:#06x})", info.vendor),
                None => format!("{:#06x}", info.vendor),
            },
            StringName::Version => {
                format!("{:?} {} {}", info.backend, info.driver, info.driver_info)
                    .trim()
                    .to_owned()
            }
        };
        Some(s)
    }
}
