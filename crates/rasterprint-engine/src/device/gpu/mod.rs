//! wgpu-backed driver.
//!
//! Emulates an EGL + GLES2 pbuffer pipeline on top of wgpu:
//! - display = Instance + Adapter, requested headlessly
//! - configurations = renderable color/depth/sample-count combinations
//! - context = Device + Queue; pbuffer = off-screen textures
//! - commands are recorded per context and flushed into render passes at
//!   readback, unbind or teardown

mod commands;
mod configs;
mod context;
mod program;
mod readback;
mod target;

use std::collections::HashMap;

use anyhow::{Context, Result, ensure};

use crate::device::{
    Binding, ConfigAttrib, ConfigAttribs, ConfigId, ContextId, Driver, SurfaceId,
};

use configs::GpuConfig;
use context::GpuContext;
use target::OffscreenTarget;

/// Adapter selection parameters.
///
/// Keep this structure small; the pipeline itself is configured through
/// `CapabilityRequest`.
#[derive(Debug, Clone)]
pub struct WgpuOptions {
    /// Backends wgpu may pick the adapter from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Force a software adapter when one is available.
    pub force_fallback_adapter: bool,
}

impl Default for WgpuOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

struct Display {
    /// Kept alive for the adapter.
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
}

/// `Driver` implementation backed by wgpu.
pub struct WgpuDriver {
    options: WgpuOptions,
    display: Option<Display>,
    configs: Vec<GpuConfig>,
    contexts: HashMap<ContextId, GpuContext>,
    surfaces: HashMap<SurfaceId, OffscreenTarget>,
    current: Option<Binding>,
    next_handle: u32,
}

impl WgpuDriver {
    pub fn new(options: WgpuOptions) -> Self {
        Self {
            options,
            display: None,
            configs: Vec::new(),
            contexts: HashMap::new(),
            surfaces: HashMap::new(),
            current: None,
            next_handle: 1,
        }
    }

    /// Adapter information, once the display is initialized.
    pub fn adapter_info(&self) -> Option<wgpu::AdapterInfo> {
        self.display.as_ref().map(|d| d.adapter.get_info())
    }

    fn alloc_handle(&mut self) -> u32 {
        let raw = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        raw
    }

    fn config(&self, config: ConfigId) -> Result<GpuConfig> {
        self.configs
            .get(config.raw() as usize)
            .copied()
            .with_context(|| format!("unknown surface configuration {config:?}"))
    }

    /// Drops everything that belongs to `context`, flushing first if bound.
    fn release_context(&mut self, context: ContextId) -> Result<()> {
        if self.current.is_some_and(|b| b.context == context) {
            self.flush()?;
            log::warn!("destroying context {context:?} while current; unbinding");
            self.current = None;
        }
        self.contexts
            .remove(&context)
            .map(|_| ())
            .with_context(|| format!("unknown context {context:?}"))
    }
}

impl Default for WgpuDriver {
    fn default() -> Self {
        Self::new(WgpuOptions::default())
    }
}

impl Driver for WgpuDriver {
    fn initialize(&mut self) -> Result<()> {
        if self.display.is_some() {
            return Ok(());
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.options.backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.options.power_preference,
            compatible_surface: None,
            force_fallback_adapter: self.options.force_fallback_adapter,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!(
            "display initialized: {} ({:?}, {})",
            info.name,
            info.backend,
            info.driver
        );

        self.configs = configs::enumerate(&adapter);
        self.display = Some(Display {
            _instance: instance,
            adapter,
        });
        Ok(())
    }

    fn choose_configs(&self, attribs: &ConfigAttribs) -> Vec<ConfigId> {
        if self.display.is_none() {
            return Vec::new();
        }
        configs::select(&self.configs, attribs)
            .into_iter()
            .map(|i| ConfigId::from_raw(i as u32))
            .collect()
    }

    fn config_attrib(&self, config: ConfigId, attrib: ConfigAttrib) -> Option<u32> {
        self.configs
            .get(config.raw() as usize)
            .map(|c| c.desc.attrib(attrib))
    }

    fn create_context(&mut self, config: ConfigId) -> Result<ContextId> {
        let gpu_config = self.config(config)?;
        let display = self.display.as_ref().context("display not initialized")?;
        let context = GpuContext::new(&display.adapter, config, gpu_config)?;

        let id = ContextId::from_raw(self.alloc_handle());
        log::debug!("created context {id:?} for {:?}", gpu_config.desc);
        self.contexts.insert(id, context);
        Ok(id)
    }

    fn create_pbuffer_surface(
        &mut self,
        context: ContextId,
        config: ConfigId,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId> {
        ensure!(width > 0 && height > 0, "pbuffer size must be positive");
        let ctx = self
            .contexts
            .get(&context)
            .with_context(|| format!("unknown context {context:?}"))?;
        ensure!(
            ctx.config_id == config,
            "context {context:?} was created for {:?}, not {config:?}",
            ctx.config_id
        );

        let max = ctx.device.limits().max_texture_dimension_2d;
        ensure!(
            width <= max && height <= max,
            "pbuffer {width}x{height} exceeds device limit {max}"
        );

        let target = OffscreenTarget::new(&ctx.device, context, &ctx.config, width, height);
        let id = SurfaceId::from_raw(self.alloc_handle());
        self.surfaces.insert(id, target);
        Ok(id)
    }

    fn make_current(&mut self, binding: Option<Binding>) -> Result<()> {
        // Work recorded against the old binding lands before it is released.
        self.flush()?;

        if let Some(b) = binding {
            let target = self
                .surfaces
                .get(&b.surface)
                .with_context(|| format!("unknown surface {:?}", b.surface))?;
            ensure!(
                self.contexts.contains_key(&b.context),
                "unknown context {:?}",
                b.context
            );
            ensure!(
                target.context == b.context,
                "surface {:?} belongs to another context",
                b.surface
            );
        }

        self.current = binding;
        Ok(())
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()> {
        if self.current.is_some_and(|b| b.surface == surface) {
            self.flush()?;
            log::warn!("destroying surface {surface:?} while current; unbinding");
            self.current = None;
        }
        self.surfaces
            .remove(&surface)
            .map(|_| ())
            .with_context(|| format!("unknown surface {surface:?}"))
    }

    fn destroy_context(&mut self, context: ContextId) -> Result<()> {
        self.release_context(context)
    }

    fn terminate(&mut self) -> Result<()> {
        if self.current.is_some() {
            self.flush()?;
            self.current = None;
        }
        if !self.surfaces.is_empty() || !self.contexts.is_empty() {
            log::warn!(
                "terminating with {} surfaces and {} contexts still alive",
                self.surfaces.len(),
                self.contexts.len()
            );
        }
        self.surfaces.clear();
        self.contexts.clear();
        self.configs.clear();
        self.display = None;
        log::debug!("display terminated");
        Ok(())
    }
}
