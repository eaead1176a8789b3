//! Recording driver for tests.
//!
//! Advertises a scripted configuration list, enumerates it in declaration
//! order, logs every call, and fakes a framebuffer whose contents depend only
//! on the commands issued since the last clear.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result, bail, ensure};

use crate::coords::Mat4;

use super::driver::{
    Binding, BufferTarget, Capability, ClearMask, ConfigAttrib, ConfigAttribs, ConfigDesc, Driver,
    Gl, ProgramSource, StringName,
};
use super::handle::{
    AttribLocation, BufferId, ConfigId, ContextId, ProgramId, SurfaceId, UniformLocation,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Initialize,
    ChooseConfigs(ConfigAttribs),
    CreateContext(ConfigId),
    CreatePbufferSurface { config: ConfigId, width: u32, height: u32 },
    MakeCurrent(Option<Binding>),
    DestroySurface(SurfaceId),
    DestroyContext(ContextId),
    Terminate,

    CreateProgram,
    UseProgram(ProgramId),
    EnableVertexAttribArray(AttribLocation),
    CreateBuffer(BufferTarget, usize),
    VertexAttribPointer(AttribLocation, BufferId, u32),
    UniformMatrix4(UniformLocation, Mat4),
    ClearColor([f32; 4]),
    Enable(Capability),
    Clear(ClearMask),
    DrawArrays(u32, u32),
    DrawElements(BufferId, u32),
    ReadPixels(u32, u32),
}

impl Call {
    /// Display/context/surface calls, as opposed to commands.
    pub(crate) fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Call::Initialize
                | Call::ChooseConfigs(_)
                | Call::CreateContext(_)
                | Call::CreatePbufferSurface { .. }
                | Call::MakeCurrent(_)
                | Call::DestroySurface(_)
                | Call::DestroyContext(_)
                | Call::Terminate
        )
    }
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

pub(crate) fn lifecycle(log: &CallLog) -> Vec<Call> {
    log.borrow().iter().filter(|c| c.is_lifecycle()).cloned().collect()
}

pub(crate) fn count(log: &CallLog, pred: impl Fn(&Call) -> bool) -> usize {
    log.borrow().iter().filter(|c| pred(c)).count()
}

/// Single-sampled or multisampled RGBA8 configuration.
pub(crate) fn rgba8(depth: u32, stencil: u32, samples: u32) -> ConfigDesc {
    ConfigDesc {
        red: 8,
        green: 8,
        blue: 8,
        alpha: 8,
        depth,
        stencil,
        samples,
        programmable: true,
    }
}

struct MockProgram {
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

pub(crate) struct MockDriver {
    configs: Vec<ConfigDesc>,
    log: CallLog,

    pub fail_initialize: bool,
    pub fail_link: bool,
    pub fail_surface: bool,

    initialized: bool,
    next_handle: u32,
    contexts: HashMap<ContextId, ConfigId>,
    surfaces: HashMap<SurfaceId, (u32, u32)>,
    programs: HashMap<ProgramId, MockProgram>,
    current: Option<Binding>,
    draws_since_clear: u32,
}

impl MockDriver {
    pub(crate) fn new(configs: Vec<ConfigDesc>) -> Self {
        Self {
            configs,
            log: Rc::new(RefCell::new(Vec::new())),
            fail_initialize: false,
            fail_link: false,
            fail_surface: false,
            initialized: false,
            next_handle: 1,
            contexts: HashMap::new(),
            surfaces: HashMap::new(),
            programs: HashMap::new(),
            current: None,
            draws_since_clear: 0,
        }
    }

    pub(crate) fn log(&self) -> CallLog {
        Rc::clone(&self.log)
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn alloc(&mut self) -> u32 {
        let raw = self.next_handle;
        self.next_handle += 1;
        raw
    }
}

impl Gl for MockDriver {
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId> {
        self.record(Call::CreateProgram);
        ensure!(self.current.is_some(), "no current context");
        if self.fail_link {
            bail!("program {} failed to link", source.label);
        }
        let id = ProgramId::from_raw(self.alloc());
        self.programs.insert(
            id,
            MockProgram {
                attributes: source.attributes.iter().map(|a| a.name.to_owned()).collect(),
                uniforms: source.uniforms.iter().map(|u| (*u).to_owned()).collect(),
            },
        );
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(Call::UseProgram(program));
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        let p = self.programs.get(&program)?;
        let index = p.attributes.iter().position(|a| a == name)?;
        Some(AttribLocation::from_raw(index as u32))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(&program)?;
        let index = p.uniforms.iter().position(|u| u == name)?;
        Some(UniformLocation::from_raw(index as u32))
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.record(Call::EnableVertexAttribArray(location));
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
        self.record(Call::CreateBuffer(target, data.len()));
        Ok(BufferId::from_raw(self.alloc()))
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        buffer: BufferId,
        components: u32,
    ) {
        self.record(Call::VertexAttribPointer(location, buffer, components));
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &Mat4) {
        self.record(Call::UniformMatrix4(location, *value));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.record(Call::ClearColor(rgba));
    }

    fn enable(&mut self, capability: Capability) {
        self.record(Call::Enable(capability));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.record(Call::Clear(mask));
        if mask.color {
            self.draws_since_clear = 0;
        }
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        self.record(Call::DrawArrays(first, count));
        self.draws_since_clear += 1;
    }

    fn draw_elements(&mut self, indices: BufferId, count: u32) {
        self.record(Call::DrawElements(indices, count));
        self.draws_since_clear += 1;
    }

    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>> {
        self.record(Call::ReadPixels(width, height));
        let binding = self.current.context("no current context")?;
        let (sw, sh) = self.surfaces[&binding.surface];
        ensure!(width <= sw && height <= sh, "read outside surface");

        // Bottom-first rows: byte 1 of every pixel is its GL row index.
        let mut out = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            for x in 0..width {
                out.extend_from_slice(&[x as u8, row as u8, self.draws_since_clear as u8, 255]);
            }
        }
        Ok(out)
    }

    fn get_string(&self, name: StringName) -> Option<String> {
        let s = match name {
            StringName::Vendor => "mock vendor",
            StringName::Renderer => "mock renderer",
            StringName::Version => "mock 1.0",
        };
        Some(s.to_owned())
    }
}

impl Driver for MockDriver {
    fn initialize(&mut self) -> Result<()> {
        self.record(Call::Initialize);
        if self.fail_initialize {
            bail!("no display");
        }
        self.initialized = true;
        Ok(())
    }

    fn choose_configs(&self, attribs: &ConfigAttribs) -> Vec<ConfigId> {
        self.record(Call::ChooseConfigs(*attribs));
        if !self.initialized {
            return Vec::new();
        }
        self.configs
            .iter()
            .enumerate()
            .filter(|(_, c)| attribs.matches(c))
            .map(|(i, _)| ConfigId::from_raw(i as u32))
            .collect()
    }

    fn config_attrib(&self, config: ConfigId, attrib: ConfigAttrib) -> Option<u32> {
        self.configs.get(config.raw() as usize).map(|c| c.attrib(attrib))
    }

    fn create_context(&mut self, config: ConfigId) -> Result<ContextId> {
        self.record(Call::CreateContext(config));
        ensure!(self.initialized, "display not initialized");
        let id = ContextId::from_raw(self.alloc());
        self.contexts.insert(id, config);
        Ok(id)
    }

    fn create_pbuffer_surface(
        &mut self,
        context: ContextId,
        config: ConfigId,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId> {
        self.record(Call::CreatePbufferSurface { config, width, height });
        ensure!(self.contexts.get(&context) == Some(&config), "config mismatch");
        if self.fail_surface {
            bail!("pbuffer allocation failed");
        }
        let id = SurfaceId::from_raw(self.alloc());
        self.surfaces.insert(id, (width, height));
        Ok(id)
    }

    fn make_current(&mut self, binding: Option<Binding>) -> Result<()> {
        self.record(Call::MakeCurrent(binding));
        if let Some(b) = binding {
            ensure!(self.surfaces.contains_key(&b.surface), "unknown surface");
            ensure!(self.contexts.contains_key(&b.context), "unknown context");
        }
        self.current = binding;
        Ok(())
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()> {
        self.record(Call::DestroySurface(surface));
        self.surfaces.remove(&surface).map(|_| ()).context("unknown surface")
    }

    fn destroy_context(&mut self, context: ContextId) -> Result<()> {
        self.record(Call::DestroyContext(context));
        self.contexts.remove(&context).map(|_| ()).context("unknown context")
    }

    fn terminate(&mut self) -> Result<()> {
        self.record(Call::Terminate);
        self.initialized = false;
        self.current = None;
        Ok(())
    }
}

/// Initialized mock with one RGBA8 configuration and a `width`x`height`
/// pbuffer already current.
pub(crate) fn bound(width: u32, height: u32) -> (MockDriver, Binding) {
    let mut driver = MockDriver::new(vec![rgba8(24, 8, 4)]);
    driver.initialize().unwrap();
    let config = ConfigId::from_raw(0);
    let context = driver.create_context(config).unwrap();
    let surface = driver.create_pbuffer_surface(context, config, width, height).unwrap();
    let binding = Binding { surface, context };
    driver.make_current(Some(binding)).unwrap();
    (driver, binding)
}
