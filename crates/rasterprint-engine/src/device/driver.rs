use std::ops::BitOr;

use anyhow::Result;

use crate::coords::Mat4;

use super::handle::{
    AttribLocation, BufferId, ConfigId, ContextId, ProgramId, SurfaceId, UniformLocation,
};

// ── configurations ────────────────────────────────────────────────────────

/// Attributes that can be read back from an advertised configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConfigAttrib {
    RedSize,
    GreenSize,
    BlueSize,
    AlphaSize,
    DepthSize,
    StencilSize,
    /// Samples per pixel; 0 for single-sampled configurations.
    Samples,
    /// 1 when the configuration carries a multisample buffer, else 0.
    SampleBuffers,
}

/// Attribute values of one advertised configuration.
///
/// Drivers keep one of these per `ConfigId` and answer `config_attrib` from it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConfigDesc {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
    pub depth: u32,
    pub stencil: u32,
    pub samples: u32,
    /// Whether the configuration can render with programmable shaders.
    pub programmable: bool,
}

impl ConfigDesc {
    pub fn attrib(&self, attrib: ConfigAttrib) -> u32 {
        match attrib {
            ConfigAttrib::RedSize => self.red,
            ConfigAttrib::GreenSize => self.green,
            ConfigAttrib::BlueSize => self.blue,
            ConfigAttrib::AlphaSize => self.alpha,
            ConfigAttrib::DepthSize => self.depth,
            ConfigAttrib::StencilSize => self.stencil,
            ConfigAttrib::Samples => self.samples,
            ConfigAttrib::SampleBuffers => self.sample_buffers(),
        }
    }

    #[inline]
    pub fn sample_buffers(&self) -> u32 {
        u32::from(self.samples > 0)
    }

    /// Total color buffer size in bits.
    #[inline]
    pub fn buffer_size(&self) -> u32 {
        self.red + self.green + self.blue + self.alpha
    }
}

/// Query side of configuration selection.
///
/// Matching follows the EGL rules: channel sizes and sample counts are lower
/// bounds, and a query without a multisample request accepts every sample count.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConfigAttribs {
    pub red_size: u32,
    pub green_size: u32,
    pub blue_size: u32,
    /// Require the programmable-shader API tier.
    pub programmable: bool,
    /// Minimum samples per pixel; implies exactly one sample buffer.
    pub samples: Option<u32>,
}

impl ConfigAttribs {
    /// Programmable-tier query with the same floor on every color channel.
    pub const fn with_channel_floor(bits: u32) -> Self {
        Self {
            red_size: bits,
            green_size: bits,
            blue_size: bits,
            programmable: true,
            samples: None,
        }
    }

    pub const fn with_samples(mut self, samples: u32) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn matches(&self, desc: &ConfigDesc) -> bool {
        let color = desc.red >= self.red_size
            && desc.green >= self.green_size
            && desc.blue >= self.blue_size;
        let api = !self.programmable || desc.programmable;
        let multisample = match self.samples {
            Some(samples) => desc.sample_buffers() == 1 && desc.samples >= samples,
            None => true,
        };
        color && api && multisample
    }
}

/// Context + surface pair made current together.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Binding {
    pub surface: SurfaceId,
    pub context: ContextId,
}

// ── commands ──────────────────────────────────────────────────────────────

/// One vertex input of a program: name and float component count (1..=4).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttrib<'a> {
    pub name: &'a str,
    pub components: u32,
}

/// Shader sources plus the interface the program exposes.
///
/// Attribute `i` is bound to input location `i` and uniform `j` to the `j`-th
/// 4x4 matrix of the program's uniform block, in declaration order.
#[derive(Debug, Copy, Clone)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub attributes: &'a [VertexAttrib<'a>],
    pub uniforms: &'a [&'a str],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Array,
    /// 16-bit vertex indices.
    ElementArray,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Capability {
    DepthTest,
}

/// Buffers affected by `Gl::clear`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR: Self = Self { color: true, depth: false };
    pub const DEPTH: Self = Self { color: false, depth: true };
}

impl BitOr for ClearMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            color: self.color || rhs.color,
            depth: self.depth || rhs.depth,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StringName {
    Vendor,
    Renderer,
    Version,
}

/// Immediate-mode command set, valid only while a context is current.
///
/// Callers reach it through `surface::Current`, which only exists while a
/// binding is live. Commands that cannot fail at issue time return `()`;
/// drivers log and drop invalid ones the way GL records an error flag.
pub trait Gl {
    /// Compiles and links a program. `Err` covers compile and link failures.
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId>;

    fn use_program(&mut self, program: ProgramId);

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation);

    /// Uploads `data` into a new immutable GPU buffer.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId>;

    /// Sources attribute `location` from `buffer`, tightly packed floats.
    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        buffer: BufferId,
        components: u32,
    );

    /// Sets a 4x4 matrix uniform of the program in use.
    fn uniform_matrix4(&mut self, location: UniformLocation, value: &Mat4);

    fn clear_color(&mut self, rgba: [f32; 4]);

    fn enable(&mut self, capability: Capability);

    fn clear(&mut self, mask: ClearMask);

    /// Draws `count` vertices as a triangle list starting at `first`.
    fn draw_arrays(&mut self, first: u32, count: u32);

    /// Draws `count` 16-bit indices from `indices` as a triangle list.
    fn draw_elements(&mut self, indices: BufferId, count: u32);

    /// Reads the `width` x `height` region at the surface origin as RGBA8.
    ///
    /// Rows come back bottom row first, the native GL readback order.
    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>>;

    fn get_string(&self, name: StringName) -> Option<String>;
}

/// Display, configuration and context/surface lifecycle.
///
/// The call order the pipeline relies on:
/// `initialize` → `choose_configs`/`config_attrib` → `create_context` →
/// `create_pbuffer_surface` → `make_current(Some)` → (commands) →
/// `make_current(None)` → `destroy_surface` → `destroy_context` → `terminate`.
pub trait Driver: Gl {
    /// Connects to and initializes the default display.
    fn initialize(&mut self) -> Result<()>;

    /// Configurations matching `attribs`, in driver enumeration order.
    fn choose_configs(&self, attribs: &ConfigAttribs) -> Vec<ConfigId>;

    fn config_attrib(&self, config: ConfigId, attrib: ConfigAttrib) -> Option<u32>;

    fn create_context(&mut self, config: ConfigId) -> Result<ContextId>;

    /// Creates a buffer-backed surface with no window counterpart.
    fn create_pbuffer_surface(
        &mut self,
        context: ContextId,
        config: ConfigId,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId>;

    /// Binds `binding` to the calling thread, or unbinds with `None`.
    fn make_current(&mut self, binding: Option<Binding>) -> Result<()>;

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()>;

    fn destroy_context(&mut self, context: ContextId) -> Result<()>;

    /// Releases the display connection and everything still attached to it.
    fn terminate(&mut self) -> Result<()>;
}
