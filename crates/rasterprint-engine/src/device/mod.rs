//! GPU driver abstraction.
//!
//! This module is responsible for:
//! - the display/context/surface lifecycle contract (`Driver`)
//! - the immediate-mode command contract used while a context is current (`Gl`)
//! - strongly-typed resource handles shared by both
//! - the wgpu-backed driver that ships with the crate (`gpu`)

mod driver;
mod handle;
mod info;
pub mod gpu;

#[cfg(test)]
pub(crate) mod mock;

pub use driver::{
    Binding, BufferTarget, Capability, ClearMask, ConfigAttrib, ConfigAttribs, ConfigDesc, Driver,
    Gl, ProgramSource, StringName, VertexAttrib,
};
pub use gpu::{WgpuDriver, WgpuOptions};
pub use handle::{
    AttribLocation, BufferId, ConfigId, ContextId, ProgramId, SurfaceId, UniformLocation,
};
pub use info::DeviceInfo;
