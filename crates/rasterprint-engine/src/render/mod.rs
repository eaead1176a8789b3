//! Rendering hooks and the fixed fingerprint scene.

mod painter;
pub mod scene;

pub use painter::ScenePainter;

use crate::surface::Current;

/// Lifecycle callbacks a `PixelBuffer` drives.
///
/// Every hook runs with the buffer's context current.
pub trait Renderer {
    /// Called once, right after the renderer is installed.
    fn on_create(&mut self, gl: &mut Current<'_>);

    /// Called once after `on_create` with the fixed surface size.
    fn on_resize(&mut self, gl: &mut Current<'_>, width: u32, height: u32);

    /// Renders one frame.
    fn on_draw(&mut self, gl: &mut Current<'_>);
}
