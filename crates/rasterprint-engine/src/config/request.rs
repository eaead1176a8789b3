use crate::device::ConfigDesc;

/// Capabilities the rendering surface must provide.
///
/// Channel sizes are exact-match targets; depth and stencil are minimums.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CapabilityRequest {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
    pub depth: u32,
    pub stencil: u32,
}

impl CapabilityRequest {
    pub const fn new(
        red: u32,
        green: u32,
        blue: u32,
        alpha: u32,
        depth: u32,
        stencil: u32,
    ) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
            depth,
            stencil,
        }
    }

    /// 8 bits per channel with the given depth/stencil minimums.
    pub const fn rgba8(depth: u32, stencil: u32) -> Self {
        Self::new(8, 8, 8, 8, depth, stencil)
    }

    /// Acceptance rule applied to each queried configuration.
    pub fn accepts(&self, desc: &ConfigDesc) -> bool {
        desc.depth >= self.depth
            && desc.stencil >= self.stencil
            && desc.red == self.red
            && desc.green == self.green
            && desc.blue == self.blue
            && desc.alpha == self.alpha
    }
}

impl Default for CapabilityRequest {
    fn default() -> Self {
        Self::rgba8(0, 0)
    }
}
