use crate::config::CapabilityRequest;
use crate::device::WgpuOptions;

/// Parameters of one probe run.
///
/// The defaults are the values fingerprints are collected with; changing any
/// of them yields incomparable images.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub width: u32,
    pub height: u32,

    /// Exact RGBA sizes plus minimum depth/stencil.
    pub request: CapabilityRequest,

    /// Adapter selection for the wgpu driver.
    pub gpu: WgpuOptions,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            width: 250,
            height: 250,
            request: CapabilityRequest::default(),
            gpu: WgpuOptions::default(),
        }
    }
}
