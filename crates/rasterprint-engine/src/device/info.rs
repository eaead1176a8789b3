use super::driver::{Gl, StringName};

/// Identification strings reported by the current context.
///
/// The fingerprint consumer stores these next to the image hash so that
/// identical hashes can be grouped by renderer.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    pub renderer: String,
    pub vendor: String,
    pub version: String,
}

impl DeviceInfo {
    /// Reads all identification strings; missing ones become empty.
    pub fn query(gl: &dyn Gl) -> Self {
        let get = |name| gl.get_string(name).unwrap_or_default();
        Self {
            renderer: get(StringName::Renderer),
            vendor: get(StringName::Vendor),
            version: get(StringName::Version),
        }
    }
}
