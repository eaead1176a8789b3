//! Opaque resource handles.
//!
//! Each resource category gets its own type so a buffer handle can never be
//! passed where a program handle is expected. Drivers mint them with
//! `from_raw`; the pipeline only moves them around.

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// One driver-advertised surface configuration.
    ConfigId
);
handle!(
    /// A rendering context bound to exactly one configuration.
    ContextId
);
handle!(
    /// An off-screen (buffer-backed) render target.
    SurfaceId
);
handle!(
    /// A linked vertex + fragment program.
    ProgramId
);
handle!(
    /// GPU-resident vertex, color or index data.
    BufferId
);
handle!(
    /// Vertex attribute slot of a linked program.
    AttribLocation
);
handle!(
    /// Uniform slot of a linked program.
    UniformLocation
);
