//! Coordinate-space math shared by the scene and its tests.
//!
//! Conventions (GL style):
//! - matrices are 4x4, single precision, column-major
//! - vectors are columns; `a * b` applies `b` first
//! - angles are in degrees

mod mat4;

pub use mat4::Mat4;
