//! The fixed fingerprint scene: a vertex-colored triangle on the left and a
//! rotated, flat-colored cube on the right.
//!
//! Every constant here feeds the fingerprint; changing one changes every
//! device's hash.

use crate::coords::Mat4;

/// Per-vertex positions and RGBA colors of one shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shape<const N: usize> {
    pub positions: [[f32; 3]; N],
    pub colors: [[f32; 4]; N],
}

impl<const N: usize> Shape<N> {
    pub const VERTEX_COUNT: usize = N;

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }
}

/// A shape drawn through 16-bit indices.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IndexedShape<const N: usize, const I: usize> {
    pub shape: Shape<N>,
    pub indices: [u16; I],
}

impl<const N: usize, const I: usize> IndexedShape<N, I> {
    /// Panics, at compile time when used in a constant, if an index is out of
    /// range.
    pub const fn new(shape: Shape<N>, indices: [u16; I]) -> Self {
        let mut i = 0;
        while i < I {
            assert!((indices[i] as usize) < N, "index refers to a missing vertex");
            i += 1;
        }
        Self { shape, indices }
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const LAVENDER: [f32; 4] = [0.5, 0.5, 1.0, 1.0];

pub const TRIANGLE: Shape<3> = Shape {
    positions: [[0.0, 1.0, 0.0], [-1.0, -1.0, 0.0], [1.0, -1.0, 0.0]],
    colors: [RED, GREEN, BLUE],
};

pub const CUBE: IndexedShape<8, 36> = IndexedShape::new(
    Shape {
        positions: [
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
        ],
        colors: [LAVENDER; 8],
    },
    [
        0, 1, 2, 2, 3, 0, // front
        1, 5, 6, 6, 2, 1, // right
        7, 6, 5, 5, 4, 7, // back
        4, 0, 3, 3, 7, 4, // left
        4, 5, 1, 1, 0, 4, // bottom
        3, 2, 6, 6, 7, 3, // top
    ],
);

/// 45° vertical field of view, square aspect, near 0.1, far 100.
///
/// Kept as literal values; recomputing it would not be bit-identical.
#[rustfmt::skip]
pub const PROJECTION: Mat4 = Mat4::from_cols_array([
    2.414_213_657_379_150_390_63, 0.0, 0.0, 0.0,
    0.0, 2.414_213_657_379_150_390_63, 0.0, 0.0,
    0.0, 0.0, -1.002_002_000_808_715_820_31, -1.0,
    0.0, 0.0, -0.200_200_200_080_871_582_031, 0.0,
]);

pub const TRIANGLE_MODEL_VIEW: Mat4 = Mat4::translation(-1.5, 0.0, -7.0);

/// Cube placement before the per-frame rotation.
pub const CUBE_MODEL_VIEW: Mat4 = Mat4::translation(0.0, 0.0, -9.0);

pub const CUBE_ROTATION_Z_DEG: f32 = 60.0;
pub const CUBE_ROTATION_Y_DEG: f32 = 10.0;

/// Transparent black.
pub const CLEAR_COLOR: [f32; 4] = [0.0; 4];

/// Cube model-view for the current frame.
///
/// Both rotations post-multiply the base placement, so in model space the
/// cube turns about Z first and about Y second.
pub fn cube_model_view() -> Mat4 {
    CUBE_MODEL_VIEW
        .rotated(CUBE_ROTATION_Z_DEG, 0.0, 0.0, 1.0)
        .rotated(CUBE_ROTATION_Y_DEG, 0.0, 1.0, 0.0)
}
