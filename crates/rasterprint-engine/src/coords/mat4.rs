use std::ops::Mul;

use bytemuck::{Pod, Zeroable};

/// 4x4 column-major single-precision matrix.
///
/// Element `(row, col)` lives at `cols[col * 4 + row]`, the layout GL uniform
/// uploads expect with `transpose = false`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    cols: [f32; 16],
}

impl Mat4 {
    pub const IDENTITY: Self = Self::from_cols_array([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub const ZERO: Self = Self::from_cols_array([0.0; 16]);

    #[inline]
    pub const fn from_cols_array(cols: [f32; 16]) -> Self {
        Self { cols }
    }

    #[inline]
    pub const fn to_cols_array(&self) -> [f32; 16] {
        self.cols
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.cols[col * 4 + row]
    }

    /// Pure translation matrix.
    pub const fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[12] = x;
        m.cols[13] = y;
        m.cols[14] = z;
        m
    }

    /// Rotation of `angle_deg` degrees about the axis `(x, y, z)`.
    ///
    /// Unit coordinate axes take an exact path (no normalization, no cross terms)
    /// so the result is bit-identical to what mobile GL helper libraries produce.
    /// Sine and cosine are evaluated in double precision and narrowed, also to
    /// match them.
    pub fn rotation(angle_deg: f32, x: f32, y: f32, z: f32) -> Self {
        let a = angle_deg * (std::f64::consts::PI / 180.0) as f32;
        let s = f64::from(a).sin() as f32;
        let c = f64::from(a).cos() as f32;

        let mut m = Self::IDENTITY;
        let r = &mut m.cols;

        if (x, y, z) == (1.0, 0.0, 0.0) {
            r[5] = c;
            r[10] = c;
            r[6] = s;
            r[9] = -s;
        } else if (x, y, z) == (0.0, 1.0, 0.0) {
            r[0] = c;
            r[10] = c;
            r[8] = s;
            r[2] = -s;
        } else if (x, y, z) == (0.0, 0.0, 1.0) {
            r[0] = c;
            r[5] = c;
            r[1] = s;
            r[4] = -s;
        } else {
            let len = f64::from(x * x + y * y + z * z).sqrt() as f32;
            let (x, y, z) = if len != 1.0 {
                let inv = 1.0 / len;
                (x * inv, y * inv, z * inv)
            } else {
                (x, y, z)
            };

            let nc = 1.0 - c;
            let (xy, yz, zx) = (x * y, y * z, z * x);
            let (xs, ys, zs) = (x * s, y * s, z * s);

            r[0] = x * x * nc + c;
            r[4] = xy * nc - zs;
            r[8] = zx * nc + ys;
            r[1] = xy * nc + zs;
            r[5] = y * y * nc + c;
            r[9] = yz * nc - xs;
            r[2] = zx * nc - ys;
            r[6] = yz * nc + xs;
            r[10] = z * z * nc + c;
        }

        m
    }

    /// Returns `self * rotation(angle_deg, axis)`.
    ///
    /// The rotation acts in the matrix's local (model) space: it is applied to
    /// vertices before everything already accumulated in `self`.
    #[inline]
    pub fn rotated(&self, angle_deg: f32, x: f32, y: f32, z: f32) -> Self {
        *self * Self::rotation(angle_deg, x, y, z)
    }

    /// Multiplies a homogeneous column vector.
    pub fn transform(&self, v: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.at(row, 0) * v[0]
                + self.at(row, 1) * v[1]
                + self.at(row, 2) * v[2]
                + self.at(row, 3) * v[3];
        }
        out
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    /// Column-major product.
    ///
    /// Accumulates `lhs(row, 0) * rhs(0, col)` first and then adds terms 1..3 in
    /// order; the fixed summation order keeps results reproducible bit for bit.
    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut acc = self.at(row, 0) * rhs.at(0, col);
                for k in 1..4 {
                    acc += self.at(row, k) * rhs.at(k, col);
                }
                out[col * 4 + row] = acc;
            }
        }
        Mat4::from_cols_array(out)
    }
}
