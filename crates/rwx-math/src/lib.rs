#![warn(missing_docs)]

//! Math types for RWX scene resolution.
//!
//! RWX composes transforms with row vectors: a point is the row
//! `[x, y, z, 1]` multiplied on the left of the matrix, translation lives in
//! the bottom row, and a new transform is stacked by left-multiplying it onto
//! the current one (`new = op * previous`).

use nalgebra::{Matrix4, RowVector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A 4x4 affine transformation matrix in row-vector convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`, stored in the bottom row.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(3, 0)] = dx;
        m[(3, 1)] = dy;
        m[(3, 2)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Build from 16 values listed row by row.
    pub fn from_row_major(values: &[f64; 16]) -> Self {
        Self {
            matrix: Matrix4::from_row_slice(values),
        }
    }

    /// Rotation about the axis `(x, y, z)` by `degrees`.
    ///
    /// The axis does not need to be normalized. Returns `None` when it has
    /// zero length.
    pub fn rotation_about_axis(x: f64, y: f64, z: f64, degrees: f64) -> Option<Self> {
        let length = (x * x + y * y + z * z).sqrt();
        if length == 0.0 || !length.is_finite() {
            return None;
        }
        let (x, y, z) = (x / length, y / length, z / length);
        let (s, c) = degrees.to_radians().sin_cos();
        let t = 1.0 - c;

        #[rustfmt::skip]
        let m = Matrix4::new(
            x * x * t + c,     y * x * t + z * s, z * x * t - y * s, 0.0,
            x * y * t - z * s, y * y * t + c,     z * y * t + x * s, 0.0,
            x * z * t + y * s, y * z * t - x * s, z * z * t + c,     0.0,
            0.0,               0.0,               0.0,               1.0,
        );
        Some(Self { matrix: m })
    }

    /// Stack `self` on top of `previous`: the result applies `self` first,
    /// then `previous` (`self * previous`).
    pub fn then(&self, previous: &Transform) -> Self {
        Self {
            matrix: self.matrix * previous.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = RowVector4::new(p.x, p.y, p.z, 1.0) * self.matrix;
        Point3::new(v[0], v[1], v[2])
    }

    /// The 16 matrix values, row by row.
    ///
    /// In row-vector convention this is also the column-major layout of the
    /// equivalent column-vector matrix.
    pub fn to_row_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = self.matrix[(row, col)];
            }
        }
        out
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
