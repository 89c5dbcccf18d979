use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Errors raised by frame algebra.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("transform is singular and cannot be inverted")]
    Singular,
    #[error("transform contains non-finite entries")]
    NonFinite,
}

/// Homogeneous 4×4 transform.
///
/// Upper-left 3×3 block is the rotation, rows 0..3 of the last column are the
/// translation, the bottom row is `[0, 0, 0, 1]` for every transform built by
/// this crate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 4]; 4]", into = "[[f64; 4]; 4]")]
pub struct Transform4 {
    m: Matrix4<f64>,
}

impl Transform4 {
    pub fn new(m: Matrix4<f64>) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    pub fn from_parts(rotation: &Rotation3<f64>, translation: &Vector3<f64>) -> Self {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation.matrix());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self::new(m)
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        let mut m = Matrix4::zeros();
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                m[(r, c)] = *v;
            }
        }
        Self::new(m)
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.m[(r, c)];
            }
        }
        rows
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.m
    }

    pub fn rotation_block(&self) -> Matrix3<f64> {
        self.m.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.m.fixed_view::<3, 1>(0, 3).into_owned()
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }

    /// Full matrix inverse.
    pub fn try_inverse(&self) -> Result<Self, FrameError> {
        if !self.is_finite() {
            return Err(FrameError::NonFinite);
        }
        let inv = self.m.try_inverse().ok_or(FrameError::Singular)?;
        let out = Self::new(inv);
        if out.is_finite() {
            Ok(out)
        } else {
            Err(FrameError::Singular)
        }
    }

    /// `self @ rhs`: apply `rhs` first, then `self`.
    pub fn compose(&self, rhs: &Self) -> Self {
        Self::new(self.m * rhs.m)
    }

    /// Multiply by a homogeneous vector and return the first three rows.
    ///
    /// No division by the homogeneous coordinate: rigid transforms keep it at 1.
    pub fn apply_homogeneous(&self, v: &Vector4<f64>) -> Vector3<f64> {
        let out = self.m * v;
        Vector3::new(out.x, out.y, out.z)
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.apply_homogeneous(&p.push(1.0))
    }

    /// Element-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Default for Transform4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform4 {
    type Output = Transform4;

    fn mul(self, rhs: Transform4) -> Transform4 {
        self.compose(&rhs)
    }
}

impl From<[[f64; 4]; 4]> for Transform4 {
    fn from(rows: [[f64; 4]; 4]) -> Self {
        Self::from_rows(rows)
    }
}

impl From<Transform4> for [[f64; 4]; 4] {
    fn from(t: Transform4) -> Self {
        t.to_rows()
    }
}
