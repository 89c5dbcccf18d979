//! Rotation representations emitted by the two sensors.
//!
//! The tracking camera reports unit quaternions, the marker detector reports
//! axis-angle rotation vectors. The two are distinct types and every
//! conversion between them is an explicit, named call.

use nalgebra::{Quaternion as NaQuaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Quaternion in tracker component order `(x, y, z, w)`.
///
/// Values are taken as reported by the driver; no renormalization happens on
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Normalized nalgebra quaternion.
    pub fn to_unit(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(NaQuaternion::new(self.w, self.x, self.y, self.z))
    }

    pub fn from_unit(q: &UnitQuaternion<f64>) -> Self {
        let c = q.quaternion().coords;
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn to_rotation_matrix(&self) -> Rotation3<f64> {
        self.to_unit().to_rotation_matrix()
    }

    pub fn to_rotation_vector(&self) -> RotationVector {
        RotationVector(self.to_unit().scaled_axis())
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-angle rotation: direction is the axis, norm is the angle in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RotationVector(pub Vector3<f64>);

impl RotationVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn zero() -> Self {
        Self(Vector3::zeros())
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.0.norm()
    }

    /// Rodrigues: `R = I + sin(θ) K + (1 - cos(θ)) K²` with `K = [axis]ₓ`.
    pub fn to_rotation_matrix(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.0)
    }

    /// Goes through a unit quaternion so half-turns keep their axis.
    pub fn from_rotation_matrix(r: &Rotation3<f64>) -> Self {
        Self(UnitQuaternion::from_rotation_matrix(r).scaled_axis())
    }

    pub fn to_quaternion(&self) -> Quaternion {
        Quaternion::from_unit(&UnitQuaternion::from_scaled_axis(self.0))
    }
}
