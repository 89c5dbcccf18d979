use crate::{Quaternion, RotationVector, Transform4};
use nalgebra::{Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// One 6-DoF sample from the tracking camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerPose {
    pub translation: Vector3<f64>,
    pub rotation: Quaternion,
}

impl TrackerPose {
    pub fn new(translation: Vector3<f64>, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// `[x, y, z, 1]`.
    pub fn homogeneous_translation(&self) -> Vector4<f64> {
        self.translation.push(1.0)
    }

    /// Tracker body pose in the tracker's own reference frame.
    pub fn to_transform(&self) -> Transform4 {
        Transform4::from_parts(&self.rotation.to_rotation_matrix(), &self.translation)
    }
}

/// Pose of a marker relative to the color camera, as the marker detector
/// reports it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    pub rotation: RotationVector,
    pub translation: Vector3<f64>,
}

impl MarkerPose {
    pub fn new(rotation: RotationVector, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }
}
