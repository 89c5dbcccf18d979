//! Frame composition between marker, color camera and tracking camera.
//!
//! Naming follows `a_to_b`: the transform maps coordinates expressed in frame
//! `a` into frame `b`. Chains compose right to left, `compose(A, B) = A @ B`.

use crate::{FrameError, MarkerPose, RotationVector, TrackerPose, Transform4};
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-convention change between the tracking camera and the color camera:
/// a half turn about x, `diag(1, -1, -1, 1)`.
///
/// The tracking camera keeps a gravity-aligned frame that does not follow its
/// own attitude, while the color camera frame is body fixed with y pointing
/// down and z forward. For co-mounted sensors held level this is the only
/// difference between the two frames; the small lever arm between the optical
/// centres is ignored.
pub fn rig_axis_flip() -> Transform4 {
    Transform4::new(Matrix4::from_diagonal(&nalgebra::Vector4::new(
        1.0, -1.0, -1.0, 1.0,
    )))
}

/// How the tracker→camera transform is obtained at calibration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigTransformStrategy {
    /// The constant [`rig_axis_flip`].
    #[default]
    FixedAxisFlip,
    /// Experimental: undo the tracker's pose at the calibration instant, then
    /// apply the axis flip. Not validated against hardware.
    TrackerPose,
}

impl RigTransformStrategy {
    pub fn from_use_default(use_default: bool) -> Self {
        if use_default {
            Self::FixedAxisFlip
        } else {
            Self::TrackerPose
        }
    }
}

/// Embed a Rodrigues rotation and a translation into a homogeneous transform.
pub fn rotation_translation_to_transform(
    rvec: &RotationVector,
    tvec: &Vector3<f64>,
) -> Transform4 {
    Transform4::from_parts(&rvec.to_rotation_matrix(), tvec)
}

pub fn invert(t: &Transform4) -> Result<Transform4, FrameError> {
    t.try_inverse()
}

pub fn compose(a: &Transform4, b: &Transform4) -> Transform4 {
    a.compose(b)
}

/// Camera expressed in the marker frame.
///
/// The detector reports the marker as seen from the camera; this inverts it.
pub fn camera_to_marker_transform(pose: &MarkerPose) -> Result<Transform4, FrameError> {
    invert(&rotation_translation_to_transform(
        &pose.rotation,
        &pose.translation,
    ))
}

pub fn tracker_to_camera_transform(
    strategy: RigTransformStrategy,
    tracker: &TrackerPose,
) -> Result<Transform4, FrameError> {
    match strategy {
        RigTransformStrategy::FixedAxisFlip => Ok(rig_axis_flip()),
        RigTransformStrategy::TrackerPose => {
            let body = invert(&tracker.to_transform())?;
            Ok(compose(&body, &rig_axis_flip()))
        }
    }
}

/// `camera_to_marker @ tracker_to_camera`.
pub fn tracker_to_world_transform(
    camera_to_marker: &Transform4,
    tracker_to_camera: &Transform4,
) -> Transform4 {
    compose(camera_to_marker, tracker_to_camera)
}
