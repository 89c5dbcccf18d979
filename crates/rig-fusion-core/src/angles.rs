//! Quaternion to roll/pitch/yaw conversion.

use crate::Quaternion;
use serde::{Deserialize, Serialize};

/// Euler angles in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RollPitchYaw {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl RollPitchYaw {
    /// The larger of roll and yaw. Pitch does not take part in the tilt check.
    pub fn max_roll_yaw(&self) -> f64 {
        self.roll.max(self.yaw)
    }
}

/// Convert a tracker quaternion into roll/pitch/yaw in degrees.
///
/// The input is used as-is: a quaternion that is not unit length can push
/// the `asin` argument out of `[-1, 1]` and yield a NaN pitch. Roll and yaw
/// come from `atan2` and stay finite for finite input.
pub fn quaternion_to_roll_pitch_yaw(q: &Quaternion) -> RollPitchYaw {
    let Quaternion { x, y, z, w } = *q;
    let pitch = -(2.0 * (x * z - w * y)).asin().to_degrees();
    let roll = (2.0 * (w * x + y * z))
        .atan2(w * w - x * x - y * y + z * z)
        .to_degrees();
    let yaw = (2.0 * (w * z + x * y))
        .atan2(w * w + x * x - y * y - z * z)
        .to_degrees();
    RollPitchYaw { roll, pitch, yaw }
}
