//! Core types for fusing a marker-observing color camera with a 6-DoF
//! tracking camera.
//!
//! This crate is purely geometric. It knows nothing about sensor drivers or
//! marker detection; it provides:
//! - tagged rotation types ([`Quaternion`], [`RotationVector`]) with explicit
//!   conversions,
//! - quaternion → roll/pitch/yaw ([`quaternion_to_roll_pitch_yaw`]),
//! - homogeneous transforms ([`Transform4`]) and the frame chain
//!   marker ← camera ← tracker ([`frames`]),
//! - pinhole intrinsics with Brown–Conrady distortion,
//! - planar homographies and lightweight image buffers.

mod angles;
pub mod frames;
mod homography;
mod image;
mod intrinsics;
mod logger;
mod pose;
mod rotation;
mod transform;

pub use angles::{quaternion_to_roll_pitch_yaw, RollPitchYaw};
pub use frames::{rig_axis_flip, RigTransformStrategy};
pub use homography::{homography_from_4pt, Homography};
pub use image::{BgrImage, GrayImage, GrayImageView};
pub use intrinsics::{BrownConrady, CameraIntrinsics};
pub use pose::{MarkerPose, TrackerPose};
pub use rotation::{Quaternion, RotationVector};
pub use transform::{FrameError, Transform4};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
