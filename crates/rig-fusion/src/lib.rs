//! Fuse a fiducial-marker color camera with a 6-DoF tracking camera.
//!
//! Calibration runs once: with the rig held level and a marker in view, the
//! [`CalibrationEngine`] freezes the tracker→world transform. From then on a
//! [`PoseEstimator`] turns every tracker pose into a position in the
//! marker-defined world frame without looking at the marker again.
//!
//! ```no_run
//! use rig_fusion::{
//!     CalibrationEngine, CalibrationSettings, FusionConfig, PoseEstimator, RetryPolicy,
//!     SensorRig, FrameSource,
//! };
//! use rig_fusion::aruco::SquareMarkerLocator;
//! use rig_fusion::replay::Recording;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = FusionConfig::load_json("fusion.json")?;
//! let (color, pose) = Recording::load_json("session/recording.json")?.into_streams();
//! let mut rig = SensorRig::open(color, pose, &cfg.stream)?;
//!
//! let locator = SquareMarkerLocator::from_dictionary_file(
//!     &cfg.marker.dictionary,
//!     cfg.marker.dictionary_path.as_deref(),
//!     rig.intrinsics(),
//!     cfg.marker.locator_params(),
//! )?;
//! let mut engine = CalibrationEngine::new(CalibrationSettings::from(&cfg.calibration));
//! engine.run_calibration(&mut rig, &locator, &RetryPolicy::from(&cfg.calibration), |_| false)?;
//!
//! let estimator = PoseEstimator::new(&engine, &locator);
//! while let Some(p) = estimator.poll(&mut rig).location() {
//!     println!("{:.3} {:.3} {:.3}", p.x, p.y, p.z);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `rig_fusion::core`: rotations, transforms, frame chain, intrinsics.
//! - `rig_fusion::aruco`: marker dictionaries and the square-marker locator.
//! - `rig_fusion::replay` (feature `image`): recorded sessions as sensor streams.

pub use rig_fusion_aruco as aruco;
pub use rig_fusion_core as core;

mod config;
mod engine;
mod error;
mod estimator;
mod source;

#[cfg(feature = "image")]
pub mod replay;

pub use config::{CalibrationConfig, ConfigError, FusionConfig, MarkerConfig, StreamConfig};
pub use engine::{
    attitude_gate_passes, CalibrationEngine, CalibrationOutcome, CalibrationSettings,
    CalibrationState, CalibrationTick, FixedTransforms, RetryPolicy,
};
pub use error::FusionError;
pub use estimator::{Estimate, InvalidReason, PoseEstimator};
pub use source::{ColorStream, FrameSource, PoseStream, SensorRig, SourceError};

impl From<&CalibrationConfig> for CalibrationSettings {
    fn from(cfg: &CalibrationConfig) -> Self {
        Self {
            attitude_threshold_deg: cfg.attitude_threshold_deg,
            rig_transform: cfg.rig_transform(),
        }
    }
}

impl From<&CalibrationConfig> for RetryPolicy {
    fn from(cfg: &CalibrationConfig) -> Self {
        Self {
            interval: cfg.retry_interval(),
            max_attempts: cfg.max_attempts,
        }
    }
}
