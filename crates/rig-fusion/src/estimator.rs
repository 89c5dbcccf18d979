//! Steady-state world-frame position from tracker poses.

use crate::engine::CalibrationEngine;
use crate::source::FrameSource;
use nalgebra::{Vector3, Vector4};
use rig_fusion_aruco::MarkerLocator;
use rig_fusion_core::frames::camera_to_marker_transform;
use rig_fusion_core::BgrImage;
use std::fmt;

/// Why a poll produced no estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    /// Polled before calibration completed.
    NotCalibrated,
    /// The tracker or color read failed.
    SensorRead,
    /// The transformed position is not finite.
    NonFinite,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotCalibrated => "not calibrated",
            Self::SensorRead => "sensor read failed",
            Self::NonFinite => "non-finite position",
        })
    }
}

/// Result of one poll: a location or the invalid sentinel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Estimate {
    Location {
        /// Tracker position in the marker-defined world frame.
        world: Vector3<f64>,
        /// Camera origin in the frame of the marker seen this tick (detect
        /// mode only).
        marker_relative: Option<Vector3<f64>>,
    },
    Invalid(InvalidReason),
}

impl Estimate {
    pub fn location(&self) -> Option<Vector3<f64>> {
        match self {
            Self::Location { world, .. } => Some(*world),
            Self::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Location { .. })
    }
}

/// Turns tracker poses into world positions using the frozen calibration.
///
/// Borrows the engine read-only, so the calibration cannot change while an
/// estimator is alive.
pub struct PoseEstimator<'a, L: ?Sized> {
    engine: &'a CalibrationEngine,
    locator: &'a L,
    detect_mode: bool,
}

impl<'a, L: MarkerLocator + ?Sized> PoseEstimator<'a, L> {
    pub fn new(engine: &'a CalibrationEngine, locator: &'a L) -> Self {
        Self {
            engine,
            locator,
            detect_mode: false,
        }
    }

    pub fn with_detect_mode(mut self, enabled: bool) -> Self {
        self.detect_mode = enabled;
        self
    }

    pub fn start_detect(&mut self) {
        self.detect_mode = true;
    }

    pub fn stop_detect(&mut self) {
        self.detect_mode = false;
    }

    pub fn detect_mode(&self) -> bool {
        self.detect_mode
    }

    /// Read one tracker pose and one image and return the world position.
    ///
    /// Never fails: read and numeric problems come back as
    /// [`Estimate::Invalid`] and it is up to the caller whether to keep
    /// polling.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn poll<S: FrameSource + ?Sized>(&self, source: &mut S) -> Estimate {
        let Some(tracker_to_world) = self.engine.tracker_to_world() else {
            log::error!("pose requested before calibration");
            return Estimate::Invalid(InvalidReason::NotCalibrated);
        };

        let frames = source
            .next_tracker_pose()
            .and_then(|pose| source.next_color_image().map(|image| (pose, image)));
        let (tracker, image) = match frames {
            Ok(frames) => frames,
            Err(err) => {
                log::error!("{err}");
                return Estimate::Invalid(InvalidReason::SensorRead);
            }
        };

        let world = tracker_to_world.apply_homogeneous(&tracker.homogeneous_translation());
        if !world.iter().all(|v| v.is_finite()) {
            log::error!("tracker pose produced a non-finite world position");
            return Estimate::Invalid(InvalidReason::NonFinite);
        }

        let marker_relative = if self.detect_mode {
            self.relocalize(&image)
        } else {
            None
        };

        Estimate::Location {
            world,
            marker_relative,
        }
    }

    fn relocalize(&self, image: &BgrImage) -> Option<Vector3<f64>> {
        let marker = self.locator.locate(image).into_iter().next()?;
        match camera_to_marker_transform(&marker.pose) {
            Ok(c2m) => Some(c2m.apply_homogeneous(&Vector4::new(0.0, 0.0, 0.0, 1.0))),
            Err(err) => {
                log::debug!("marker {} not usable for re-localization: {err}", marker.id);
                None
            }
        }
    }
}
