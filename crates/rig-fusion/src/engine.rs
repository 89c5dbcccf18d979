//! Calibration state machine.
//!
//! While uncalibrated, every [`CalibrationEngine::step`] reads one tracker pose
//! and one color image, checks that the rig is level, looks for the marker
//! and, when both gates pass, freezes the tracker→world transform. After that
//! the engine never reads another frame unless [`CalibrationEngine::reset`]
//! is called.

use crate::source::FrameSource;
use rig_fusion_aruco::MarkerLocator;
use rig_fusion_core::frames::{
    camera_to_marker_transform, tracker_to_camera_transform, tracker_to_world_transform,
};
use rig_fusion_core::{
    quaternion_to_roll_pitch_yaw, FrameError, RigTransformStrategy, RollPitchYaw, Transform4,
};
use std::fmt;
use std::thread;
use std::time::Duration;

/// Transforms frozen at the calibration instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedTransforms {
    /// Camera pose in the marker frame. Diagnostics only.
    pub camera_to_marker: Transform4,
    /// Diagnostics only.
    pub tracker_to_camera: Transform4,
    /// `camera_to_marker @ tracker_to_camera`; the only transform used after
    /// calibration.
    pub tracker_to_world: Transform4,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationState {
    Uncalibrated,
    Calibrated(FixedTransforms),
}

/// Outcome of one calibration tick. `Display` is the progress message.
#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationTick {
    /// The engine was already calibrated; nothing was read.
    AlreadyCalibrated,
    /// A sensor read failed. Retryable unless `end_of_stream` is set, in
    /// which case no further frames will arrive.
    ReadFailed { reason: String, end_of_stream: bool },
    /// The rig is tilted beyond the threshold; the marker was not searched.
    AttitudeRejected { roll: f64, yaw: f64, threshold: f64 },
    /// The rig is level but no marker was found.
    MarkerNotFound,
    /// Both gates passed and the transforms are now fixed.
    Calibrated { marker_id: u32 },
}

impl CalibrationTick {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated { .. } | Self::AlreadyCalibrated)
    }

    /// The source has run out of frames; retrying cannot succeed.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            Self::ReadFailed {
                end_of_stream: true,
                ..
            }
        )
    }
}

impl fmt::Display for CalibrationTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCalibrated => write!(f, "already calibrated"),
            Self::ReadFailed { reason, .. } => write!(f, "calibration fails: {reason}"),
            Self::AttitudeRejected {
                roll,
                yaw,
                threshold,
            } => write!(
                f,
                "calibration fails: roll: {roll:.3}, yaw: {yaw:.3} | expected: both < {threshold}"
            ),
            Self::MarkerNotFound => write!(f, "calibration fails: marker not detected"),
            Self::Calibrated { marker_id } => {
                write!(f, "calibration success: matrices loaded (marker {marker_id})")
            }
        }
    }
}

/// Whether a tracker attitude is level enough to calibrate.
///
/// Fails when `max(roll, yaw)` exceeds the threshold, or when either angle is
/// not finite.
pub fn attitude_gate_passes(rpy: &RollPitchYaw, threshold_deg: f64) -> bool {
    rpy.roll.is_finite() && rpy.yaw.is_finite() && rpy.max_roll_yaw() <= threshold_deg
}

/// Calibration parameters copied out of the configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationSettings {
    pub attitude_threshold_deg: f64,
    pub rig_transform: RigTransformStrategy,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            attitude_threshold_deg: 1.0,
            rig_transform: RigTransformStrategy::FixedAxisFlip,
        }
    }
}

/// Retry loop limits for [`CalibrationEngine::run_calibration`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between failed ticks.
    pub interval: Duration,
    /// Stop after this many ticks.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: None,
        }
    }
}

/// How a calibration loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Calibrated { attempts: u32 },
    Stopped { attempts: u32 },
    Exhausted { attempts: u32 },
}

#[derive(Clone, Debug)]
pub struct CalibrationEngine {
    settings: CalibrationSettings,
    state: CalibrationState,
}

impl CalibrationEngine {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            state: CalibrationState::Uncalibrated,
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated(_))
    }

    pub fn fixed_transforms(&self) -> Option<&FixedTransforms> {
        match &self.state {
            CalibrationState::Calibrated(fixed) => Some(fixed),
            CalibrationState::Uncalibrated => None,
        }
    }

    pub fn tracker_to_world(&self) -> Option<&Transform4> {
        self.fixed_transforms().map(|f| &f.tracker_to_world)
    }

    /// Drop the fixed transforms and return to `Uncalibrated`.
    pub fn reset(&mut self) {
        if self.is_calibrated() {
            log::info!("calibration reset");
        }
        self.state = CalibrationState::Uncalibrated;
    }

    /// Run one calibration tick.
    ///
    /// Gate failures are returned as ticks. `Err` means the marker pose could
    /// not be inverted, which no retry can fix.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn step<S, L>(&mut self, source: &mut S, locator: &L) -> Result<CalibrationTick, FrameError>
    where
        S: FrameSource + ?Sized,
        L: MarkerLocator + ?Sized,
    {
        if self.is_calibrated() {
            return Ok(CalibrationTick::AlreadyCalibrated);
        }

        let frames = source
            .next_tracker_pose()
            .and_then(|pose| source.next_color_image().map(|image| (pose, image)));
        let (tracker, image) = match frames {
            Ok(frames) => frames,
            Err(err) => {
                let tick = CalibrationTick::ReadFailed {
                    reason: err.to_string(),
                    end_of_stream: err.is_end_of_stream(),
                };
                log::warn!("{tick}");
                return Ok(tick);
            }
        };

        let rpy = quaternion_to_roll_pitch_yaw(&tracker.rotation);
        log::debug!(
            "tracker attitude roll={:.3} pitch={:.3} yaw={:.3}",
            rpy.roll,
            rpy.pitch,
            rpy.yaw
        );
        let threshold = self.settings.attitude_threshold_deg;
        if !attitude_gate_passes(&rpy, threshold) {
            let tick = CalibrationTick::AttitudeRejected {
                roll: rpy.roll,
                yaw: rpy.yaw,
                threshold,
            };
            log::warn!("{tick}");
            return Ok(tick);
        }

        let Some(marker) = locator.locate(&image).into_iter().next() else {
            let tick = CalibrationTick::MarkerNotFound;
            log::warn!("{tick}");
            return Ok(tick);
        };

        let camera_to_marker = camera_to_marker_transform(&marker.pose)?;
        let tracker_to_camera = tracker_to_camera_transform(self.settings.rig_transform, &tracker)?;
        let tracker_to_world = tracker_to_world_transform(&camera_to_marker, &tracker_to_camera);
        self.state = CalibrationState::Calibrated(FixedTransforms {
            camera_to_marker,
            tracker_to_camera,
            tracker_to_world,
        });

        let tick = CalibrationTick::Calibrated {
            marker_id: marker.id,
        };
        log::info!("{tick}");
        Ok(tick)
    }

    /// Repeat [`step`](Self::step) until calibrated, until `should_stop`
    /// returns true, or until the attempt budget runs out.
    pub fn run_calibration<S, L>(
        &mut self,
        source: &mut S,
        locator: &L,
        policy: &RetryPolicy,
        mut should_stop: impl FnMut(&CalibrationTick) -> bool,
    ) -> Result<CalibrationOutcome, FrameError>
    where
        S: FrameSource + ?Sized,
        L: MarkerLocator + ?Sized,
    {
        let mut attempts = 0u32;
        loop {
            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                log::warn!("calibration gave up after {attempts} attempts");
                return Ok(CalibrationOutcome::Exhausted { attempts });
            }

            let tick = self.step(source, locator)?;
            attempts += 1;
            if tick.is_calibrated() {
                return Ok(CalibrationOutcome::Calibrated { attempts });
            }
            if should_stop(&tick) {
                return Ok(CalibrationOutcome::Stopped { attempts });
            }
            if !policy.interval.is_zero() {
                thread::sleep(policy.interval);
            }
        }
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(CalibrationSettings::default())
    }
}
