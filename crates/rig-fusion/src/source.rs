//! Sensor boundary: the two driver pipelines and the paired frame source.

use crate::config::StreamConfig;
use crate::FusionError;
use rig_fusion_core::{BgrImage, CameraIntrinsics, TrackerPose};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("{stream} stream failed to start: {reason}")]
    Start { stream: &'static str, reason: String },
    #[error("{stream} read failed: {reason}")]
    Read { stream: &'static str, reason: String },
    #[error("{stream} stream is not running")]
    NotRunning { stream: &'static str },
    #[error("end of recording after {0} frames")]
    EndOfRecording(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl SourceError {
    /// No more frames will ever be produced (a finished recording).
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfRecording(_))
    }
}

/// One color image and one tracker pose per tick, each read blocking.
pub trait FrameSource {
    fn next_tracker_pose(&mut self) -> Result<TrackerPose, SourceError>;
    fn next_color_image(&mut self) -> Result<BgrImage, SourceError>;
    /// Intrinsics reported by the color stream when it started.
    fn intrinsics(&self) -> CameraIntrinsics;
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn next_tracker_pose(&mut self) -> Result<TrackerPose, SourceError> {
        (**self).next_tracker_pose()
    }

    fn next_color_image(&mut self) -> Result<BgrImage, SourceError> {
        (**self).next_color_image()
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        (**self).intrinsics()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_tracker_pose(&mut self) -> Result<TrackerPose, SourceError> {
        (**self).next_tracker_pose()
    }

    fn next_color_image(&mut self) -> Result<BgrImage, SourceError> {
        (**self).next_color_image()
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        (**self).intrinsics()
    }
}

/// Color camera pipeline (8-bit BGR).
///
/// `stop` must be safe to call on a stream that never started.
pub trait ColorStream {
    fn start(&mut self, config: &StreamConfig) -> Result<CameraIntrinsics, SourceError>;
    fn read(&mut self) -> Result<BgrImage, SourceError>;
    fn stop(&mut self);
}

/// Tracking camera pose pipeline.
///
/// `stop` must be safe to call on a stream that never started.
pub trait PoseStream {
    fn start(&mut self) -> Result<(), SourceError>;
    fn read(&mut self) -> Result<TrackerPose, SourceError>;
    fn stop(&mut self);
}

/// Both pipelines, started together and released together.
pub struct SensorRig<C: ColorStream, P: PoseStream> {
    color: C,
    pose: P,
    intrinsics: CameraIntrinsics,
    running: bool,
}

impl<C: ColorStream, P: PoseStream> SensorRig<C, P> {
    /// Start the color stream, then the pose stream. If either fails both are
    /// stopped before the error is returned.
    pub fn open(mut color: C, mut pose: P, config: &StreamConfig) -> Result<Self, FusionError> {
        let started = color
            .start(config)
            .and_then(|intrinsics| pose.start().map(|()| intrinsics));
        match started {
            Ok(intrinsics) => {
                log::info!(
                    "sensor rig started: {}x{} @ {} fps, fx={:.2} fy={:.2}",
                    config.width,
                    config.height,
                    config.fps,
                    intrinsics.fx,
                    intrinsics.fy
                );
                Ok(Self {
                    color,
                    pose,
                    intrinsics,
                    running: true,
                })
            }
            Err(err) => {
                color.stop();
                pose.stop();
                log::error!("sensor rig failed to start: {err}");
                Err(FusionError::Connection(err))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Release both pipelines. Later calls do nothing.
    pub fn stop(&mut self) {
        if self.running {
            self.color.stop();
            self.pose.stop();
            self.running = false;
            log::debug!("sensor rig stopped");
        }
    }
}

impl<C: ColorStream, P: PoseStream> FrameSource for SensorRig<C, P> {
    fn next_tracker_pose(&mut self) -> Result<TrackerPose, SourceError> {
        if !self.running {
            return Err(SourceError::NotRunning { stream: "pose" });
        }
        self.pose.read()
    }

    fn next_color_image(&mut self) -> Result<BgrImage, SourceError> {
        if !self.running {
            return Err(SourceError::NotRunning { stream: "color" });
        }
        self.color.read()
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
    }
}

impl<C: ColorStream, P: PoseStream> Drop for SensorRig<C, P> {
    fn drop(&mut self) {
        self.stop();
    }
}
