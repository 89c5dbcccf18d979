//! Recorded sessions played back through the sensor traits.
//!
//! A recording is a JSON file:
//!
//! ```json
//! {
//!   "intrinsics": {"width": 848, "height": 480, "fx": 615.0, "fy": 615.0,
//!                  "ppx": 423.5, "ppy": 239.5},
//!   "frames": [
//!     {"image": "frames/0000.png",
//!      "pose": {"translation": [0.0, 0.0, 0.0],
//!               "rotation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}}}
//!   ]
//! }
//! ```
//!
//! Image paths are relative to the recording file.

use crate::config::StreamConfig;
use crate::source::{ColorStream, PoseStream, SourceError};
use rig_fusion_core::{BgrImage, CameraIntrinsics, TrackerPose};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub image: PathBuf,
    pub pose: TrackerPose,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub intrinsics: CameraIntrinsics,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    /// Load a recording; image paths are resolved against its directory.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, crate::ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut rec: Self = serde_json::from_str(&raw)?;
        if let Some(base) = path.parent() {
            for frame in &mut rec.frames {
                if frame.image.is_relative() {
                    frame.image = base.join(&frame.image);
                }
            }
        }
        Ok(rec)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), crate::ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Split into the two pipelines, both positioned at the first frame.
    pub fn into_streams(self) -> (ReplayColorStream, ReplayPoseStream) {
        let (images, poses) = self.frames.into_iter().map(|f| (f.image, f.pose)).unzip();
        (
            ReplayColorStream {
                intrinsics: self.intrinsics,
                images,
                next: 0,
                running: false,
            },
            ReplayPoseStream {
                poses,
                next: 0,
                running: false,
            },
        )
    }
}

#[derive(Clone, Debug)]
pub struct ReplayColorStream {
    intrinsics: CameraIntrinsics,
    images: Vec<PathBuf>,
    next: usize,
    running: bool,
}

impl ColorStream for ReplayColorStream {
    fn start(&mut self, config: &StreamConfig) -> Result<CameraIntrinsics, SourceError> {
        if self.images.is_empty() {
            return Err(SourceError::Start {
                stream: "color",
                reason: "recording has no frames".into(),
            });
        }
        if (config.width, config.height) != (self.intrinsics.width, self.intrinsics.height) {
            log::warn!(
                "recording is {}x{}, configured stream is {}x{}",
                self.intrinsics.width,
                self.intrinsics.height,
                config.width,
                config.height
            );
        }
        self.running = true;
        Ok(self.intrinsics)
    }

    fn read(&mut self) -> Result<BgrImage, SourceError> {
        if !self.running {
            return Err(SourceError::NotRunning { stream: "color" });
        }
        let path = self
            .images
            .get(self.next)
            .ok_or(SourceError::EndOfRecording(self.images.len()))?;
        self.next += 1;
        load_bgr(path)
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Clone, Debug)]
pub struct ReplayPoseStream {
    poses: Vec<TrackerPose>,
    next: usize,
    running: bool,
}

impl PoseStream for ReplayPoseStream {
    fn start(&mut self) -> Result<(), SourceError> {
        self.running = true;
        Ok(())
    }

    fn read(&mut self) -> Result<TrackerPose, SourceError> {
        if !self.running {
            return Err(SourceError::NotRunning { stream: "pose" });
        }
        let pose = *self
            .poses
            .get(self.next)
            .ok_or(SourceError::EndOfRecording(self.poses.len()))?;
        self.next += 1;
        Ok(pose)
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

/// Decode an image file into an interleaved BGR buffer.
pub fn load_bgr(path: &Path) -> Result<BgrImage, SourceError> {
    let rgb = image::open(path)?.to_rgb8();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let mut data = rgb.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    BgrImage::from_raw(w, h, data).ok_or_else(|| SourceError::Read {
        stream: "color",
        reason: format!("{}: unexpected buffer size", path.display()),
    })
}
