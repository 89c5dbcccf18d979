//! JSON configuration. Every field has a default, so `{}` is a valid file.

use rig_fusion_aruco::{DecodeParams, LocatorParams, QuadParams};
use rig_fusion_core::RigTransformStrategy;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Full pipeline configuration, read once at startup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub stream: StreamConfig,
    pub marker: MarkerConfig,
    pub calibration: CalibrationConfig,
    /// Report the camera position relative to the visible marker on every poll.
    pub detect_mode: bool,
}

/// Color stream format requested from the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 848,
            height: 480,
            fps: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Dictionary identifier; must match the `name` in the dictionary file.
    pub dictionary: String,
    /// Dictionary JSON. Relative paths resolve against the config file.
    pub dictionary_path: Option<PathBuf>,
    /// A pixel is dark when it is this much below its local mean.
    pub adaptive_thresh_constant: f32,
    pub adaptive_window_radius: usize,
    pub min_component_px: usize,
    pub min_side_px: f64,
    /// Physical edge length of the marker; sets the world unit.
    pub marker_length: f64,
    pub max_hamming: u8,
    pub border_bits: usize,
    pub min_border_score: f32,
    /// Only accept this marker id.
    pub target_id: Option<u32>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let quads = QuadParams::default();
        let decode = DecodeParams::default();
        let locator = LocatorParams::default();
        Self {
            dictionary: "DICT_5X5_250".to_string(),
            dictionary_path: None,
            adaptive_thresh_constant: 10.0,
            adaptive_window_radius: quads.window_radius,
            min_component_px: quads.min_component_px,
            min_side_px: quads.min_side_px,
            marker_length: 0.1592,
            max_hamming: locator.max_hamming,
            border_bits: decode.border_bits,
            min_border_score: decode.min_border_score,
            target_id: None,
        }
    }
}

impl MarkerConfig {
    pub fn locator_params(&self) -> LocatorParams {
        LocatorParams {
            marker_length: self.marker_length,
            quads: QuadParams {
                window_radius: self.adaptive_window_radius,
                threshold_constant: self.adaptive_thresh_constant,
                min_component_px: self.min_component_px,
                min_side_px: self.min_side_px,
            },
            decode: DecodeParams {
                border_bits: self.border_bits,
                min_border_score: self.min_border_score,
                ..DecodeParams::default()
            },
            max_hamming: self.max_hamming,
            target_id: self.target_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Use the constant axis flip between tracker and camera.
    pub use_default_rig_transform: bool,
    /// Largest roll or yaw, in degrees, accepted while calibrating.
    pub attitude_threshold_deg: f64,
    pub retry_interval_ms: u64,
    /// Give up after this many ticks; unlimited when absent.
    pub max_attempts: Option<u32>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            use_default_rig_transform: true,
            attitude_threshold_deg: 1.0,
            retry_interval_ms: 500,
            max_attempts: None,
        }
    }
}

impl CalibrationConfig {
    pub fn rig_transform(&self) -> RigTransformStrategy {
        RigTransformStrategy::from_use_default(self.use_default_rig_transform)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl FusionConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut cfg: Self = serde_json::from_str(&raw)?;
        if let (Some(dict), Some(base)) = (cfg.marker.dictionary_path.as_mut(), path.parent()) {
            if dict.is_relative() {
                *dict = base.join(&*dict);
            }
        }
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg: FusionConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(cfg, FusionConfig::default());
        assert_eq!(cfg.stream, StreamConfig { width: 848, height: 480, fps: 30 });
        assert_eq!(cfg.marker.dictionary, "DICT_5X5_250");
        assert_eq!(cfg.marker.adaptive_thresh_constant, 10.0);
        assert_eq!(cfg.marker.marker_length, 0.1592);
        assert!(cfg.calibration.use_default_rig_transform);
        assert_eq!(cfg.calibration.attitude_threshold_deg, 1.0);
        assert_eq!(cfg.calibration.retry_interval(), Duration::from_millis(500));
        assert!(!cfg.detect_mode);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: FusionConfig = serde_json::from_str(
            r#"{"calibration": {"use_default_rig_transform": false}, "marker": {"target_id": 7}}"#,
        )
        .expect("parse");
        assert_eq!(cfg.calibration.rig_transform(), RigTransformStrategy::TrackerPose);
        assert_eq!(cfg.calibration.attitude_threshold_deg, 1.0);
        let params = cfg.marker.locator_params();
        assert_eq!(params.target_id, Some(7));
        assert_eq!(params.quads.threshold_constant, 10.0);
        assert_eq!(params.marker_length, 0.1592);
    }

    #[test]
    fn round_trips_through_disk_and_resolves_dictionary_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fusion.json");

        let mut cfg = FusionConfig::default();
        cfg.detect_mode = true;
        cfg.marker.dictionary_path = Some(PathBuf::from("dicts/5x5.json"));
        cfg.write_json(&path).expect("write");

        let loaded = FusionConfig::load_json(&path).expect("load");
        assert!(loaded.detect_mode);
        assert_eq!(
            loaded.marker.dictionary_path,
            Some(dir.path().join("dicts/5x5.json"))
        );
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            FusionConfig::load_json(&path),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            FusionConfig::load_json(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
