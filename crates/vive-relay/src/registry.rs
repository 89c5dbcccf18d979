use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::Path};

use crate::RelayError;

/// One reading of a tracked device: position, Euler attitude and velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub vel_z: f64,
}

/// Source of device readings, keyed by device name.
pub trait DeviceRegistry {
    /// Latest reading, `None` for unknown devices.
    fn device(&self, name: &str) -> Option<DeviceSample>;

    fn device_names(&self) -> Vec<String>;

    /// Names of devices that are trackers (their name contains `"tracker"`).
    fn trackers(&self) -> Vec<String> {
        self.device_names()
            .into_iter()
            .filter(|name| name.contains("tracker"))
            .collect()
    }
}

/// Fixed set of readings, e.g. loaded from a JSON snapshot
/// `{"tracker_1": {"x": 0.0, ...}, ...}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticRegistry {
    devices: BTreeMap<String, DeviceSample>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, sample: DeviceSample) {
        self.devices.insert(name.into(), sample);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceRegistry for StaticRegistry {
    fn device(&self, name: &str) -> Option<DeviceSample> {
        self.devices.get(name).copied()
    }

    fn device_names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }
}

impl<R: DeviceRegistry + ?Sized> DeviceRegistry for &R {
    fn device(&self, name: &str) -> Option<DeviceSample> {
        (**self).device(name)
    }

    fn device_names(&self) -> Vec<String> {
        (**self).device_names()
    }
}
